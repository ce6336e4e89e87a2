use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::formats::{AudioFormat, VideoFormat};

/// Default yt-dlp output template, relative to the download location.
pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s [%(id)s].%(ext)s";

/// Minimal summary of a downloadable entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadableItemBasic {
    pub url: String,
    pub title: String,
    /// Duration in seconds
    pub duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploader: Option<String>,
}

/// Lifecycle of an item as seen by the caller.
///
/// The orchestrator never assigns this; callers move it along based on the
/// progress and file path events they receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    #[default]
    Stopped,
    Queued,
    Downloading,
    Postprocessing,
    Completed,
}

/// Quality ladders for one item, sorted from worst to best.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formats {
    /// Video heights
    pub video: Vec<u32>,
    /// Audio bitrates
    pub audio: Vec<f64>,
    pub video_index: usize,
    pub audio_index: usize,
}

impl Formats {
    /// Build from ascending ladders with both indices pointing at "best".
    pub fn new(video: Vec<u32>, audio: Vec<f64>) -> Self {
        let video_index = video.len().saturating_sub(1);
        let audio_index = audio.len().saturating_sub(1);
        Self {
            video,
            audio,
            video_index,
            audio_index,
        }
    }

    /// Height cap for the chosen video level, `None` when "best" is chosen.
    pub fn video_limit(&self) -> Option<u32> {
        limit(&self.video, self.video_index)
    }

    /// Bitrate cap for the chosen audio level, `None` when "best" is chosen.
    pub fn audio_limit(&self) -> Option<f64> {
        limit(&self.audio, self.audio_index)
    }

    /// Pick the highest video level not above `height`, or the lowest level.
    pub fn choose_video_at_most(&mut self, height: u32) {
        self.video_index = self
            .video
            .iter()
            .rposition(|&level| level <= height)
            .unwrap_or(0);
    }

    /// Pick the highest audio level not above `abr`, or the lowest level.
    pub fn choose_audio_at_most(&mut self, abr: f64) {
        self.audio_index = self
            .audio
            .iter()
            .rposition(|&level| level <= abr)
            .unwrap_or(0);
    }
}

fn limit<T: Copy>(levels: &[T], index: usize) -> Option<T> {
    if index + 1 < levels.len() {
        Some(levels[index])
    } else {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DownloadProgress {
    /// Percentage, 0 to 100
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub entries: Option<u64>,
    pub title: Option<String>,
    pub id: String,
    pub index: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadableItem {
    #[serde(flatten)]
    pub info: DownloadableItemBasic,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub is_chosen: bool,
    pub state: ItemState,
    pub is_subs_chosen: bool,
    /// Only download audio
    pub is_audio_chosen: bool,
    pub formats: Formats,
    pub subtitles: Vec<String>,
    pub progress: DownloadProgress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playlist: Option<Playlist>,
}

impl DownloadableItem {
    pub fn url(&self) -> &str {
        &self.info.url
    }
}

/// Result of parsing one metadata record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ParsedItem {
    Basic(DownloadableItemBasic),
    Full(Box<DownloadableItem>),
}

impl ParsedItem {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Full(_) => "full",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Basic(basic) => &basic.url,
            Self::Full(item) => item.url(),
        }
    }
}

/// Per-invocation download settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadOptions {
    pub video_format: VideoFormat,
    pub audio_format: AudioFormat,
    pub download_location: PathBuf,
    pub output_template: String,
    /// Let the transcoder convert to the requested extension when the source
    /// doesn't offer it
    pub compatibility_mode: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            video_format: VideoFormat::Best,
            audio_format: AudioFormat::Best,
            download_location: PathBuf::from("."),
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            compatibility_mode: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_index_has_no_limit() {
        let formats = Formats::new(vec![360, 720, 1080], vec![64.0, 128.0]);
        assert_eq!(formats.video_index, 2);
        assert_eq!(formats.video_limit(), None);
        assert_eq!(formats.audio_limit(), None);
    }

    #[test]
    fn test_empty_ladders_imply_best() {
        let formats = Formats::new(Vec::new(), Vec::new());
        assert_eq!(formats.video_index, 0);
        assert_eq!(formats.video_limit(), None);
        assert_eq!(formats.audio_limit(), None);
    }

    #[test]
    fn test_choose_at_most() {
        let mut formats = Formats::new(vec![360, 720, 1080], vec![64.0, 128.0, 160.0]);
        formats.choose_video_at_most(800);
        assert_eq!(formats.video_limit(), Some(720));
        formats.choose_video_at_most(100);
        assert_eq!(formats.video_limit(), Some(360));
        formats.choose_audio_at_most(1000.0);
        assert_eq!(formats.audio_limit(), None);
    }

    #[test]
    fn test_parsed_item_is_tagged() {
        let parsed = ParsedItem::Basic(DownloadableItemBasic {
            url: "https://example.com/v".to_string(),
            title: "clip".to_string(),
            duration: 12.0,
            uploader: None,
        });
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["kind"], "basic");
        assert_eq!(parsed.kind(), "basic");
    }
}

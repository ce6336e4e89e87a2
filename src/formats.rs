//! Container extensions understood by the downloader.
//!
//! `Best` is always the first entry and the default: it leaves extension
//! selection to the downloader's own format sorting.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    #[default]
    Best,
    Mp4,
    Webm,
    Mkv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Best,
    M4a,
    Aac,
    Mp3,
    Ogg,
    Opus,
    Webm,
    Flac,
    Vorbis,
    Wav,
}

/// Order follows yt-dlp's format sorting preference.
pub const VIDEO_FORMATS: [VideoFormat; 4] = [
    VideoFormat::Best,
    VideoFormat::Mp4,
    VideoFormat::Webm,
    VideoFormat::Mkv,
];

pub const AUDIO_FORMATS: [AudioFormat; 10] = [
    AudioFormat::Best,
    AudioFormat::M4a,
    AudioFormat::Aac,
    AudioFormat::Mp3,
    AudioFormat::Ogg,
    AudioFormat::Opus,
    AudioFormat::Webm,
    AudioFormat::Flac,
    AudioFormat::Vorbis,
    AudioFormat::Wav,
];

impl VideoFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::Mp4 => "mp4",
            Self::Webm => "webm",
            Self::Mkv => "mkv",
        }
    }

    /// The extension to constrain on, or `None` for `Best`.
    pub fn constraint(&self) -> Option<&'static str> {
        match self {
            Self::Best => None,
            other => Some(other.extension()),
        }
    }
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Best => "best",
            Self::M4a => "m4a",
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Opus => "opus",
            Self::Webm => "webm",
            Self::Flac => "flac",
            Self::Vorbis => "vorbis",
            Self::Wav => "wav",
        }
    }

    pub fn constraint(&self) -> Option<&'static str> {
        match self {
            Self::Best => None,
            other => Some(other.extension()),
        }
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_is_first_and_default() {
        assert_eq!(VIDEO_FORMATS[0], VideoFormat::default());
        assert_eq!(AUDIO_FORMATS[0], AudioFormat::default());
        assert_eq!(VideoFormat::Best.constraint(), None);
        assert_eq!(AudioFormat::Best.constraint(), None);
    }

    #[test]
    fn test_extension_names() {
        let video: Vec<String> = VIDEO_FORMATS.iter().map(|f| f.to_string()).collect();
        assert_eq!(video, ["best", "mp4", "webm", "mkv"]);
        assert_eq!(AudioFormat::M4a.constraint(), Some("m4a"));
        assert_eq!(AudioFormat::Vorbis.to_string(), "vorbis");
    }
}

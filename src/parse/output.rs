use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::item::DownloadProgress;

static PERCENTAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)%").unwrap());
// [download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)
static TRANSFER_STATS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\S+%(?:\s+of\s+~?\s*(\S+))?(?:\s+at\s+(\S+))?(?:\s+ETA\s+(\S+))?").unwrap()
});
static DOWNLOAD_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Destination:\s?(.+)|^(.+)\shas already been downloaded").unwrap()
});
static QUOTED_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r#".*?"(.*)""#).unwrap());
static CONVERSION_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r".*?Destination:\s(.*)").unwrap());
static MERGE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^Merging formats into "(.+)""#).unwrap());

/// Coarse phase of the tool that produced a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Downloading,
    Postprocessing,
    Idle,
}

/// What one output line says about a running download
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub progress: Option<DownloadProgress>,
    pub progress_status: ProgressStatus,
    pub filepath: Option<String>,
}

impl ProgressEvent {
    fn idle() -> Self {
        Self {
            progress: None,
            progress_status: ProgressStatus::Idle,
            filepath: None,
        }
    }
}

type Rule = fn(&str) -> (Option<DownloadProgress>, Option<String>);

/// Subsystem tag, the phase it reports, and how to read the rest of the line
const SUBSYSTEMS: [(&str, ProgressStatus, Rule); 3] = [
    ("[download]", ProgressStatus::Downloading, download_rule),
    ("[ffmpeg]", ProgressStatus::Postprocessing, ffmpeg_rule),
    ("[Merger]", ProgressStatus::Postprocessing, merger_rule),
];

/// Parse one line of downloader output. Unrecognised or malformed content
/// yields empty fields.
pub fn parse_line(line: &str) -> ProgressEvent {
    let line = line.trim_start().trim_end_matches(['\r', '\n']);

    for (tag, status, rule) in SUBSYSTEMS {
        if let Some(rest) = line.strip_prefix(tag) {
            let (progress, filepath) = rule(rest.trim_start());
            return ProgressEvent {
                progress,
                progress_status: status,
                filepath,
            };
        }
    }

    ProgressEvent::idle()
}

fn download_rule(rest: &str) -> (Option<DownloadProgress>, Option<String>) {
    let progress = if rest.starts_with("Unknown %") {
        Some(DownloadProgress::default())
    } else {
        PERCENTAGE
            .captures(rest)
            .and_then(|caps| caps[1].parse::<f64>().ok())
            .map(|value| transfer_stats(rest, value))
    };

    // [download] Destination: ...
    // [download] ... has already been downloaded
    let filepath = DOWNLOAD_PATH.captures(rest).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    });

    (progress, filepath)
}

fn transfer_stats(rest: &str, value: f64) -> DownloadProgress {
    let mut progress = DownloadProgress {
        value,
        ..DownloadProgress::default()
    };
    if let Some(caps) = TRANSFER_STATS.captures(rest) {
        let field = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
        progress.size = field(1);
        progress.speed = field(2);
        progress.eta = field(3);
    }
    progress
}

fn ffmpeg_rule(rest: &str) -> (Option<DownloadProgress>, Option<String>) {
    // Merging audio and video quotes the target
    let mut filepath = QUOTED_PATH
        .captures(rest)
        .map(|caps| caps[1].to_string())
        .filter(|path| !path.is_empty());

    // Format conversion names it after "Destination:"
    if let Some(caps) = CONVERSION_PATH.captures(rest) {
        if !caps[1].is_empty() {
            filepath = Some(caps[1].to_string());
        }
    }

    (None, filepath)
}

fn merger_rule(rest: &str) -> (Option<DownloadProgress>, Option<String>) {
    let filepath = MERGE_PATH.captures(rest).map(|caps| caps[1].to_string());
    (None, filepath)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_with_stats() {
        let event = parse_line("[download] 45.2% of 10.00MiB at 1.2MiB/s");
        let progress = event.progress.unwrap();
        assert_eq!(progress.value, 45.2);
        assert_eq!(progress.size.as_deref(), Some("10.00MiB"));
        assert_eq!(progress.speed.as_deref(), Some("1.2MiB/s"));
        assert_eq!(progress.eta, None);
        assert_eq!(event.filepath, None);
        assert_eq!(event.progress_status, ProgressStatus::Downloading);
    }

    #[test]
    fn test_fragmented_progress_line() {
        let event =
            parse_line("[download]  12.5% of ~ 310.04MiB at  374.36KiB/s ETA 11:59 (frag 56/454)");
        let progress = event.progress.unwrap();
        assert_eq!(progress.value, 12.5);
        assert_eq!(progress.size.as_deref(), Some("310.04MiB"));
        assert_eq!(progress.speed.as_deref(), Some("374.36KiB/s"));
        assert_eq!(progress.eta.as_deref(), Some("11:59"));
    }

    #[test]
    fn test_unknown_percentage_is_zero() {
        let event = parse_line("[download] Unknown % of Unknown size");
        assert_eq!(event.progress.unwrap().value, 0.0);
    }

    #[test]
    fn test_destination() {
        let event = parse_line("[download] Destination: movie.mp4");
        assert_eq!(event.filepath.as_deref(), Some("movie.mp4"));
        assert_eq!(event.progress, None);
    }

    #[test]
    fn test_already_downloaded() {
        let event = parse_line("[download] /media/Clip [abc].mkv has already been downloaded");
        assert_eq!(event.filepath.as_deref(), Some("/media/Clip [abc].mkv"));
        assert_eq!(event.progress, None);
    }

    #[test]
    fn test_malformed_download_line() {
        let event = parse_line("[download] Downloading playlist: nothing");
        assert_eq!(event.progress, None);
        assert_eq!(event.filepath, None);
    }

    #[test]
    fn test_merger() {
        let event = parse_line("[Merger] Merging formats into \"final.mkv\"");
        assert_eq!(event.filepath.as_deref(), Some("final.mkv"));
        assert_eq!(event.progress_status, ProgressStatus::Postprocessing);
    }

    #[test]
    fn test_ffmpeg_quoted_and_destination() {
        let merged = parse_line("[ffmpeg] Merging formats into \"out [x].webm\"");
        assert_eq!(merged.filepath.as_deref(), Some("out [x].webm"));

        let converted = parse_line("[ffmpeg] Destination: song.mp3");
        assert_eq!(converted.filepath.as_deref(), Some("song.mp3"));
    }

    #[test]
    fn test_ffmpeg_destination_overrides_quoted_text() {
        let event = parse_line("[ffmpeg] Destination: My \"Best\" Song.mp3");
        assert_eq!(event.filepath.as_deref(), Some("My \"Best\" Song.mp3"));
        assert_eq!(event.progress, None);
        assert_eq!(event.progress_status, ProgressStatus::Postprocessing);
    }

    #[test]
    fn test_other_subsystem_lines_are_empty() {
        for line in [
            "[youtube] abc: Downloading webpage",
            "[info] Writing video subtitles",
            "",
            "   ",
            "ERROR: unable to download video data: HTTP Error 403",
        ] {
            let event = parse_line(line);
            assert_eq!(event.progress, None, "{line}");
            assert_eq!(event.filepath, None, "{line}");
            assert_eq!(event.progress_status, ProgressStatus::Idle);
        }
    }

    #[test]
    fn test_leading_whitespace_and_line_ending() {
        let event = parse_line("  [download] Destination: a.mp4\r\n");
        assert_eq!(event.filepath.as_deref(), Some("a.mp4"));
    }
}

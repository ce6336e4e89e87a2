//! Argument lists for yt-dlp.

use std::fmt::Display;
use std::path::Path;

use crate::item::{DownloadOptions, DownloadableItem};
use super::{Tool, ToolCommand};

/// Separator between alternatives in a format selector
const FALLBACK: &str = " / ";

fn quality_clause<T: Display>(key: &str, limit: Option<T>) -> String {
    match limit {
        Some(value) => format!("[{}<={}]", key, value),
        None => String::new(),
    }
}

/// Format selector for audio-only downloads.
pub fn audio_selector(abr_limit: Option<f64>, extension: Option<&str>) -> String {
    let quality = quality_clause("abr", abr_limit);
    let best = format!("best*[vcodec=none]{}", quality);
    match extension {
        Some(ext) => format!("bestaudio[ext={ext}]{quality}{FALLBACK}{best}"),
        None => best,
    }
}

/// Format selector for video downloads.
///
/// The height cap applies to the audio leg too, matching what the downloader
/// accepts for combined selectors.
pub fn video_selector(height_limit: Option<u32>, extension: Option<&str>) -> String {
    let quality = quality_clause("height", height_limit);
    let best = format!("bestvideo*{q}+bestaudio{q}/best{q}", q = quality);
    match extension {
        Some(ext) => format!(
            "bestvideo*[ext={ext}]{q}+bestaudio[ext={ext}]{q}/best[ext={ext}]{q}{FALLBACK}{best}",
            q = quality
        ),
        None => best,
    }
}

/// Build the download invocation for one item.
///
/// `transcoder` is only consulted in compatibility mode, where the downloader
/// is asked to convert to the requested extension after downloading.
pub fn download(
    item: &DownloadableItem,
    options: &DownloadOptions,
    transcoder: Option<&Path>,
) -> ToolCommand {
    // Progress lines, one per update
    let mut cmd = ToolCommand::new(Tool::Downloader, format!("Download {}", item.url()))
        .arg("--newline");

    let selector = if item.is_audio_chosen {
        audio_selector(item.formats.audio_limit(), options.audio_format.constraint())
    } else {
        video_selector(item.formats.video_limit(), options.video_format.constraint())
    };
    cmd = cmd.arg("--format").arg(selector);

    let output = options.download_location.join(&options.output_template);
    cmd = cmd
        .arg("-o")
        .path(output)
        .arg("--embed-subs")
        .arg("--embed-thumbnail");

    if options.compatibility_mode {
        let conversion = if item.is_audio_chosen {
            options
                .audio_format
                .constraint()
                .map(|ext| vec!["--extract-audio", "--audio-format", ext])
        } else {
            options
                .video_format
                .constraint()
                .map(|ext| vec!["--recode-video", ext])
        };
        if let Some(args) = conversion {
            cmd = cmd.args(args);
            if let Some(path) = transcoder {
                cmd = cmd.arg("--ffmpeg-location").path(path);
            }
        }
    }

    cmd.arg("--").arg(item.url())
}

pub fn update() -> ToolCommand {
    ToolCommand::new(Tool::Downloader, "Self-update").arg("--update")
}

pub fn info(url: &str) -> ToolCommand {
    ToolCommand::new(Tool::Downloader, format!("Fetch info for {}", url))
        .args(["--all-subs", "--dump-json", "--no-playlist", "--ignore-errors", url])
}

/// Print the direct media URL for one format instead of downloading
pub fn stream_url(format: &str, url: &str) -> ToolCommand {
    ToolCommand::new(Tool::Downloader, format!("Resolve {} stream for {}", format, url))
        .args(["-f", format, "-g", url])
}

pub fn version() -> ToolCommand {
    ToolCommand::new(Tool::Downloader, "Version check").arg("--version")
}

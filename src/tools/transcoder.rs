//! Argument lists for ffmpeg.

use std::path::Path;

use super::{Tool, ToolCommand};

/// Palette-based GIF filter graph: 24 fps, 720px wide
const GIF_FILTER: &str =
    "fps=24,scale=720:-1:flags=lanczos,split[s0][s1];[s0]palettegen[p];[s1][p]paletteuse";

impl ToolCommand {
    fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").path(path)
    }
}

/// Mux a video stream and an audio stream into one file without re-encoding.
pub fn merge<P: AsRef<Path>>(video: &str, audio: &str, output: P) -> ToolCommand {
    ToolCommand::new(Tool::Transcoder, "Stream merge")
        .arg("-i")
        .arg(video)
        .arg("-i")
        .arg(audio)
        .args(["-c", "copy", "-map", "0:v:0", "-map", "1:a:0"])
        .path(output)
}

/// Convert a video file to a looping GIF.
pub fn gif<P: AsRef<Path>, Q: AsRef<Path>>(input: P, output: Q) -> ToolCommand {
    ToolCommand::new(Tool::Transcoder, "GIF conversion")
        .input(input)
        .arg("-vf")
        .arg(GIF_FILTER)
        .args(["-loop", "0"])
        .path(output)
}

pub fn version() -> ToolCommand {
    ToolCommand::new(Tool::Transcoder, "Version check").arg("-version")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_maps_first_streams() {
        let args = merge("https://v", "https://a", "/out/clip.mp4").into_args();
        assert_eq!(
            args,
            [
                "-i", "https://v", "-i", "https://a", "-c", "copy", "-map", "0:v:0", "-map",
                "1:a:0", "/out/clip.mp4",
            ]
        );
    }

    #[test]
    fn test_gif_conversion() {
        let cmd = gif("/tmp/clip.mp4", "/tmp/clip.gif");
        assert_eq!(cmd.tool, Tool::Transcoder);
        assert_eq!(cmd.args[0..2], ["-i", "/tmp/clip.mp4"]);
        assert_eq!(cmd.args[3], GIF_FILTER);
        assert_eq!(cmd.args.last().map(String::as_str), Some("/tmp/clip.gif"));
    }
}

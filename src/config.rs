use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{MediaFetchError, Result};
use crate::item::DownloadOptions;

fn default_downloader_candidates() -> Vec<String> {
    vec!["yt-dlp".to_string(), "youtube-dl".to_string()]
}

fn default_transcoder() -> String {
    "ffmpeg".to_string()
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub download: DownloadOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Downloader names or paths, tried in order
    #[serde(default = "default_downloader_candidates")]
    pub downloader_candidates: Vec<String>,
    /// Transcoder name or path
    #[serde(default = "default_transcoder")]
    pub transcoder: String,
    /// Working directory for spawned tools
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            downloader_candidates: default_downloader_candidates(),
            transcoder: default_transcoder(),
            work_dir: default_work_dir(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MediaFetchError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| MediaFetchError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MediaFetchError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MediaFetchError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use crate::formats::{AudioFormat, VideoFormat};

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("mediafetch.toml");
        file.write_str(
            "[download]\nvideo_format = \"mkv\"\ncompatibility_mode = true\n",
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.download.video_format, VideoFormat::Mkv);
        assert_eq!(config.download.audio_format, AudioFormat::Best);
        assert!(config.download.compatibility_mode);
        assert_eq!(config.tools.downloader_candidates, ["yt-dlp", "youtube-dl"]);
        assert_eq!(config.tools.transcoder, "ffmpeg");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("saved.toml");

        let mut config = Config::default();
        config.tools.transcoder = "/opt/ffmpeg/bin/ffmpeg".to_string();
        config.download.audio_format = AudioFormat::Opus;
        config.save_to_file(file.path()).unwrap();

        let loaded = Config::from_file(file.path()).unwrap();
        assert_eq!(loaded.tools.transcoder, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(loaded.download.audio_format, AudioFormat::Opus);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("broken.toml");
        file.write_str("[download\n").unwrap();

        assert!(matches!(
            Config::from_file(file.path()),
            Err(MediaFetchError::Config(_))
        ));
    }
}

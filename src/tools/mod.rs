// External tool plumbing
//
// - downloader: argument builders for yt-dlp
// - transcoder: argument builders for ffmpeg
// - locator: finding the binaries on this machine

pub mod downloader;
pub mod locator;
pub mod transcoder;

use std::fmt;
use std::path::Path;

pub use locator::*;

/// Token used as the registry identifier for self-update runs
pub const UPDATE_ID: &str = "update";

/// The two external programs this crate drives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Downloader,
    Transcoder,
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Downloader => f.write_str("downloader"),
            Self::Transcoder => f.write_str("transcoder"),
        }
    }
}

/// An argument list for one tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCommand {
    pub tool: Tool,
    pub args: Vec<String>,
    pub description: String,
}

impl ToolCommand {
    pub fn new<S: Into<String>>(tool: Tool, description: S) -> Self {
        Self {
            tool,
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add a path argument
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn into_args(self) -> Vec<String> {
        self.args
    }
}

//! mediafetch - download and transcode orchestration
//!
//! Drives yt-dlp and ffmpeg as child processes: builds their argument lists,
//! parses their line-oriented output into typed progress and metadata, and
//! tracks every running process by identifier.

pub mod cli;
pub mod config;
pub mod error;
pub mod formats;
pub mod item;
pub mod orchestrator;
pub mod parse;
pub mod process;
pub mod tools;

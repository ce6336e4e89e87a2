use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::formats::{AudioFormat, VideoFormat};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print metadata for a URL as JSON
    Info {
        url: String,
    },

    /// Download a URL
    Download {
        url: String,

        /// Only download audio
        #[arg(short, long)]
        audio: bool,

        /// Preferred video extension
        #[arg(long, value_enum)]
        video_format: Option<VideoFormat>,

        /// Preferred audio extension
        #[arg(long, value_enum)]
        audio_format: Option<AudioFormat>,

        /// Directory to download into
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Highest video height to pick
        #[arg(long)]
        max_height: Option<u32>,

        /// Highest audio bitrate to pick
        #[arg(long)]
        max_abr: Option<f64>,

        /// Convert to the requested extension when it isn't offered
        #[arg(long)]
        compat: bool,
    },

    /// Update the downloader
    Update,

    /// Show which downloader and transcoder are usable
    Check,

    /// Fetch video and audio streams separately and merge them
    Merge {
        url: String,

        /// Output file
        output: PathBuf,

        /// Downloader format for the video stream
        #[arg(long, default_value = "bestvideo")]
        video_format: String,

        /// Downloader format for the audio stream
        #[arg(long, default_value = "bestaudio")]
        audio_format: String,
    },

    /// Convert a video file to GIF
    Gif {
        input: PathBuf,
        output: PathBuf,
    },
}

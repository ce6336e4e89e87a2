use thiserror::Error;

#[derive(Error, Debug)]
pub enum MediaFetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool not available: {0}")]
    ToolUnavailable(String),

    #[error("Failed to spawn {id}: {reason}")]
    Spawn { id: String, reason: String },

    #[error("Process {id} exited with code {code}")]
    ProcessFailed { id: String, code: i32 },

    #[error("Process {id} aborted: {reason}")]
    ProcessAborted { id: String, reason: String },

    #[error("Failed to terminate {0}")]
    Termination(String),

    #[error("No stream URL resolved for {0}")]
    StreamUrl(String),
}

pub type Result<T> = std::result::Result<T, MediaFetchError>;

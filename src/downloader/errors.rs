// Error types for job submission and job execution

use std::path::PathBuf;
use thiserror::Error;

/// Bad form input, rejected before a job exists
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Please paste a video URL.")]
    EmptyUrl,

    #[error("Please choose a save folder.")]
    EmptyDestination,

    #[error("Save folder is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
}

/// Rejection at the submission boundary. Never turns into a Failed status.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("a download is already in progress")]
    Busy,
}

/// Failure while a job is running
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Source/transport failure reported by the extractor
    #[error("{0}")]
    Extraction(String),

    /// yt-dlp (or python) could not be launched
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Merge/transcode tool absent from the environment
    #[error("Media processor not available: {0}")]
    MediaProcessorMissing(String),

    /// Extractor exited abnormally without a classified message
    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Only extraction failures are surfaced verbatim
    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::Extraction(_))
    }

    /// Classify a failed extractor run from its `ERROR:` message
    pub fn from_extractor_message(message: String) -> Self {
        let lower = message.to_lowercase();
        if (lower.contains("ffmpeg") || lower.contains("ffprobe")) && lower.contains("not found") {
            return Self::MediaProcessorMissing(message);
        }
        Self::Extraction(message)
    }
}

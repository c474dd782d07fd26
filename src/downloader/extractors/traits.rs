// Extractor trait and common types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::downloader::errors::DownloadError;
use crate::downloader::models::{FetchFormatExpression, PostprocessStep, ProgressEvent};

/// How yt-dlp is launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorMode {
    /// Python module yt_dlp (`python3 -m yt_dlp`)
    Python,
    /// Native yt-dlp binary
    Cli,
    /// Native binary if present, Python module otherwise
    #[default]
    Auto,
}

impl FromStr for ExtractorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "python" => Ok(Self::Python),
            "cli" | "binary" => Ok(Self::Cli),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown extractor mode: {}", other)),
        }
    }
}

impl fmt::Display for ExtractorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Python => write!(f, "python"),
            Self::Cli => write!(f, "cli"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Configuration for the yt-dlp extractor
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub mode: ExtractorMode,
    /// Explicit yt-dlp binary; skips path discovery
    pub ytdlp_path: Option<PathBuf>,
    /// Python interpreter for module mode
    pub python_path: Option<PathBuf>,
    /// Passed as `--ffmpeg-location`
    pub ffmpeg_location: Option<PathBuf>,
    /// Socket timeout in seconds
    pub timeout_seconds: u32,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            mode: ExtractorMode::Auto,
            ytdlp_path: None,
            python_path: None,
            ffmpeg_location: None,
            timeout_seconds: 30,
        }
    }
}

impl ExtractorConfig {
    pub fn with_mode(mut self, mode: ExtractorMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_ytdlp_path(mut self, path: Option<PathBuf>) -> Self {
        self.ytdlp_path = path;
        self
    }

    pub fn with_python_path(mut self, path: Option<PathBuf>) -> Self {
        self.python_path = path;
        self
    }

    pub fn with_ffmpeg_location(mut self, path: Option<PathBuf>) -> Self {
        self.ffmpeg_location = path;
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }
}

/// Everything the extractor needs for one job
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractRequest {
    pub url: String,
    pub format: FetchFormatExpression,
    /// Destination folder joined with the `{title}.{ext}` style template
    pub output_template: PathBuf,
    /// Run in order after download
    pub postprocessors: Vec<PostprocessStep>,
}

/// Progress callback handed to the extractor
pub type ProgressCallback<'a> = &'a mut (dyn FnMut(ProgressEvent) + Send);

/// Resolves a URL to streams, downloads and postprocesses them
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Name of the extractor (for logging)
    fn name(&self) -> &'static str;

    /// Run one download to completion, reporting every progress event
    async fn download(
        &self,
        request: ExtractRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), DownloadError>;
}

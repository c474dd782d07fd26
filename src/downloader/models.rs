// Common data models for the job engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::errors::ValidationError;

/// Output template used when the user leaves the field blank.
pub const DEFAULT_FILENAME_TEMPLATE: &str = "{title}.{ext}";

/// Codec used by the audio-only postprocessing step.
pub const AUDIO_CODEC: &str = "mp3";

/// Target bitrate (kbps) used by the audio-only postprocessing step.
pub const AUDIO_QUALITY: &str = "192";

/// Quality chosen once per job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualitySelection {
    /// Best video + best audio, merged
    #[default]
    #[serde(alias = "best")]
    Highest,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    /// Best audio stream alone, transcoded to mp3
    #[serde(rename = "audio")]
    AudioOnly,
}

impl QualitySelection {
    pub const ALL: [QualitySelection; 5] = [
        Self::Highest,
        Self::P1080,
        Self::P720,
        Self::P480,
        Self::AudioOnly,
    ];

    /// Stable label, also accepted by `FormatSelector::get_format_spec`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Highest => "best",
            Self::P1080 => "1080p",
            Self::P720 => "720p",
            Self::P480 => "480p",
            Self::AudioOnly => "audio",
        }
    }

    /// Maximum video height, `None` when unbounded or audio-only
    pub fn max_height(&self) -> Option<u32> {
        match self {
            Self::P1080 => Some(1080),
            Self::P720 => Some(720),
            Self::P480 => Some(480),
            Self::Highest | Self::AudioOnly => None,
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(self, Self::AudioOnly)
    }
}

impl fmt::Display for QualitySelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualitySelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "best" | "highest" => Ok(Self::Highest),
            "1080p" | "1080" => Ok(Self::P1080),
            "720p" | "720" => Ok(Self::P720),
            "480p" | "480" => Ok(Self::P480),
            "audio" | "audio-only" | "audioonly" => Ok(Self::AudioOnly),
            other => Err(format!("unknown quality: {}", other)),
        }
    }
}

/// Selector string handed to the extractor, produced only by `FormatSelector`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FetchFormatExpression(String);

impl FetchFormatExpression {
    pub(crate) fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FetchFormatExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable description of one submitted job.
///
/// Can only be built through [`JobDescriptor::new`], so a descriptor that
/// reaches the runner always has a non-blank url and destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    url: String,
    destination: PathBuf,
    quality: QualitySelection,
    filename_template: String,
}

impl JobDescriptor {
    pub fn new(
        url: &str,
        destination: impl AsRef<Path>,
        quality: QualitySelection,
        filename_template: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }

        let destination = destination.as_ref();
        if destination.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(ValidationError::EmptyDestination);
        }
        if destination.exists() && !destination.is_dir() {
            return Err(ValidationError::NotADirectory(destination.to_path_buf()));
        }

        let filename_template = filename_template
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_FILENAME_TEMPLATE)
            .to_string();

        Ok(Self {
            url: url.to_string(),
            destination: destination.to_path_buf(),
            quality,
            filename_template,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn quality(&self) -> QualitySelection {
        self.quality
    }

    pub fn filename_template(&self) -> &str {
        &self.filename_template
    }

    /// Destination folder joined with the filename template
    pub fn output_template(&self) -> PathBuf {
        self.destination.join(&self.filename_template)
    }
}

/// Postprocessing step passed to the extractor, run by the media processor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key")]
pub enum PostprocessStep {
    /// Write title/artist/etc. into the container
    EmbedMetadata,
    /// Drop video and transcode audio
    ExtractAudio { codec: String, quality: String },
}

impl PostprocessStep {
    /// Steps for a quality: metadata always, audio extraction only for audio-only jobs
    pub fn for_quality(quality: QualitySelection) -> Vec<PostprocessStep> {
        let mut steps = vec![PostprocessStep::EmbedMetadata];
        if quality.is_audio_only() {
            steps.push(PostprocessStep::ExtractAudio {
                codec: AUDIO_CODEC.to_string(),
                quality: AUDIO_QUALITY.to_string(),
            });
        }
        steps
    }
}

/// Raw phase reported by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressPhase {
    Downloading,
    Finished,
    Error,
    #[serde(other)]
    Other,
}

impl ProgressPhase {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "downloading" => Self::Downloading,
            "finished" => Self::Finished,
            "error" => Self::Error,
            _ => Self::Other,
        }
    }
}

/// One progress notification from the extractor. All payload fields are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub phase: ProgressPhase,
    pub downloaded_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub total_bytes_estimate: Option<u64>,
    /// Bytes per second
    pub speed: Option<f64>,
    /// Seconds remaining
    pub eta: Option<u64>,
    /// Pre-formatted speed (e.g. "1.20MiB/s")
    pub speed_text: Option<String>,
    /// Pre-formatted eta (e.g. "00:42")
    pub eta_text: Option<String>,
    pub filename: Option<String>,
}

impl ProgressEvent {
    pub fn new(phase: ProgressPhase) -> Self {
        Self {
            phase,
            downloaded_bytes: None,
            total_bytes: None,
            total_bytes_estimate: None,
            speed: None,
            eta: None,
            speed_text: None,
            eta_text: None,
            filename: None,
        }
    }

    pub fn downloading(downloaded: u64, total: Option<u64>) -> Self {
        Self {
            downloaded_bytes: Some(downloaded),
            total_bytes: total,
            ..Self::new(ProgressPhase::Downloading)
        }
    }

    pub fn finished() -> Self {
        Self::new(ProgressPhase::Finished)
    }

    /// Exact total, else the estimate; zero counts as unknown
    pub fn effective_total(&self) -> Option<u64> {
        self.total_bytes
            .filter(|t| *t > 0)
            .or(self.total_bytes_estimate)
            .filter(|t| *t > 0)
    }
}

/// Coarse stage of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobPhase {
    Idle,
    Queued,
    Downloading,
    Postprocessing,
    Done,
    Failed,
}

impl JobPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// Completion as shown by the progress indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Percent {
    Determinate(u8),
    Indeterminate,
}

impl Percent {
    pub fn value(&self) -> Option<u8> {
        match self {
            Self::Determinate(p) => Some(*p),
            Self::Indeterminate => None,
        }
    }
}

/// Status shown by the UI surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub phase: JobPhase,
    pub percent: Percent,
    pub message: String,
}

impl JobStatus {
    pub fn new(phase: JobPhase, percent: Percent, message: impl Into<String>) -> Self {
        Self {
            phase,
            percent,
            message: message.into(),
        }
    }

    /// Idle status shown at startup and after every job
    pub fn ready() -> Self {
        Self::new(JobPhase::Idle, Percent::Determinate(0), "Ready")
    }

    pub fn queued() -> Self {
        Self::new(JobPhase::Queued, Percent::Determinate(0), "Queued...")
    }
}

impl Default for JobStatus {
    fn default() -> Self {
        Self::ready()
    }
}

/// Failure tier reported with a terminal result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Classified source/transport failure, message shown verbatim
    Extraction,
    /// Anything else, shown with a generic message
    Unclassified,
}

/// Final outcome of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalResult {
    Completed {
        destination: PathBuf,
    },
    Failed {
        kind: FailureKind,
        message: String,
        /// Original error text, kept for diagnostics
        detail: Option<String>,
    },
}

impl TerminalResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Everything the UI surface can receive through the bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiUpdate {
    Status(JobStatus),
    Terminal(TerminalResult),
    SubmitEnabled(bool),
}

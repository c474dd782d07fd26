// Downloader module - job orchestration and progress reporting

pub mod bridge;
pub mod errors;
pub mod extractors;
pub mod format_selector;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod tools;
pub mod utils;

pub use bridge::{UiBridge, UiReceiver};
pub use errors::{DownloadError, SubmitError, ValidationError};
pub use format_selector::FormatSelector;
pub use models::{
    FailureKind, FetchFormatExpression, JobDescriptor, JobPhase, JobStatus, Percent,
    PostprocessStep, ProgressEvent, ProgressPhase, QualitySelection, TerminalResult, UiUpdate,
};
pub use orchestrator::{JobHandle, JobId, JobRunner};
pub use progress::ProgressReducer;

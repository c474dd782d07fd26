// Extractor module - the external capability that fetches media
//
// `Extractor` is the seam the job runner talks to; `YtDlpExtractor` is the
// production implementation. Tests substitute scripted extractors.

mod cli;
mod diagnostics;
mod traits;

pub use cli::{classify_failure, parse_progress_line, Launcher, YtDlpExtractor, PROGRESS_MARKER};
pub use diagnostics::{diagnose_error, BlockingReason};
pub use traits::{ExtractRequest, Extractor, ExtractorConfig, ExtractorMode, ProgressCallback};

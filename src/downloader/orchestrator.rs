// Job runner: one job at a time, off the UI context
//
// State machine: Idle -> Queued -> Downloading -> Postprocessing -> Done|Failed -> Idle
// Queued -> Failed and Downloading -> Failed are the only allowed skips.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::bridge::UiBridge;
use super::errors::{DownloadError, SubmitError};
use super::extractors::{ExtractRequest, Extractor};
use super::format_selector::FormatSelector;
use super::models::{
    FailureKind, JobDescriptor, JobPhase, JobStatus, Percent, PostprocessStep, ProgressEvent,
    TerminalResult,
};
use super::progress::ProgressReducer;

pub type JobId = u64;

/// Message shown for failures that are not classified extraction errors
pub const GENERIC_FAILURE_MESSAGE: &str = "An unexpected error occurred while downloading.";

#[derive(Debug, Default)]
struct RunnerState {
    in_flight: bool,
    active: Option<JobId>,
    last_id: JobId,
    /// Percent of the last status the active job posted
    last_percent: Option<Percent>,
}

/// State shared between the submitting context and the worker
struct Shared {
    state: Mutex<RunnerState>,
    bridge: UiBridge,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns the single-job lifecycle
pub struct JobRunner {
    shared: Arc<Shared>,
    extractor: Arc<dyn Extractor>,
    runtime: Handle,
}

impl JobRunner {
    /// Create a runner that spawns jobs on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime; use [`JobRunner::with_runtime`] there.
    pub fn new(extractor: Arc<dyn Extractor>, bridge: UiBridge) -> Self {
        Self::with_runtime(extractor, bridge, Handle::current())
    }

    pub fn with_runtime(extractor: Arc<dyn Extractor>, bridge: UiBridge, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(RunnerState::default()),
                bridge,
            }),
            extractor,
            runtime,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.shared.lock().in_flight
    }

    /// Id of the job in flight, if any
    pub fn active_job(&self) -> Option<JobId> {
        self.shared.lock().active
    }

    /// Accept a job and start it on a worker task. Returns immediately.
    ///
    /// Fails with [`SubmitError::Busy`] while another job is in flight; in that
    /// case nothing is posted and the running job is untouched.
    pub fn submit(&self, descriptor: JobDescriptor) -> Result<JobHandle, SubmitError> {
        let job_id = {
            let mut state = self.shared.lock();
            if state.in_flight {
                tracing::warn!(active = ?state.active, "submit rejected, job in flight");
                return Err(SubmitError::Busy);
            }
            state.in_flight = true;
            state.last_id += 1;
            state.active = Some(state.last_id);
            state.last_percent = Some(Percent::Determinate(0));

            // Posted under the lock so Queued can never overtake the previous job's Ready
            self.shared.bridge.set_submit_enabled(false);
            self.shared.bridge.post_status(JobStatus::queued());
            state.last_id
        };

        tracing::info!(
            job_id,
            extractor = self.extractor.name(),
            url = descriptor.url(),
            quality = %descriptor.quality(),
            destination = %descriptor.destination().display(),
            "job submitted"
        );

        let shared = Arc::clone(&self.shared);
        let extractor = Arc::clone(&self.extractor);
        let runtime = self.runtime.clone();
        let join = self.runtime.spawn(async move {
            let mut flight = InFlightGuard::new(shared, job_id);
            let destination = descriptor.destination().to_path_buf();
            let worker_shared = Arc::clone(&flight.shared);

            // Separate task so a panic inside the job is caught as a JoinError
            let outcome = runtime
                .spawn(execute(job_id, descriptor, extractor, worker_shared))
                .await;

            let result = flight.finish(outcome, destination);
            flight.release();
            result
        });

        Ok(JobHandle { id: job_id, join })
    }
}

/// Completion handle for a submitted job
#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    join: JoinHandle<TerminalResult>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the terminal result. The runner accepts new submissions by then.
    pub async fn wait(self) -> TerminalResult {
        match self.join.await {
            Ok(result) => result,
            Err(e) => TerminalResult::Failed {
                kind: FailureKind::Unclassified,
                message: GENERIC_FAILURE_MESSAGE.to_string(),
                detail: Some(e.to_string()),
            },
        }
    }
}

/// What the worker hands back: its last status and the extractor outcome
type JobOutcome = (JobStatus, Result<(), DownloadError>);

async fn execute(
    job_id: JobId,
    descriptor: JobDescriptor,
    extractor: Arc<dyn Extractor>,
    shared: Arc<Shared>,
) -> JobOutcome {
    let bridge = &shared.bridge;
    let mut status = JobStatus::queued();

    if let Err(e) = tokio::fs::create_dir_all(descriptor.destination()).await {
        return (status, Err(DownloadError::Io(e)));
    }

    let request = ExtractRequest {
        url: descriptor.url().to_string(),
        format: FormatSelector::resolve(descriptor.quality()),
        output_template: descriptor.output_template(),
        postprocessors: PostprocessStep::for_quality(descriptor.quality()),
    };
    tracing::debug!(job_id, format = %request.format, steps = ?request.postprocessors, "resolved request");

    status = JobStatus::new(JobPhase::Queued, status.percent, "Starting download...");
    bridge.post_status(status.clone());

    let mut on_progress = |event: ProgressEvent| {
        let next = ProgressReducer::reduce(&event, &status);
        if next != status {
            bridge.post_status(next.clone());
            shared.lock().last_percent = Some(next.percent);
            status = next;
        }
    };
    let result = extractor.download(request, &mut on_progress).await;

    (status, result)
}

/// Holds the in-flight flag for one job and restores the runner on drop
struct InFlightGuard {
    shared: Arc<Shared>,
    job_id: JobId,
    released: bool,
}

impl InFlightGuard {
    fn new(shared: Arc<Shared>, job_id: JobId) -> Self {
        Self {
            shared,
            job_id,
            released: false,
        }
    }

    /// Post the terminal status and result
    fn finish(
        &self,
        outcome: Result<JobOutcome, tokio::task::JoinError>,
        destination: PathBuf,
    ) -> TerminalResult {
        let bridge = &self.shared.bridge;
        let job_id = self.job_id;

        let (last_percent, result) = match outcome {
            Ok((status, result)) => (status.percent, result.map_err(Failure::Download)),
            Err(join_error) => {
                let last_posted = self.shared.lock().last_percent;
                (
                    last_posted.unwrap_or(Percent::Determinate(0)),
                    Err(Failure::Panicked(join_error)),
                )
            }
        };

        let (status, terminal) = match result {
            Ok(()) => {
                tracing::info!(job_id, destination = %destination.display(), "job done");
                (
                    JobStatus::new(
                        JobPhase::Done,
                        Percent::Determinate(100),
                        "Done, download completed.",
                    ),
                    TerminalResult::Completed { destination },
                )
            }
            Err(Failure::Download(DownloadError::Extraction(message))) => {
                tracing::warn!(job_id, error = %message, "job failed: extraction error");
                (
                    JobStatus::new(JobPhase::Failed, last_percent, "Download error."),
                    TerminalResult::Failed {
                        kind: FailureKind::Extraction,
                        message,
                        detail: None,
                    },
                )
            }
            Err(failure) => {
                let detail = failure.to_string();
                tracing::error!(job_id, error = %detail, "job failed");
                (
                    JobStatus::new(JobPhase::Failed, last_percent, "Error."),
                    TerminalResult::Failed {
                        kind: FailureKind::Unclassified,
                        message: GENERIC_FAILURE_MESSAGE.to_string(),
                        detail: Some(detail),
                    },
                )
            }
        };

        bridge.post_status(status);
        bridge.post_terminal(terminal.clone());
        terminal
    }

    /// Back to Ready and re-enable submission, under the submit lock
    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut state = self.shared.lock();
        self.shared.bridge.post_status(JobStatus::ready());
        self.shared.bridge.set_submit_enabled(true);
        state.in_flight = false;
        state.active = None;
        state.last_percent = None;
        tracing::debug!(job_id = self.job_id, "runner idle");
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.release();
    }
}

enum Failure {
    Download(DownloadError),
    Panicked(tokio::task::JoinError),
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download(e) => write!(f, "{}", e),
            Self::Panicked(e) => write!(f, "worker task failed: {}", e),
        }
    }
}

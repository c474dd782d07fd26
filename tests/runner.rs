use async_trait::async_trait;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use media_fetch_lib::downloader::extractors::{ExtractRequest, Extractor, ProgressCallback};
use media_fetch_lib::downloader::orchestrator::GENERIC_FAILURE_MESSAGE;
use media_fetch_lib::downloader::{
    DownloadError, FailureKind, JobDescriptor, JobPhase, JobRunner, JobStatus, Percent,
    PostprocessStep, ProgressEvent, QualitySelection, SubmitError, TerminalResult, UiBridge,
    UiReceiver, UiUpdate, ValidationError,
};

#[derive(Clone)]
enum Outcome {
    Succeed,
    Extraction(&'static str),
    MissingProcessor,
    Panic,
}

/// Extractor that replays fixed events, optionally waiting on a gate first.
struct ScriptedExtractor {
    events: Vec<ProgressEvent>,
    outcome: Outcome,
    started: Arc<Notify>,
    gate: Option<Arc<Notify>>,
    requests: Mutex<Vec<ExtractRequest>>,
}

impl ScriptedExtractor {
    fn new(events: Vec<ProgressEvent>, outcome: Outcome) -> Self {
        Self {
            events,
            outcome,
            started: Arc::new(Notify::new()),
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    fn requests(&self) -> Vec<ExtractRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn download(
        &self,
        request: ExtractRequest,
        on_progress: ProgressCallback<'_>,
    ) -> Result<(), DownloadError> {
        self.requests.lock().unwrap().push(request);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        for event in &self.events {
            on_progress(event.clone());
        }

        match self.outcome.clone() {
            Outcome::Succeed => Ok(()),
            Outcome::Extraction(message) => Err(DownloadError::Extraction(message.to_string())),
            Outcome::MissingProcessor => Err(DownloadError::MediaProcessorMissing(
                "ERROR: ffmpeg not found".to_string(),
            )),
            Outcome::Panic => panic!("extractor blew up"),
        }
    }
}

fn descriptor(dest: &Path, quality: QualitySelection) -> JobDescriptor {
    JobDescriptor::new("https://example.com/watch?v=abc", dest, quality, None).unwrap()
}

fn statuses(updates: &[UiUpdate]) -> Vec<JobStatus> {
    updates
        .iter()
        .filter_map(|u| match u {
            UiUpdate::Status(s) => Some(s.clone()),
            _ => None,
        })
        .collect()
}

fn terminals(updates: &[UiUpdate]) -> Vec<TerminalResult> {
    updates
        .iter()
        .filter_map(|u| match u {
            UiUpdate::Terminal(t) => Some(t.clone()),
            _ => None,
        })
        .collect()
}

fn setup(extractor: Arc<ScriptedExtractor>) -> (JobRunner, UiReceiver) {
    let (bridge, rx) = UiBridge::new();
    (JobRunner::new(extractor, bridge), rx)
}

#[tokio::test]
async fn test_successful_job_posts_full_sequence_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::new(
        vec![
            ProgressEvent::downloading(50, Some(100)),
            ProgressEvent::downloading(100, Some(100)),
            ProgressEvent::finished(),
        ],
        Outcome::Succeed,
    ));
    let (runner, mut rx) = setup(extractor.clone());

    let handle = runner
        .submit(descriptor(dir.path(), QualitySelection::Highest))
        .unwrap();
    let result = handle.wait().await;

    assert_eq!(
        result,
        TerminalResult::Completed {
            destination: dir.path().to_path_buf()
        }
    );
    assert!(!runner.is_busy());
    assert_eq!(runner.active_job(), None);

    let updates = rx.drain();
    assert_eq!(
        updates,
        vec![
            UiUpdate::SubmitEnabled(false),
            UiUpdate::Status(JobStatus::queued()),
            UiUpdate::Status(JobStatus::new(
                JobPhase::Queued,
                Percent::Determinate(0),
                "Starting download..."
            )),
            UiUpdate::Status(JobStatus::new(
                JobPhase::Downloading,
                Percent::Determinate(50),
                "Downloading... 50%"
            )),
            UiUpdate::Status(JobStatus::new(
                JobPhase::Downloading,
                Percent::Determinate(100),
                "Downloading... 100%"
            )),
            UiUpdate::Status(JobStatus::new(
                JobPhase::Postprocessing,
                Percent::Determinate(100),
                "Merging/processing final file..."
            )),
            UiUpdate::Status(JobStatus::new(
                JobPhase::Done,
                Percent::Determinate(100),
                "Done, download completed."
            )),
            UiUpdate::Terminal(result),
            UiUpdate::Status(JobStatus::ready()),
            UiUpdate::SubmitEnabled(true),
        ]
    );

    let requests = extractor.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].format.as_str(), "bestvideo+bestaudio/best");
    assert_eq!(requests[0].output_template, dir.path().join("{title}.{ext}"));
    assert_eq!(requests[0].postprocessors, vec![PostprocessStep::EmbedMetadata]);
}

#[tokio::test]
async fn test_audio_only_requests_one_extraction_step() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::new(vec![], Outcome::Succeed));
    let (runner, _rx) = setup(extractor.clone());

    runner
        .submit(descriptor(dir.path(), QualitySelection::AudioOnly))
        .unwrap()
        .wait()
        .await;

    let steps = &extractor.requests()[0].postprocessors;
    assert_eq!(steps.len(), 2);
    assert!(steps.contains(&PostprocessStep::EmbedMetadata));
    assert_eq!(
        steps
            .iter()
            .filter(|s| matches!(s, PostprocessStep::ExtractAudio { .. }))
            .count(),
        1
    );
    assert_eq!(extractor.requests()[0].format.as_str(), "bestaudio");
}

#[tokio::test]
async fn test_second_submit_is_busy_and_first_stream_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let gate = Arc::new(Notify::new());
    let extractor = Arc::new(
        ScriptedExtractor::new(
            vec![ProgressEvent::downloading(10, Some(20)), ProgressEvent::finished()],
            Outcome::Succeed,
        )
        .gated(gate.clone()),
    );
    let (runner, mut rx) = setup(extractor.clone());

    let first = runner
        .submit(descriptor(dir.path(), QualitySelection::P720))
        .unwrap();
    extractor.started.notified().await;
    assert!(runner.is_busy());
    assert_eq!(runner.active_job(), Some(first.id()));

    let second = runner.submit(descriptor(dir.path(), QualitySelection::P480));
    assert!(matches!(second, Err(SubmitError::Busy)));

    gate.notify_one();
    let result = first.wait().await;
    assert!(result.is_success());

    let updates = rx.drain();
    let queued = statuses(&updates)
        .iter()
        .filter(|s| s.message == "Queued...")
        .count();
    assert_eq!(queued, 1);
    assert_eq!(terminals(&updates).len(), 1);
    assert_eq!(
        updates
            .iter()
            .filter(|u| matches!(u, UiUpdate::SubmitEnabled(false)))
            .count(),
        1
    );
    assert_eq!(extractor.requests().len(), 1);
}

#[tokio::test]
async fn test_runner_accepts_jobs_after_done_and_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let ok = Arc::new(ScriptedExtractor::new(vec![], Outcome::Succeed));
    let (runner, mut rx) = setup(ok.clone());

    let first = runner
        .submit(descriptor(dir.path(), QualitySelection::Highest))
        .unwrap();
    let first_id = first.id();
    first.wait().await;

    let second = runner
        .submit(descriptor(dir.path(), QualitySelection::Highest))
        .unwrap();
    assert_ne!(second.id(), first_id);
    second.wait().await;
    assert_eq!(ok.requests().len(), 2);

    let failing = Arc::new(ScriptedExtractor::new(
        vec![],
        Outcome::Extraction("ERROR: Unsupported URL: https://example.com"),
    ));
    let (bridge, _rx2) = UiBridge::new();
    let runner = JobRunner::new(failing.clone(), bridge);
    assert!(!runner
        .submit(descriptor(dir.path(), QualitySelection::Highest))
        .unwrap()
        .wait()
        .await
        .is_success());
    assert!(!runner.is_busy());
    assert!(runner
        .submit(descriptor(dir.path(), QualitySelection::Highest))
        .is_ok());

    let updates = rx.drain();
    assert_eq!(terminals(&updates).len(), 2);
    assert_eq!(updates.last(), Some(&UiUpdate::SubmitEnabled(true)));
}

#[tokio::test]
async fn test_extraction_failure_is_reported_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let message = "ERROR: [youtube] abc: Private video. Sign in if you've been granted access";
    let extractor = Arc::new(ScriptedExtractor::new(
        vec![ProgressEvent::downloading(30, Some(100))],
        Outcome::Extraction(message),
    ));
    let (runner, mut rx) = setup(extractor);

    let result = runner
        .submit(descriptor(dir.path(), QualitySelection::P1080))
        .unwrap()
        .wait()
        .await;

    assert_eq!(
        result,
        TerminalResult::Failed {
            kind: FailureKind::Extraction,
            message: message.to_string(),
            detail: None,
        }
    );

    let updates = rx.drain();
    let statuses = statuses(&updates);
    let failed = statuses
        .iter()
        .find(|s| s.phase == JobPhase::Failed)
        .unwrap();
    assert_eq!(failed.message, "Download error.");
    assert_eq!(failed.percent, Percent::Determinate(30));
    assert_eq!(statuses.last(), Some(&JobStatus::ready()));
}

#[tokio::test]
async fn test_other_failures_use_generic_message_and_keep_detail() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::new(vec![], Outcome::MissingProcessor));
    let (runner, mut rx) = setup(extractor);

    let result = runner
        .submit(descriptor(dir.path(), QualitySelection::Highest))
        .unwrap()
        .wait()
        .await;

    match result {
        TerminalResult::Failed {
            kind,
            message,
            detail,
        } => {
            assert_eq!(kind, FailureKind::Unclassified);
            assert_eq!(message, GENERIC_FAILURE_MESSAGE);
            assert!(detail.unwrap().contains("ffmpeg not found"));
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let statuses = statuses(&rx.drain());
    assert!(statuses
        .iter()
        .any(|s| s.phase == JobPhase::Failed && s.message == "Error."));
}

#[tokio::test]
async fn test_unusable_destination_fails_from_queued() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("occupied");
    std::fs::write(&file, b"x").unwrap();
    let extractor = Arc::new(ScriptedExtractor::new(vec![], Outcome::Succeed));
    let (runner, mut rx) = setup(extractor.clone());

    let result = runner
        .submit(descriptor(&file.join("sub"), QualitySelection::Highest))
        .unwrap()
        .wait()
        .await;

    assert!(matches!(
        result,
        TerminalResult::Failed {
            kind: FailureKind::Unclassified,
            ..
        }
    ));
    assert!(extractor.requests().is_empty());

    let phases: Vec<JobPhase> = statuses(&rx.drain()).iter().map(|s| s.phase).collect();
    assert_eq!(phases, vec![JobPhase::Queued, JobPhase::Failed, JobPhase::Idle]);
}

#[tokio::test]
async fn test_panicking_extractor_still_releases_runner() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::new(vec![], Outcome::Panic));
    let (runner, mut rx) = setup(extractor);

    let result = runner
        .submit(descriptor(dir.path(), QualitySelection::Highest))
        .unwrap()
        .wait()
        .await;

    match result {
        TerminalResult::Failed { kind, detail, .. } => {
            assert_eq!(kind, FailureKind::Unclassified);
            assert!(detail.is_some());
        }
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(!runner.is_busy());

    let updates = rx.drain();
    assert_eq!(updates.last(), Some(&UiUpdate::SubmitEnabled(true)));
    assert_eq!(terminals(&updates).len(), 1);
}

#[tokio::test]
async fn test_panic_after_progress_keeps_last_percent() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::new(
        vec![ProgressEvent::downloading(40, Some(100))],
        Outcome::Panic,
    ));
    let (runner, mut rx) = setup(extractor);

    runner
        .submit(descriptor(dir.path(), QualitySelection::P720))
        .unwrap()
        .wait()
        .await;

    let statuses = statuses(&rx.drain());
    let failed = statuses
        .iter()
        .find(|s| s.phase == JobPhase::Failed)
        .unwrap();
    assert_eq!(failed.percent, Percent::Determinate(40));
    assert_eq!(failed.message, "Error.");
}

#[tokio::test]
async fn test_empty_url_never_reaches_runner() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = Arc::new(ScriptedExtractor::new(vec![], Outcome::Succeed));
    let (runner, mut rx) = setup(extractor.clone());

    let err = JobDescriptor::new("", dir.path(), QualitySelection::Highest, None).unwrap_err();
    assert!(matches!(err, ValidationError::EmptyUrl));

    assert!(!runner.is_busy());
    assert!(rx.try_recv().is_none());
    assert!(extractor.requests().is_empty());
}

#[tokio::test]
async fn test_unknown_total_shows_indeterminate_progress() {
    let dir = tempfile::tempdir().unwrap();
    let mut event = ProgressEvent::downloading(4096, None);
    event.eta = Some(75);
    let extractor = Arc::new(ScriptedExtractor::new(
        vec![event, ProgressEvent::finished()],
        Outcome::Succeed,
    ));
    let (runner, mut rx) = setup(extractor);

    runner
        .submit(descriptor(dir.path(), QualitySelection::P480))
        .unwrap()
        .wait()
        .await;

    let statuses = statuses(&rx.drain());
    let downloading = statuses
        .iter()
        .find(|s| s.phase == JobPhase::Downloading)
        .unwrap();
    assert_eq!(downloading.percent, Percent::Indeterminate);
    assert_eq!(downloading.message, "Downloading... ETA 01:15");
}

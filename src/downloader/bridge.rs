// UI bridge: ordered hand-off from worker context to the UI context

use tokio::sync::mpsc;

use super::models::{JobStatus, TerminalResult, UiUpdate};

/// Sending half. Cheap to clone, usable from any thread or task.
///
/// Backed by an unbounded channel: `post` never blocks, never drops an
/// update while the receiver is alive, and delivers in post order.
#[derive(Debug, Clone)]
pub struct UiBridge {
    tx: mpsc::UnboundedSender<UiUpdate>,
}

/// Receiving half, owned by the single UI context
#[derive(Debug)]
pub struct UiReceiver {
    rx: mpsc::UnboundedReceiver<UiUpdate>,
}

impl UiBridge {
    pub fn new() -> (Self, UiReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UiReceiver { rx })
    }

    pub fn post(&self, update: UiUpdate) {
        if self.tx.send(update).is_err() {
            tracing::warn!("UI receiver dropped, update discarded");
        }
    }

    pub fn post_status(&self, status: JobStatus) {
        self.post(UiUpdate::Status(status));
    }

    pub fn post_terminal(&self, result: TerminalResult) {
        self.post(UiUpdate::Terminal(result));
    }

    pub fn set_submit_enabled(&self, enabled: bool) {
        self.post(UiUpdate::SubmitEnabled(enabled));
    }
}

impl UiReceiver {
    /// Wait for the next update. `None` once every bridge handle is dropped.
    pub async fn recv(&mut self) -> Option<UiUpdate> {
        self.rx.recv().await
    }

    /// Non-blocking poll for render loops that tick on their own
    pub fn try_recv(&mut self) -> Option<UiUpdate> {
        self.rx.try_recv().ok()
    }

    /// Everything currently queued, in order
    pub fn drain(&mut self) -> Vec<UiUpdate> {
        let mut updates = Vec::new();
        while let Some(update) = self.try_recv() {
            updates.push(update);
        }
        updates
    }
}

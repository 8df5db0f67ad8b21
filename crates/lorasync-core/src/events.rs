//! Observable events emitted by a sync session.

use serde::Serialize;
use tokio::sync::mpsc;

/// One event in a session's ordered stream.
///
/// Events produced while reconciling artifact *n* always arrive before the
/// `Progress` event for *n*.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum SyncEvent {
    /// Human-readable log line.
    Log(String),
    /// An artifact finished; `processed` of `total` are done.
    Progress { processed: usize, total: usize },
    /// A preview image was written to disk.
    PreviewWritten,
    /// A metadata document was written to disk.
    MetadataWritten,
    /// The session ended (completed, aborted or failed).
    Finished { matched: usize, unmatched: usize },
    /// Something failed; processing may continue.
    Error(String),
}

/// Sending half of a session's event stream.
///
/// Sends never block and are silently dropped once the receiver is gone, so
/// a caller that stops listening does not stall the worker.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<SyncEvent>,
}

impl EventSink {
    /// Create a connected sink and its receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: SyncEvent) {
        let _ = self.tx.send(event);
    }

    pub fn log(&self, message: impl Into<String>) {
        self.emit(SyncEvent::Log(message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(SyncEvent::Error(message.into()));
    }
}

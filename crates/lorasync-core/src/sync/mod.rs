//! Sync orchestration: discover artifacts, then fingerprint, look up and
//! reconcile them one at a time on a dedicated task.
//!
//! Per artifact the worker runs hash -> lookup -> reconcile strictly in
//! sequence and then emits `Progress`. Cancellation is only observed between
//! artifacts. Events from one session travel over a single channel, so
//! their order is the order in which the worker produced them.

mod session;

pub use session::{SessionReport, SessionState};

use crate::artifact::{discover_artifacts, Artifact};
use crate::cancel::CancellationToken;
use crate::catalog::CatalogClient;
use crate::error::{Result, SyncError};
use crate::events::{EventSink, SyncEvent};
use crate::hashing::fingerprint_blocking_task;
use crate::reconcile::{ReconciliationOutcome, Reconciler};
use session::SyncSession;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Starts sync sessions against a catalog.
#[derive(Clone)]
pub struct SyncOrchestrator {
    client: Arc<dyn CatalogClient>,
    recursive: bool,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("recursive", &self.recursive)
            .finish()
    }
}

impl SyncOrchestrator {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self {
            client,
            recursive: true,
        }
    }

    /// Only scan the root directory itself when `false`.
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Spawn a session over every artifact under `root`.
    ///
    /// Must be called from within a tokio runtime. The artifact list is
    /// enumerated once when the worker starts.
    pub fn start(&self, root: impl Into<PathBuf>) -> SessionHandle {
        let root = root.into();
        let (events, event_rx) = EventSink::channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Idle);
        let cancel = CancellationToken::new();

        let worker = Worker {
            client: self.client.clone(),
            recursive: self.recursive,
            cancel: cancel.clone(),
            events,
            state: state_tx,
        };
        let task = tokio::spawn(worker.run(root));

        SessionHandle {
            cancel,
            events: event_rx,
            state: state_rx,
            task,
        }
    }
}

/// Caller-side handle to a running session.
pub struct SessionHandle {
    cancel: CancellationToken,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    /// Ask the session to stop before its next artifact.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Next event, or `None` once the session has ended and all events were read.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }

    /// Wait for the session to end, discarding unread events.
    pub async fn wait(self) -> Result<SessionReport> {
        self.task
            .await
            .map_err(|e| SyncError::Other(format!("Sync worker panicked: {}", e)))
    }

    /// Read every remaining event, then return them with the final report.
    pub async fn collect(mut self) -> Result<(Vec<SyncEvent>, SessionReport)> {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let report = self.wait().await?;
        Ok((events, report))
    }
}

struct Worker {
    client: Arc<dyn CatalogClient>,
    recursive: bool,
    cancel: CancellationToken,
    events: EventSink,
    state: watch::Sender<SessionState>,
}

impl Worker {
    async fn run(self, root: PathBuf) -> SessionReport {
        let _ = self.state.send(SessionState::Running);

        let artifacts = match self.discover(&root).await {
            Ok(artifacts) => artifacts,
            Err(error) => return self.finish(&SyncSession::default(), Some(error)),
        };

        let mut session = SyncSession::new(artifacts);
        info!(
            "Syncing {} artifacts under {}",
            session.total,
            root.display()
        );
        self.events.log(format!(
            "Found {} models under {}",
            session.total,
            root.display()
        ));

        let reconciler = Reconciler::new(self.client.as_ref(), &self.events);
        while let Some(artifact) = session.next_artifact() {
            if let Err(reason) = self.cancel.check() {
                debug!("{} before {}", reason, artifact.path.display());
                return self.finish_aborted(&session);
            }

            let outcome = match self.process(&reconciler, &artifact).await {
                Ok(outcome) => outcome,
                Err(error) => return self.finish(&session, Some(error)),
            };
            session.record(outcome.as_ref());
            self.events.emit(SyncEvent::Progress {
                processed: session.processed,
                total: session.total,
            });
        }

        self.finish(&session, None)
    }

    async fn discover(&self, root: &Path) -> Result<Vec<Artifact>> {
        let root = root.to_path_buf();
        let recursive = self.recursive;
        tokio::task::spawn_blocking(move || discover_artifacts(&root, recursive))
            .await
            .map_err(|e| SyncError::Other(format!("Artifact discovery task failed: {}", e)))?
    }

    /// `Ok(None)` means the artifact failed on its own and was logged;
    /// `Err` is reserved for session-fatal errors.
    async fn process(
        &self,
        reconciler: &Reconciler<'_>,
        artifact: &Artifact,
    ) -> Result<Option<ReconciliationOutcome>> {
        debug!("Hashing {}", artifact.path.display());
        let fingerprint = match fingerprint_blocking_task(artifact.path.clone()).await {
            Ok(fingerprint) => fingerprint,
            Err(error) => {
                self.artifact_error(artifact, "hash", &error);
                return Ok(None);
            }
        };

        let record = match self.client.lookup_by_fingerprint(&fingerprint).await {
            Ok(record) => record,
            Err(error) if error.is_session_fatal() => return Err(error),
            Err(error) => {
                self.artifact_error(artifact, "look up", &error);
                return Ok(None);
            }
        };

        let Some(record) = record else {
            self.events.log(format!(
                "No catalog entry for {} ({})",
                artifact.path.display(),
                fingerprint
            ));
            return Ok(Some(ReconciliationOutcome::NoCatalogRecord));
        };

        self.events
            .log(format!("Matched {}", artifact.path.display()));
        let outcome = reconciler
            .reconcile(&record, artifact, &artifact.dir)
            .await;
        Ok(Some(outcome))
    }

    fn artifact_error(&self, artifact: &Artifact, action: &str, error: &SyncError) {
        warn!("Failed to {} {}: {}", action, artifact.path.display(), error);
        self.events.error(format!(
            "Failed to {} {}: {}",
            action,
            artifact.path.display(),
            error
        ));
        self.events.log(format!(
            "Skipping {}, counted as unmatched",
            artifact.path.display()
        ));
    }

    fn finish_aborted(&self, session: &SyncSession) -> SessionReport {
        let report = session.report(SessionState::Aborted, None);
        let line = format!(
            "Sync cancelled after {}/{} models: {} matched, {} unmatched",
            report.processed, report.total, report.matched, report.unmatched
        );
        self.conclude(report, line)
    }

    fn finish(&self, session: &SyncSession, error: Option<SyncError>) -> SessionReport {
        match error {
            Some(error) => {
                warn!("Sync failed: {}", error);
                self.events.error(format!("Sync failed: {}", error));
                let report = session.report(SessionState::Failed, Some(error.to_string()));
                let line = format!(
                    "Sync failed after {}/{} models: {}",
                    report.processed, report.total, error
                );
                self.conclude(report, line)
            }
            None => {
                let report = session.report(SessionState::Completed, None);
                let line = format!(
                    "Sync complete: {}/{} models, {} matched, {} unmatched, {} previews, {} metadata files written",
                    report.processed,
                    report.total,
                    report.matched,
                    report.unmatched,
                    report.previews_written,
                    report.metadata_written
                );
                self.conclude(report, line)
            }
        }
    }

    fn conclude(&self, report: SessionReport, line: String) -> SessionReport {
        info!("{}", line);
        self.events.log(line);
        let _ = self.state.send(report.state);
        self.events.emit(SyncEvent::Finished {
            matched: report.matched,
            unmatched: report.unmatched,
        });
        report
    }
}

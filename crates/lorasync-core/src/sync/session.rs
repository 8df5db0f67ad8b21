//! Mutable run state of one sync session.

use crate::artifact::Artifact;
use crate::reconcile::ReconciliationOutcome;
use serde::Serialize;
use std::collections::VecDeque;

/// Lifecycle of a session: `Idle -> Running -> {Completed, Aborted, Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Completed,
    Aborted,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Aborted | SessionState::Failed
        )
    }
}

/// Final tallies of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub state: SessionState,
    pub processed: usize,
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub previews_written: usize,
    pub metadata_written: usize,
    /// Side-car files that failed inside matched artifacts.
    pub file_failures: usize,
    /// Artifacts that could not be hashed or looked up.
    pub artifact_errors: usize,
    /// Reason for a `Failed` session.
    pub error: Option<String>,
}

/// Queue and counters owned by the worker.
#[derive(Debug, Default)]
pub(crate) struct SyncSession {
    queue: VecDeque<Artifact>,
    pub total: usize,
    pub processed: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub previews_written: usize,
    pub metadata_written: usize,
    pub file_failures: usize,
    pub artifact_errors: usize,
}

impl SyncSession {
    pub fn new(artifacts: Vec<Artifact>) -> Self {
        Self {
            total: artifacts.len(),
            queue: artifacts.into(),
            ..Self::default()
        }
    }

    pub fn next_artifact(&mut self) -> Option<Artifact> {
        self.queue.pop_front()
    }

    /// Count a finished artifact. `None` means it failed before reconciliation.
    pub fn record(&mut self, outcome: Option<&ReconciliationOutcome>) {
        match outcome {
            Some(ReconciliationOutcome::NoCatalogRecord) => self.unmatched += 1,
            Some(outcome) => {
                self.matched += 1;
                if let Some(summary) = outcome.summary() {
                    self.previews_written += summary.previews_written;
                    self.metadata_written += usize::from(summary.metadata_written);
                }
                self.file_failures += outcome.failures().len();
            }
            None => {
                self.unmatched += 1;
                self.artifact_errors += 1;
            }
        }
        self.processed += 1;
    }

    pub fn report(&self, state: SessionState, error: Option<String>) -> SessionReport {
        SessionReport {
            state,
            processed: self.processed,
            total: self.total,
            matched: self.matched,
            unmatched: self.unmatched,
            previews_written: self.previews_written,
            metadata_written: self.metadata_written,
            file_failures: self.file_failures,
            artifact_errors: self.artifact_errors,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::reconcile::{FileFailure, ReconcileSummary};
    use std::path::PathBuf;

    fn artifacts(n: usize) -> Vec<Artifact> {
        (0..n)
            .map(|i| Artifact::from_path(format!("/m/{}.safetensors", i)).unwrap())
            .collect()
    }

    #[test]
    fn test_queue_order_and_total() {
        let mut session = SyncSession::new(artifacts(3));
        assert_eq!(session.total, 3);
        assert!(session.next_artifact().unwrap().path.ends_with("0.safetensors"));
        assert!(session.next_artifact().unwrap().path.ends_with("1.safetensors"));
        assert!(session.next_artifact().unwrap().path.ends_with("2.safetensors"));
        assert!(session.next_artifact().is_none());
    }

    #[test]
    fn test_record_counts() {
        let mut session = SyncSession::new(artifacts(4));

        session.record(Some(&ReconciliationOutcome::Synced(ReconcileSummary {
            metadata_written: true,
            previews_written: 2,
            ..Default::default()
        })));
        session.record(Some(&ReconciliationOutcome::NoCatalogRecord));
        session.record(Some(&ReconciliationOutcome::PartiallySynced {
            summary: ReconcileSummary::default(),
            failures: vec![FileFailure {
                destination: PathBuf::from("/m/x.png"),
                error: SyncError::Other("boom".into()),
            }],
        }));
        session.record(None);

        let report = session.report(SessionState::Completed, None);
        assert_eq!(report.processed, 4);
        assert_eq!(report.matched, 2);
        assert_eq!(report.unmatched, 2);
        assert_eq!(report.previews_written, 2);
        assert_eq!(report.metadata_written, 1);
        assert_eq!(report.file_failures, 1);
        assert_eq!(report.artifact_errors, 1);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SessionState::Idle.is_terminal());
        assert!(!SessionState::Running.is_terminal());
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Aborted.is_terminal());
        assert!(SessionState::Failed.is_terminal());
    }
}

//! lorasync core - keeps model side-car files in sync with a remote catalog.
//!
//! Every `.safetensors` artifact under a root directory is fingerprinted with
//! SHA256 and resolved against a Civitai-compatible `by-hash` endpoint. The
//! returned record is then reconciled onto disk next to the artifact: a
//! metadata document, preview images and any other declared files. Nothing is
//! rewritten when it is already up to date, and the artifact itself is only
//! ever read.
//!
//! # Example
//!
//! ```rust,ignore
//! use lorasync_core::{start_sync, SyncEvent, SyncOptions};
//!
//! #[tokio::main]
//! async fn main() -> lorasync_core::Result<()> {
//!     let options = SyncOptions::new().resolve_credential();
//!     let mut session = start_sync("/models/loras", &options)?;
//!
//!     while let Some(event) = session.next_event().await {
//!         if let SyncEvent::Progress { processed, total } = event {
//!             println!("{}/{}", processed, total);
//!         }
//!     }
//!
//!     let report = session.wait().await?;
//!     println!("{} matched, {} unmatched", report.matched, report.unmatched);
//!     Ok(())
//! }
//! ```

pub mod artifact;
pub mod cancel;
pub mod catalog;
pub mod config;
pub mod error;
pub mod events;
pub mod hashing;
pub mod naming;
pub mod reconcile;
pub mod sync;

pub use artifact::{discover_artifacts, locate_sidecars, Artifact, Sidecars};
pub use cancel::CancellationToken;
pub use catalog::{CatalogClient, CatalogRecord, HttpCatalogClient, RemoteFile, RemoteImage};
pub use config::{CatalogConfig, HashConfig, SyncOptions};
pub use error::{Result, SyncError};
pub use events::{EventSink, SyncEvent};
pub use hashing::{fingerprint, Fingerprint};
pub use naming::FileKind;
pub use reconcile::{FileFailure, ReconcileSummary, ReconciliationOutcome, Reconciler};
pub use sync::{SessionHandle, SessionReport, SessionState, SyncOrchestrator};

use std::path::PathBuf;
use std::sync::Arc;

/// Start a sync session against the HTTP catalog described by `options`.
///
/// The credential in `options` is attached to every request; call
/// [`SyncOptions::resolve_credential`] first to pick one up from the
/// environment or the config file.
pub fn start_sync(root: impl Into<PathBuf>, options: &SyncOptions) -> Result<SessionHandle> {
    let client = HttpCatalogClient::new(options)?;
    let orchestrator =
        SyncOrchestrator::new(Arc::new(client)).with_recursive(options.recursive);
    Ok(orchestrator.start(root))
}

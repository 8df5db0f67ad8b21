//! Applies a catalog record to the side-car files of one artifact.
//!
//! Order of work:
//! 1. Metadata document `<base>.json`, rewritten only when its text differs.
//! 2. Declared files (never the artifact itself), skipped when present.
//! 3. Primary preview `<base>.preview<ext>` from the first image.
//! 4. Every image in order as `<base>.preview<ext>`, `<base>.1.preview<ext>`, ...
//!
//! Steps 3 and 4 both target the first image's name; whichever runs second
//! finds the file present and skips it. A failure on one file never stops
//! the others; failures are collected into the outcome.

mod document;

pub use document::write_if_changed;

use crate::artifact::Artifact;
use crate::catalog::{CatalogClient, CatalogRecord};
use crate::error::SyncError;
use crate::events::{EventSink, SyncEvent};
use crate::naming::{classify, extension_of, url_extension, FileKind};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// What a reconciliation actually changed on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub metadata_written: bool,
    /// Declared files downloaded, images included.
    pub files_downloaded: usize,
    /// Preview images written, from declared files or the image list.
    pub previews_written: usize,
    /// Destinations left alone because they already existed.
    pub skipped: usize,
}

/// A single side-car that could not be brought up to date.
#[derive(Debug)]
pub struct FileFailure {
    pub destination: PathBuf,
    pub error: SyncError,
}

/// Per-artifact result consumed by the orchestrator.
#[derive(Debug)]
pub enum ReconciliationOutcome {
    /// Matched and every side-car is in place.
    Synced(ReconcileSummary),
    /// The catalog has no entry for the artifact's fingerprint.
    NoCatalogRecord,
    /// Matched, but some side-cars failed.
    PartiallySynced {
        summary: ReconcileSummary,
        failures: Vec<FileFailure>,
    },
}

impl ReconciliationOutcome {
    pub fn summary(&self) -> Option<&ReconcileSummary> {
        match self {
            ReconciliationOutcome::Synced(summary)
            | ReconciliationOutcome::PartiallySynced { summary, .. } => Some(summary),
            ReconciliationOutcome::NoCatalogRecord => None,
        }
    }

    pub fn failures(&self) -> &[FileFailure] {
        match self {
            ReconciliationOutcome::PartiallySynced { failures, .. } => failures.as_slice(),
            _ => &[],
        }
    }
}

/// Reconciles records against the filesystem, fetching through a catalog client.
pub struct Reconciler<'a> {
    client: &'a dyn CatalogClient,
    events: &'a EventSink,
}

impl<'a> Reconciler<'a> {
    pub fn new(client: &'a dyn CatalogClient, events: &'a EventSink) -> Self {
        Self { client, events }
    }

    /// Bring the side-cars of `artifact` in line with `record`.
    ///
    /// Declared files land in `destination_dir`; the metadata document and
    /// previews are named after the artifact's base path.
    pub async fn reconcile(
        &self,
        record: &CatalogRecord,
        artifact: &Artifact,
        destination_dir: &Path,
    ) -> ReconciliationOutcome {
        let mut state = Progress::default();

        self.sync_metadata(record, artifact, &mut state);
        self.sync_declared_files(record, artifact, destination_dir, &mut state)
            .await;

        if let Some(first) = record.images.first() {
            let destination = artifact.preview_path(0, &url_extension(&first.url));
            self.ensure_preview(&first.url, &destination, &mut state)
                .await;
        }

        for (index, image) in record.images.iter().enumerate() {
            let destination = artifact.preview_path(index, &url_extension(&image.url));
            self.ensure_preview(&image.url, &destination, &mut state)
                .await;
        }

        if state.failures.is_empty() {
            ReconciliationOutcome::Synced(state.summary)
        } else {
            ReconciliationOutcome::PartiallySynced {
                summary: state.summary,
                failures: state.failures,
            }
        }
    }

    fn sync_metadata(&self, record: &CatalogRecord, artifact: &Artifact, state: &mut Progress) {
        let path = artifact.metadata_path();
        let result = record
            .metadata_document()
            .and_then(|document| write_if_changed(&path, &document));

        match result {
            Ok(true) => {
                info!("Saved catalog metadata to {}", path.display());
                self.events
                    .log(format!("Saved catalog metadata to {}", path.display()));
                self.events.emit(SyncEvent::MetadataWritten);
                state.summary.metadata_written = true;
            }
            Ok(false) => {}
            Err(error) => state.fail(self.events, path, error),
        }
    }

    async fn sync_declared_files(
        &self,
        record: &CatalogRecord,
        artifact: &Artifact,
        destination_dir: &Path,
        state: &mut Progress,
    ) {
        let artifact_ext = extension_of(&artifact.path);

        for file in &record.files {
            if extension_of(&file.name) == artifact_ext {
                debug!("Not downloading primary artifact {}", file.name);
                continue;
            }

            let destination = match declared_destination(destination_dir, &file.name) {
                Ok(destination) => destination,
                Err(error) => {
                    state.fail(self.events, destination_dir.join(&file.name), error);
                    continue;
                }
            };

            let kind = classify(&file.name);
            if destination.exists() {
                if kind == FileKind::Derivative {
                    self.events.log(format!(
                        "Derivative already present, not downloading: {}",
                        file.name
                    ));
                } else {
                    debug!("Already present: {}", destination.display());
                }
                state.summary.skipped += 1;
                continue;
            }

            self.events.log(format!(
                "Downloading file: {} -> {}",
                file.name,
                destination.display()
            ));
            match self.client.fetch(&file.download_url, &destination).await {
                Ok(_) => {
                    state.summary.files_downloaded += 1;
                    if kind == FileKind::Image {
                        state.summary.previews_written += 1;
                        self.events.emit(SyncEvent::PreviewWritten);
                    }
                }
                Err(error) => state.fail(self.events, destination, error),
            }
        }
    }

    async fn ensure_preview(&self, url: &str, destination: &Path, state: &mut Progress) {
        if destination.exists() {
            state.summary.skipped += 1;
            return;
        }

        self.events.log(format!(
            "Downloading preview: {}",
            destination
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ));
        match self.client.fetch(url, destination).await {
            Ok(_) => {
                state.summary.previews_written += 1;
                self.events.emit(SyncEvent::PreviewWritten);
            }
            Err(error) => state.fail(self.events, destination.to_path_buf(), error),
        }
    }
}

#[derive(Default)]
struct Progress {
    summary: ReconcileSummary,
    failures: Vec<FileFailure>,
}

impl Progress {
    fn fail(&mut self, events: &EventSink, destination: PathBuf, error: SyncError) {
        warn!("Failed to sync {}: {}", destination.display(), error);
        events.error(format!("Failed to sync {}: {}", destination.display(), error));
        self.failures.push(FileFailure { destination, error });
    }
}

/// Join a catalog-declared file name onto the destination directory.
///
/// Only a bare file name is accepted; anything that could escape the
/// directory is refused.
fn declared_destination(destination_dir: &Path, name: &str) -> Result<PathBuf, SyncError> {
    let invalid = |reason: &str| SyncError::InvalidFileName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.contains('/') || name.contains('\\') {
        return Err(invalid("contains a path separator"));
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(destination_dir.join(name)),
        _ => Err(invalid("not a plain file name")),
    }
}

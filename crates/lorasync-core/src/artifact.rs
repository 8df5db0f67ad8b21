//! Artifact discovery and side-car location.

use crate::error::{Result, SyncError};
use crate::naming::{
    classify, metadata_file_name, preview_file_name, FileKind, DOCUMENT_EXTENSIONS,
    IMAGE_EXTENSIONS,
};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A binary model file found under the sync root.
///
/// The engine only ever reads artifacts; it never moves or deletes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Absolute path of the artifact when found by `discover_artifacts`.
    pub path: PathBuf,
    /// Path without its recognized extension.
    pub base: PathBuf,
    /// Containing directory.
    pub dir: PathBuf,
}

impl Artifact {
    /// Build an artifact from a path, if the path has the artifact extension.
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        if classify(&path) != FileKind::Artifact {
            return None;
        }
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let base = dir.join(path.file_stem()?);
        Some(Self { path, base, dir })
    }

    /// File name without the artifact extension.
    pub fn stem(&self) -> &OsStr {
        self.base.file_name().unwrap_or_default()
    }

    /// `<base>.json`
    pub fn metadata_path(&self) -> PathBuf {
        self.dir.join(metadata_file_name(self.stem()))
    }

    /// `<base>.preview<ext>` for index 0, `<base>.<i>.preview<ext>` otherwise.
    pub fn preview_path(&self, index: usize, ext: &str) -> PathBuf {
        self.dir.join(preview_file_name(self.stem(), index, ext))
    }
}

/// Enumerate every artifact under `root`, sorted by path.
///
/// `root` is canonicalized first, so every artifact path is absolute. The
/// result is a snapshot: files created afterwards are not included.
pub fn discover_artifacts(root: &Path, recursive: bool) -> Result<Vec<Artifact>> {
    if !root.exists() {
        return Err(SyncError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(SyncError::NotADirectory(root.to_path_buf()));
    }
    let root = std::fs::canonicalize(root).map_err(|e| SyncError::io_with_path(e, root))?;
    let root = root.as_path();

    let mut walker = WalkDir::new(root).sort_by_file_name();
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut artifacts = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(artifact) = Artifact::from_path(entry.into_path()) {
            artifacts.push(artifact);
        }
    }

    debug!("Discovered {} artifacts under {}", artifacts.len(), root.display());
    Ok(artifacts)
}

/// Side-cars already present next to an artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Sidecars {
    pub metadata: Option<PathBuf>,
    pub preview: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Find the side-cars of an artifact by exact expected name.
///
/// Preview: `<base>.preview.<img>` first, then `<base>.<img>`.
/// Config: the first of `<base>.json`, `<base>.yaml`, `<base>.yml`.
pub fn locate_sidecars(artifact: &Artifact) -> Sidecars {
    let metadata = Some(artifact.metadata_path()).filter(|p| p.is_file());

    let preview = IMAGE_EXTENSIONS
        .iter()
        .map(|ext| artifact.preview_path(0, &format!(".{}", ext)))
        .chain(
            IMAGE_EXTENSIONS
                .iter()
                .map(|ext| with_suffix(artifact, &format!(".{}", ext))),
        )
        .find(|p| p.is_file());

    let config = DOCUMENT_EXTENSIONS
        .iter()
        .map(|ext| with_suffix(artifact, &format!(".{}", ext)))
        .find(|p| p.is_file());

    Sidecars {
        metadata,
        preview,
        config,
    }
}

fn with_suffix(artifact: &Artifact, suffix: &str) -> PathBuf {
    let mut name = artifact.stem().to_os_string();
    name.push(suffix);
    artifact.dir.join(name)
}

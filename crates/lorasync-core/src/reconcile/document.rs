//! Change-detecting writes for the metadata document.

use crate::error::{Result, SyncError};
use std::fs::Permissions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Write `contents` to `path` unless the file already holds exactly those bytes.
///
/// Returns whether a write happened. Writes go to a temp file in the same
/// directory which is then renamed over the target, so readers never see a
/// half-written document. A rewritten document keeps its permissions; a new
/// one gets the same mode as any other file created under the current umask.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool> {
    let existing_permissions = match std::fs::read(path) {
        Ok(existing) if existing == contents.as_bytes() => {
            debug!("Unchanged: {}", path.display());
            return Ok(false);
        }
        Ok(_) => Some(
            std::fs::metadata(path)
                .map_err(|e| SyncError::io_with_path(e, path))?
                .permissions(),
        ),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(SyncError::io_with_path(e, path)),
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    // tempfile defaults to 0600; ask for the regular creation mode instead.
    let mut builder = tempfile::Builder::new();
    builder.prefix(".lorasync-").suffix(".tmp");
    if existing_permissions.is_none() {
        if let Some(mode) = new_file_permissions() {
            builder.permissions(mode);
        }
    }
    let mut temp = builder
        .tempfile_in(dir)
        .map_err(|e| SyncError::io_with_path(e, dir))?;

    temp.write_all(contents.as_bytes())
        .map_err(|e| SyncError::io_with_path(e, temp.path()))?;
    if let Some(permissions) = existing_permissions {
        temp.as_file()
            .set_permissions(permissions)
            .map_err(|e| SyncError::io_with_path(e, temp.path()))?;
    }
    temp.as_file()
        .sync_all()
        .map_err(|e| SyncError::io_with_path(e, temp.path()))?;
    temp.persist(path)
        .map_err(|e| SyncError::io_with_path(e.error, path))?;

    debug!("Wrote {}", path.display());
    Ok(true)
}

/// `0o666`, narrowed by the process umask at creation time.
#[cfg(unix)]
fn new_file_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o666))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<Permissions> {
    None
}

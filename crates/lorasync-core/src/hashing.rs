//! Streaming SHA256 fingerprints for model artifacts.
//!
//! Artifacts are often several gigabytes, so the file is read in fixed-size
//! chunks and never held in memory as a whole.

use crate::config::HashConfig;
use crate::error::{Result, SyncError};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Content fingerprint: lowercase hex SHA256 of the full byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap an existing hex digest, normalizing it to lowercase.
    pub fn from_hex(hex: impl AsRef<str>) -> Self {
        Self(hex.as_ref().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of a file using the default chunk size.
pub fn fingerprint(path: impl AsRef<Path>) -> Result<Fingerprint> {
    fingerprint_with_chunk_size(path, HashConfig::CHUNK_SIZE)
}

/// Compute the fingerprint of a file reading `chunk_size` bytes at a time.
///
/// The result does not depend on `chunk_size`.
pub fn fingerprint_with_chunk_size(
    path: impl AsRef<Path>,
    chunk_size: usize,
) -> Result<Fingerprint> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| SyncError::io_with_path(e, path))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| SyncError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(Fingerprint(hex::encode(hasher.finalize())))
}

/// Compute the fingerprint on the blocking thread pool.
pub async fn fingerprint_blocking_task(path: PathBuf) -> Result<Fingerprint> {
    tokio::task::spawn_blocking(move || fingerprint(&path))
        .await
        .map_err(|e| SyncError::Other(format!("Hash computation task failed: {}", e)))?
}

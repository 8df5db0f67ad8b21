//! Error types for the sync engine.
//!
//! A catalog "no match" is not an error: lookups return `Ok(None)` for it.
//! Everything here is either a per-file/per-artifact failure that the
//! orchestrator logs and counts, or a session-fatal condition.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the lorasync library.
#[derive(Debug, Error)]
pub enum SyncError {
    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Sync root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Refusing declared file name {name:?}: {reason}")]
    InvalidFileName { name: String, reason: String },

    // Network errors
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Catalog returned HTTP {status}: {body}")]
    Registry { status: u16, body: String },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Sync cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for lorasync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl SyncError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        SyncError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Check if this error should trigger a retry.
    ///
    /// Transport failures, request timeouts, rate limiting and server-side
    /// errors are transient; everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { .. } => true,
            SyncError::Registry { status, .. } => {
                matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }

    /// Errors that end the whole session rather than a single artifact.
    ///
    /// A rejected credential will be rejected for every artifact, so there is
    /// no point in continuing the walk.
    pub fn is_session_fatal(&self) -> bool {
        match self {
            SyncError::RootNotFound(_) | SyncError::NotADirectory(_) => true,
            SyncError::Registry { status, .. } => matches!(status, 401 | 403),
            _ => false,
        }
    }
}

//! Cooperative cancellation for sync sessions.
//!
//! The worker only looks at the token between artifacts, so cancelling never
//! interrupts a hash or a download that is already running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A shareable cancellation flag.
///
/// Every clone observes the same state; calling `cancel()` on any of them
/// stops the session at its next artifact boundary.
///
/// # Example
///
/// ```
/// use lorasync_core::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let for_caller = token.clone();
///
/// for_caller.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Return `SyncError::Cancelled` once cancellation has been requested.
    pub fn check(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            Err(crate::SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}

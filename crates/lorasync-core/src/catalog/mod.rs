//! Remote catalog access.
//!
//! - [`types`] - `CatalogRecord` and its parts
//! - [`client`] - `HttpCatalogClient`, the reqwest implementation
//! - [`retry`] - backoff used for lookups

mod client;
mod retry;
mod types;

pub use client::HttpCatalogClient;
pub use retry::{retry_async, RetryPolicy};
pub use types::{CatalogRecord, RemoteFile, RemoteImage};

use crate::error::Result;
use crate::hashing::Fingerprint;
use async_trait::async_trait;
use std::path::Path;

/// Lookup and transfer operations against the catalog.
///
/// The orchestrator and reconciler only talk to the catalog through this
/// trait, so tests can substitute an in-memory catalog.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Resolve a fingerprint. `Ok(None)` means the catalog has no entry.
    async fn lookup_by_fingerprint(&self, fingerprint: &Fingerprint)
        -> Result<Option<CatalogRecord>>;

    /// Stream `url` into `destination`, returning the byte count.
    ///
    /// Nothing is left at `destination` when the transfer fails.
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64>;
}

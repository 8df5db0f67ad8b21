//! Shared fixtures for lorasync-core integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use lorasync_core::{CatalogClient, CatalogRecord, Fingerprint, SyncError, SyncEvent};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// In-memory catalog: records by fingerprint, blobs by URL.
#[derive(Default)]
pub struct MemoryCatalog {
    records: HashMap<String, Value>,
    blobs: HashMap<String, Vec<u8>>,
    lookup_status: HashMap<String, u16>,
    gate: Option<Arc<Semaphore>>,
    pub lookups: Mutex<Vec<String>>,
    pub fetched: Mutex<Vec<String>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, fingerprint: &Fingerprint, payload: Value) -> Self {
        self.records.insert(fingerprint.to_string(), payload);
        self
    }

    pub fn with_blob(mut self, url: &str, bytes: &[u8]) -> Self {
        self.blobs.insert(url.to_string(), bytes.to_vec());
        self
    }

    /// Make the lookup for `fingerprint` fail with an HTTP status.
    pub fn with_lookup_status(mut self, fingerprint: &Fingerprint, status: u16) -> Self {
        self.lookup_status.insert(fingerprint.to_string(), status);
        self
    }

    /// Each lookup consumes one permit from `gate`.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.lock().unwrap().len()
    }
}

#[async_trait]
impl CatalogClient for MemoryCatalog {
    async fn lookup_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> lorasync_core::Result<Option<CatalogRecord>> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        self.lookups.lock().unwrap().push(fingerprint.to_string());

        if let Some(status) = self.lookup_status.get(fingerprint.as_str()) {
            return Err(SyncError::Registry {
                status: *status,
                body: "stubbed failure".into(),
            });
        }
        Ok(self
            .records
            .get(fingerprint.as_str())
            .cloned()
            .map(CatalogRecord::from_payload))
    }

    async fn fetch(&self, url: &str, destination: &Path) -> lorasync_core::Result<u64> {
        self.fetched.lock().unwrap().push(url.to_string());
        let bytes = self.blobs.get(url).ok_or_else(|| SyncError::Transport {
            url: url.to_string(),
            message: "Download failed with status 404 Not Found".into(),
        })?;
        std::fs::write(destination, bytes).map_err(|e| SyncError::io_with_path(e, destination))?;
        Ok(bytes.len() as u64)
    }
}

/// Write `bytes` to `dir/name` and return the path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Sorted file names in a directory.
pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// File name -> contents for every file in a directory.
pub fn snapshot(dir: &Path) -> HashMap<String, Vec<u8>> {
    file_names(dir)
        .into_iter()
        .map(|name| {
            let bytes = std::fs::read(dir.join(&name)).unwrap();
            (name, bytes)
        })
        .collect()
}

/// Events without the free-form `Log` lines.
pub fn significant(events: &[SyncEvent]) -> Vec<SyncEvent> {
    events
        .iter()
        .filter(|e| !matches!(e, SyncEvent::Log(_)))
        .cloned()
        .collect()
}

pub fn count(events: &[SyncEvent], wanted: &SyncEvent) -> usize {
    events.iter().filter(|e| *e == wanted).count()
}

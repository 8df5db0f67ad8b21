//! Centralized configuration for the sync engine.
//!
//! Constant tables hold the defaults; `SyncOptions` is the per-run
//! configuration a caller builds and hands to `start_sync`.

use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Catalog service and HTTP defaults.
pub struct CatalogConfig;

impl CatalogConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://civitai.com/api/v1";
    pub const BY_HASH_PATH: &'static str = "model-versions/by-hash";
    pub const USER_AGENT: &'static str = "lorasync/0.1";
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
    pub const LOOKUP_ATTEMPTS: u32 = 3;
    pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);
    pub const DOWNLOAD_TEMP_SUFFIX: &'static str = ".part";
    pub const API_KEY_ENV_VAR: &'static str = "CIVITAI_API_KEY";
    pub const API_KEY_FILENAME: &'static str = "api_key";
    pub const CONFIG_DIR_NAME: &'static str = "lorasync";
}

/// Hashing defaults.
pub struct HashConfig;

impl HashConfig {
    /// 1 MiB keeps peak memory flat for multi-gigabyte artifacts.
    pub const CHUNK_SIZE: usize = 1024 * 1024;
}

/// Options for a single sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Catalog API base URL, without trailing slash.
    pub base_url: String,
    /// Bearer credential attached to every request when present.
    pub credential: Option<String>,
    /// Walk subdirectories of the root.
    pub recursive: bool,
    /// Total timeout for catalog lookups.
    pub request_timeout: Duration,
    /// Attempts for a lookup, including the first.
    pub lookup_attempts: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            base_url: CatalogConfig::DEFAULT_BASE_URL.to_string(),
            credential: None,
            recursive: true,
            request_timeout: CatalogConfig::REQUEST_TIMEOUT,
            lookup_attempts: CatalogConfig::LOOKUP_ATTEMPTS,
        }
    }
}

impl SyncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the credential. Blank values are treated as "no credential".
    pub fn with_credential(mut self, credential: Option<String>) -> Self {
        self.credential = credential
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_lookup_attempts(mut self, attempts: u32) -> Self {
        self.lookup_attempts = attempts.max(1);
        self
    }

    /// Fill in the credential from the environment or the config file when
    /// none was given explicitly.
    pub fn resolve_credential(mut self) -> Self {
        if self.credential.is_none() {
            if let Some((credential, source)) = resolve_credential_from_env_or_disk() {
                debug!("Using catalog credential from {}", source);
                self.credential = Some(credential);
            }
        }
        self
    }
}

/// Path to the stored credential file, if a config directory exists.
pub fn credential_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| {
        dir.join(CatalogConfig::CONFIG_DIR_NAME)
            .join(CatalogConfig::API_KEY_FILENAME)
    })
}

/// Resolve a credential.
///
/// Checks in order:
/// 1. `CIVITAI_API_KEY` environment variable
/// 2. `<config_dir>/lorasync/api_key`
///
/// Returns the credential and a label naming its source.
pub fn resolve_credential_from_env_or_disk() -> Option<(String, &'static str)> {
    if let Ok(value) = std::env::var(CatalogConfig::API_KEY_ENV_VAR) {
        let value = value.trim().to_string();
        if !value.is_empty() {
            return Some((value, "env_var"));
        }
    }

    let path = credential_path()?;
    let value = std::fs::read_to_string(path).ok()?;
    let value = value.trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some((value, "config_file"))
    }
}

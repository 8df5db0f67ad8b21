//! reqwest-backed catalog client.
//!
//! Lookups go through a client with a total request timeout and are retried
//! on transient failures. Downloads use a second client with only a connect
//! timeout so large files are not cut off, and stream straight to disk.

use super::retry::{retry_async, RetryPolicy};
use super::types::CatalogRecord;
use super::CatalogClient;
use crate::config::{CatalogConfig, SyncOptions};
use crate::error::{Result, SyncError};
use crate::hashing::Fingerprint;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Client, RequestBuilder, StatusCode};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Longest response body kept in a `SyncError::Registry`.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Catalog client speaking the `model-versions/by-hash` API over HTTP.
pub struct HttpCatalogClient {
    /// HTTP client for lookups (has total timeout)
    client: Client,
    /// HTTP client for downloads (connect timeout only)
    download_client: Client,
    base_url: String,
    credential: Option<String>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for HttpCatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCatalogClient")
            .field("base_url", &self.base_url)
            .field("has_credential", &self.credential.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}

impl HttpCatalogClient {
    /// Create a client from run options.
    pub fn new(options: &SyncOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .connect_timeout(CatalogConfig::CONNECT_TIMEOUT)
            .user_agent(CatalogConfig::USER_AGENT)
            .build()
            .map_err(|e| SyncError::Config {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        let download_client = Client::builder()
            .connect_timeout(CatalogConfig::CONNECT_TIMEOUT)
            .user_agent(CatalogConfig::USER_AGENT)
            .build()
            .map_err(|e| SyncError::Config {
                message: format!("Failed to create download client: {}", e),
            })?;

        Ok(Self {
            client,
            download_client,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            credential: options.credential.clone(),
            retry: RetryPolicy::default()
                .with_max_attempts(options.lookup_attempts)
                .with_base_delay(CatalogConfig::RETRY_BASE_DELAY),
        })
    }

    /// Replace the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// `{base}/model-versions/by-hash/{hex}`
    pub fn lookup_url(&self, fingerprint: &Fingerprint) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            CatalogConfig::BY_HASH_PATH,
            fingerprint
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credential {
            Some(credential) => {
                request.header(header::AUTHORIZATION, format!("Bearer {}", credential))
            }
            None => request,
        }
    }

    async fn lookup_once(&self, url: &str) -> Result<Option<CatalogRecord>> {
        let response = self
            .authorized(self.client.get(url))
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("No catalog entry at {}", url);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Registry {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| transport(url, e))?;
        let payload: serde_json::Value = serde_json::from_slice(&bytes)?;
        Ok(Some(CatalogRecord::from_payload(payload)))
    }

    async fn stream_to_file(&self, url: &str, temp_path: &Path) -> Result<u64> {
        let response = self
            .authorized(self.download_client.get(url))
            .send()
            .await
            .map_err(|e| transport(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Transport {
                url: url.to_string(),
                message: format!("Download failed with status {}", status),
            });
        }

        let mut file = tokio::fs::File::create(temp_path)
            .await
            .map_err(|e| SyncError::io_with_path(e, temp_path))?;

        let mut bytes_written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport(url, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| SyncError::io_with_path(e, temp_path))?;
            bytes_written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| SyncError::io_with_path(e, temp_path))?;

        Ok(bytes_written)
    }
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn lookup_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<CatalogRecord>> {
        let url = self.lookup_url(fingerprint);
        retry_async(&self.retry, || self.lookup_once(&url), SyncError::is_retryable).await
    }

    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64> {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| SyncError::io_with_path(e, parent))?;
            }
        }

        let temp_path = temp_path_for(destination);
        match self.stream_to_file(url, &temp_path).await {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::rename(&temp_path, destination).await {
                    let _ = tokio::fs::remove_file(&temp_path).await;
                    return Err(SyncError::io_with_path(e, destination));
                }
                info!("Downloaded {} bytes to {}", bytes, destination.display());
                Ok(bytes)
            }
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                Err(e)
            }
        }
    }
}

/// `<destination>.part`
fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(CatalogConfig::DOWNLOAD_TEMP_SUFFIX);
    PathBuf::from(name)
}

fn transport(url: &str, err: reqwest::Error) -> SyncError {
    SyncError::Transport {
        url: url.to_string(),
        message: err.to_string(),
    }
}

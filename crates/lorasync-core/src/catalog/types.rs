//! Catalog record types.

use serde::Serialize;
use serde_json::Value;

/// A file the catalog declares for a model version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteFile {
    pub download_url: String,
    pub name: String,
}

/// An example image attached to a model version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteImage {
    pub url: String,
}

/// The catalog's answer for one fingerprint.
///
/// `payload` is the full response body and is persisted verbatim; `files`
/// and `images` are the parts the reconciler acts on, in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogRecord {
    pub files: Vec<RemoteFile>,
    pub images: Vec<RemoteImage>,
    pub payload: Value,
}

impl CatalogRecord {
    /// Extract files and images from a raw catalog payload.
    ///
    /// Entries without a URL (or, for files, without a name) are dropped.
    pub fn from_payload(payload: Value) -> Self {
        let files = payload
            .get("files")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        let download_url = non_empty_str(entry.get("downloadUrl"))?;
                        let name = non_empty_str(entry.get("name"))?;
                        Some(RemoteFile {
                            download_url: download_url.to_string(),
                            name: name.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let images = payload
            .get("images")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| {
                        non_empty_str(entry.get("url")).map(|url| RemoteImage {
                            url: url.to_string(),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            files,
            images,
            payload,
        }
    }

    /// Serialize the payload the way it is stored on disk.
    pub fn metadata_document(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(&self.payload)?)
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

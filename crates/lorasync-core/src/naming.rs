//! Extension classification and side-car naming rules.
//!
//! Every decision about a file is made from its final extension mapped onto
//! a `FileKind`. Name matching is always exact; a file is never considered a
//! side-car just because its name starts with an artifact's base name.

use std::ffi::OsString;
use std::path::Path;

/// Extension of the primary binary artifact.
pub const ARTIFACT_EXTENSION: &str = "safetensors";

/// Pre-quantized derivative format. Immutable upstream once produced.
pub const DERIVATIVE_EXTENSION: &str = "gguf";

/// Image extensions, in preview lookup preference order.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Side-car document extensions, in lookup preference order.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["json", "yaml", "yml"];

/// Category of a file, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// The binary model artifact itself.
    Artifact,
    /// Quantized derivative; never re-fetched once present.
    Derivative,
    /// Preview image.
    Image,
    /// Metadata or config document.
    Document,
    Other,
}

impl FileKind {
    /// Classify a lowercase extension without the leading dot.
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            ARTIFACT_EXTENSION => FileKind::Artifact,
            DERIVATIVE_EXTENSION => FileKind::Derivative,
            e if IMAGE_EXTENSIONS.contains(&e) => FileKind::Image,
            e if DOCUMENT_EXTENSIONS.contains(&e) => FileKind::Document,
            _ => FileKind::Other,
        }
    }
}

/// Lowercase final extension of a file name or path, without the dot.
pub fn extension_of(name: impl AsRef<Path>) -> Option<String> {
    name.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Classify a file name or path.
pub fn classify(name: impl AsRef<Path>) -> FileKind {
    extension_of(name)
        .map(|ext| FileKind::from_extension(&ext))
        .unwrap_or(FileKind::Other)
}

/// Extension suffix of a URL's path, including the leading dot.
///
/// Query strings and fragments are ignored. Returns an empty string when the
/// last path segment has no extension, so the preview name degrades to
/// `<base>.preview`.
pub fn url_extension(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let segment = path.rsplit('/').next().unwrap_or_default();
    match segment.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < segment.len() => segment[idx..].to_string(),
        _ => String::new(),
    }
}

/// File name of the preview at `index` in a record's image list.
///
/// Index 0 is `<stem>.preview<ext>`; index i is `<stem>.<i>.preview<ext>`.
pub fn preview_file_name(stem: &std::ffi::OsStr, index: usize, ext: &str) -> OsString {
    let mut name = stem.to_os_string();
    if index == 0 {
        name.push(format!(".preview{}", ext));
    } else {
        name.push(format!(".{}.preview{}", index, ext));
    }
    name
}

/// File name of the metadata document, `<stem>.json`.
pub fn metadata_file_name(stem: &std::ffi::OsStr) -> OsString {
    let mut name = stem.to_os_string();
    name.push(".json");
    name
}

//! Metadata loading from various sources.
//!
//! Handles loading metadata documents from files, strings, and HTTP URLs.
//! Sources return documents that are already in JSON Schema form; turning
//! CSDL XML into that form happens upstream.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::document::MetadataDocument;
use crate::error::ResolveError;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (30 seconds; metadata documents are large).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// File holding a version's metadata inside its directory.
pub const METADATA_FILE: &str = "metadata.json";

/// Placeholder substituted with the API version in URL templates.
pub const VERSION_PLACEHOLDER: &str = "{version}";

/// Supplies the metadata document for an API version.
pub trait MetadataSource: Send + Sync {
    /// Fetch and parse the document for `version`.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::MetadataUnavailable` if the document cannot be
    /// read, transferred, or parsed.
    fn fetch(&self, version: &str) -> Result<MetadataDocument, ResolveError>;
}

impl<T: MetadataSource + ?Sized> MetadataSource for Box<T> {
    fn fetch(&self, version: &str) -> Result<MetadataDocument, ResolveError> {
        (**self).fetch(version)
    }
}

/// Parse a metadata document from a JSON string.
///
/// # Errors
///
/// Returns `ResolveError::InvalidJson` if the string isn't valid JSON, or
/// the document errors of [`MetadataDocument::from_value`].
pub fn load_document_str(content: &str) -> Result<MetadataDocument, ResolveError> {
    let root: Value =
        serde_json::from_str(content).map_err(|source| ResolveError::InvalidJson { source })?;
    MetadataDocument::from_value(root)
}

/// Reads `<root>/<version>/metadata.json`.
#[derive(Debug, Clone)]
pub struct FileMetadataSource {
    root: PathBuf,
}

impl FileMetadataSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the document for `version`.
    pub fn path_for(&self, version: &str) -> PathBuf {
        self.root.join(version).join(METADATA_FILE)
    }
}

impl MetadataSource for FileMetadataSource {
    fn fetch(&self, version: &str) -> Result<MetadataDocument, ResolveError> {
        let path = self.path_for(version);
        if !path.exists() {
            return Err(ResolveError::unavailable(
                version,
                format!("file not found: {}", path.display()),
            ));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            ResolveError::unavailable(version, format!("cannot read {}: {}", path.display(), e))
        })?;

        let document = load_document_str(&content)
            .map_err(|e| ResolveError::unavailable(version, format!("{}: {}", path.display(), e)))?;
        info!(
            version,
            path = %path.display(),
            variants = document.variants().len(),
            "loaded metadata document"
        );
        Ok(document)
    }
}

/// Serves documents held in memory, keyed by version.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataSource {
    documents: HashMap<String, Value>,
}

impl StaticMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the JSON document for `version`.
    pub fn with_document(mut self, version: impl Into<String>, document: Value) -> Self {
        self.documents.insert(version.into(), document);
        self
    }
}

impl MetadataSource for StaticMetadataSource {
    fn fetch(&self, version: &str) -> Result<MetadataDocument, ResolveError> {
        let root = self
            .documents
            .get(version)
            .ok_or_else(|| ResolveError::unavailable(version, "no document registered"))?;
        MetadataDocument::from_value(root.clone())
            .map_err(|e| ResolveError::unavailable(version, e.to_string()))
    }
}

/// Fetches documents over HTTP from a URL template containing `{version}`.
///
/// Requires the `remote` feature (enabled by default).
#[cfg(feature = "remote")]
#[derive(Debug, Clone)]
pub struct HttpMetadataSource {
    url_template: String,
}

#[cfg(feature = "remote")]
impl HttpMetadataSource {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
        }
    }

    /// URL of the document for `version`.
    pub fn url_for(&self, version: &str) -> String {
        self.url_template.replace(VERSION_PLACEHOLDER, version)
    }
}

#[cfg(feature = "remote")]
impl MetadataSource for HttpMetadataSource {
    fn fetch(&self, version: &str) -> Result<MetadataDocument, ResolveError> {
        let url = self.url_for(version);
        let network_error =
            |e: reqwest::Error| ResolveError::unavailable(version, format!("{}: {}", url, e));

        let client = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(network_error)?;

        // Check for HTTP errors before parsing
        let response = client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(network_error)?;

        let root: Value = response.json().map_err(network_error)?;
        let document = MetadataDocument::from_value(root)
            .map_err(|e| ResolveError::unavailable(version, format!("{}: {}", url, e)))?;
        info!(
            version,
            url = %url,
            variants = document.variants().len(),
            "fetched metadata document"
        );
        Ok(document)
    }
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Pick a source for a CLI-style argument: a URL template or a directory.
///
/// URL sources require the `remote` feature.
///
/// # Errors
///
/// Returns `ResolveError::MetadataUnavailable` if a URL is given without the
/// `remote` feature.
pub fn source_auto(source: &str) -> Result<Box<dyn MetadataSource>, ResolveError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            Ok(Box::new(HttpMetadataSource::new(source)))
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(ResolveError::unavailable(
                "*",
                format!("HTTP fetching requires 'remote' feature: {}", source),
            ))
        }
    } else {
        Ok(Box::new(FileMetadataSource::new(Path::new(source))))
    }
}

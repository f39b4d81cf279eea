//! Schema resolution pipeline.
//!
//! `context URI -> document (cached) -> variant -> expanded type -> flat
//! properties -> normalized properties -> sorted schema`

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::cache::DocumentCache;
use crate::compose::{flatten, flatten_members};
use crate::document::{ContextTarget, MetadataDocument};
use crate::error::ResolveError;
use crate::loader::MetadataSource;
use crate::matcher::match_context;
use crate::normalize::normalize;
use crate::resolver::ReferenceResolver;
use crate::types::{ContextUri, ResolveOptions, ResolvedSchema};

/// Resolves context URIs to flat schemas, fetching each version's document once.
#[derive(Debug)]
pub struct SchemaPipeline<S> {
    source: S,
    cache: Arc<DocumentCache>,
}

impl<S: MetadataSource> SchemaPipeline<S> {
    /// Create a pipeline with its own empty cache.
    pub fn new(source: S) -> Self {
        Self::with_cache(source, Arc::new(DocumentCache::new()))
    }

    /// Create a pipeline sharing an existing cache.
    pub fn with_cache(source: S, cache: Arc<DocumentCache>) -> Self {
        Self { source, cache }
    }

    /// The document cache backing this pipeline.
    pub fn cache(&self) -> &Arc<DocumentCache> {
        &self.cache
    }

    /// Return the document for `version`, fetching it on first use.
    ///
    /// # Errors
    ///
    /// Returns the source's `ResolveError::MetadataUnavailable` unchanged.
    pub fn document(&self, version: &str) -> Result<Arc<MetadataDocument>, ResolveError> {
        self.cache
            .get_or_fetch(version, || self.source.fetch(version))
    }

    /// Resolve the flat schema for `options.context`.
    ///
    /// The version is `options.version` if set, else the one in the URI.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidContextUri` if the URI is malformed or no
    /// version is known, `ResolveError::MetadataUnavailable` if the document
    /// cannot be fetched, and any error of [`resolve_in_document`].
    pub fn resolve(&self, options: &ResolveOptions) -> Result<ResolvedSchema, ResolveError> {
        let uri = ContextUri::parse(&options.context)?;
        let version = options
            .version
            .as_deref()
            .or(uri.version.as_deref())
            .ok_or_else(|| ResolveError::InvalidContextUri {
                uri: options.context.clone(),
                message: "no API version in URI and none supplied".to_string(),
            })?;

        let document = self.document(version)?;
        resolve_in_document(&document, &uri, options)
    }
}

/// Resolve a parsed context against a loaded document.
///
/// # Errors
///
/// Returns `ResolveError::ContextNotFound` if no variant matches, and
/// `ResolveError::UnresolvedReference` if the variant, the subtype, or any
/// type they reach names a missing definition.
pub fn resolve_in_document(
    document: &MetadataDocument,
    uri: &ContextUri,
    options: &ResolveOptions,
) -> Result<ResolvedSchema, ResolveError> {
    let variant = match_context(document, &uri.fragment)?;
    let resolver = ReferenceResolver::new(document).max_depth(options.max_depth);

    let flat = match &variant.target {
        ContextTarget::Collection(item) => flatten(&resolver.expand(item)?),
        ContextTarget::Entity(members) => {
            let expanded = members
                .iter()
                .map(|member| resolver.expand(member))
                .collect::<Result<Vec<Value>, ResolveError>>()?;
            flatten_members(&expanded)
        }
    };
    let mut properties = normalize(flat);

    if let Some(subtype) = &options.subtype {
        let reference = subtype_reference(subtype);
        let derived = normalize(flatten(&resolver.resolve(reference)?));
        debug!(subtype = reference, properties = derived.len(), "merging subtype properties");
        for (name, schema) in derived {
            properties.insert(name, schema);
        }
    }

    Ok(ResolvedSchema::new(properties))
}

/// Accept `@odata.type` values (`#microsoft.graph.user`) as subtype names.
fn subtype_reference(subtype: &str) -> &str {
    if subtype.starts_with("#/") {
        subtype
    } else {
        subtype.trim_start_matches('#')
    }
}

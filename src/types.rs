//! Core types for OData schema resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::ResolveError;

/// Composition keywords, in the order their members are merged.
pub const COMPOSITION_KEYS: &[&str] = &["allOf", "anyOf", "oneOf"];

/// API version used when neither the caller nor the context URI names one.
pub const DEFAULT_API_VERSION: &str = "v1.0";

/// Default number of nested property levels expanded by the resolver.
///
/// Anything below a top-level property is normalized away, so one level is
/// all a flat schema needs.
pub const DEFAULT_MAX_DEPTH: usize = 1;

/// Smallest accepted expansion depth: top-level property references are
/// always inlined.
pub const MIN_MAX_DEPTH: usize = 1;

/// Segment that precedes the fragment in an OData context URI.
pub const METADATA_SEGMENT: &str = "$metadata";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Schema substituted for properties that cannot be represented in a flat table.
pub fn nullable_string() -> Value {
    json!({ "type": ["string", "null"] })
}

/// A parsed `@odata.context` URI.
///
/// Accepts `<base>/<version>/$metadata#<fragment>`. The base and version are
/// optional; only the fragment is required.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextUri {
    /// API version taken from the path segment before `$metadata`, if any.
    pub version: Option<String>,
    /// Everything after the first `#`.
    pub fragment: String,
}

impl ContextUri {
    /// Parse a context URI.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidContextUri` if there is no `#` or the
    /// fragment is empty.
    pub fn parse(uri: &str) -> Result<Self, ResolveError> {
        let (head, fragment) = uri
            .split_once('#')
            .ok_or_else(|| ResolveError::InvalidContextUri {
                uri: uri.to_string(),
                message: "missing '#' fragment".to_string(),
            })?;

        if fragment.is_empty() {
            return Err(ResolveError::InvalidContextUri {
                uri: uri.to_string(),
                message: "empty fragment".to_string(),
            });
        }

        // Drop scheme and authority so the host is never mistaken for a version
        let path = match head.split_once("://") {
            Some((_, rest)) => rest.find('/').map(|idx| &rest[idx..]).unwrap_or(""),
            None => head,
        };

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let version = segments
            .iter()
            .position(|s| *s == METADATA_SEGMENT)
            .and_then(|idx| idx.checked_sub(1))
            .map(|idx| segments[idx])
            .filter(|s| !s.chars().all(|c| c == '.'))
            .map(String::from);

        Ok(Self {
            version,
            fragment: fragment.to_string(),
        })
    }

    /// File stem for dumping this context's schema.
    ///
    /// Key parameters are dropped (`groups('x')/members` -> `groups`) and any
    /// remaining path separators become underscores.
    pub fn file_stem(&self) -> String {
        let stem = self.fragment.split('(').next().unwrap_or_default();
        stem.trim_matches('/').replace('/', "_")
    }
}

/// Options for resolving one context.
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// The `@odata.context` URI to resolve.
    pub context: String,
    /// Explicit API version. Takes precedence over the version in the URI.
    pub version: Option<String>,
    /// Derived type whose properties are merged over the context's base type.
    pub subtype: Option<String>,
    /// Nested property levels to expand before substituting an opaque
    /// placeholder. Values below [`MIN_MAX_DEPTH`] act as [`MIN_MAX_DEPTH`].
    pub max_depth: usize,
}

impl ResolveOptions {
    /// Create options for a context URI, taking the version from the URI.
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            version: None,
            subtype: None,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set an explicit API version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Select a derived type (e.g. `microsoft.graph.user` on a
    /// `directoryObject` collection).
    pub fn subtype(mut self, subtype: impl Into<String>) -> Self {
        self.subtype = Some(subtype.into());
        self
    }

    /// Set the property expansion depth.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Flat schema for one context: `{"type": "object", "properties": {...}}`.
///
/// Properties are kept in a `BTreeMap`, so serialization is always in
/// ascending key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, Value>,
}

impl ResolvedSchema {
    /// Wrap a property mapping, sorting it by name.
    pub fn new(properties: Map<String, Value>) -> Self {
        Self {
            schema_type: "object".to_string(),
            properties: properties.into_iter().collect(),
        }
    }
}

//! Error types for OData metadata resolution.

use thiserror::Error;

/// Errors during schema resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("metadata unavailable for version {version}: {message}")]
    MetadataUnavailable { version: String, message: String },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    // Document errors (exit code 2)
    #[error("invalid metadata document: {message}")]
    InvalidDocument { message: String },

    #[error("invalid context pattern \"{pattern}\": {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("unresolved reference: {reference}")]
    UnresolvedReference { reference: String },

    // Usage errors (exit code 2)
    #[error("invalid context URI \"{uri}\": {message}")]
    InvalidContextUri { uri: String, message: String },

    #[error("@odata.context not found: {context}")]
    ContextNotFound { context: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::MetadataUnavailable { .. } => 3,
            _ => 2,
        }
    }

    pub(crate) fn unavailable(version: &str, message: impl Into<String>) -> Self {
        ResolveError::MetadataUnavailable {
            version: version.to_string(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_error_exit_codes() {
        let err = ResolveError::unavailable("v1.0", "connection refused");
        assert_eq!(err.exit_code(), 3);

        let err = ResolveError::ContextNotFound {
            context: "$metadata#nonexistentEntity".into(),
        };
        assert_eq!(err.exit_code(), 2);

        let err = ResolveError::UnresolvedReference {
            reference: "#/definitions/microsoft.graph.missing".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn context_not_found_display() {
        let err = ResolveError::ContextNotFound {
            context: "$metadata#widgets".into(),
        };
        assert_eq!(err.to_string(), "@odata.context not found: $metadata#widgets");
    }

    #[test]
    fn unavailable_display_names_version() {
        let err = ResolveError::unavailable("beta", "file not found: /tmp/beta/metadata.json");
        assert_eq!(
            err.to_string(),
            "metadata unavailable for version beta: file not found: /tmp/beta/metadata.json"
        );
    }
}

//! OData Schema Resolver
//!
//! Derives flat, table-ready schemas from OData JSON metadata documents.
//!
//! A metadata document lists one variant per `@odata.context` shape and a
//! set of type definitions that compose each other through `allOf`, `anyOf`
//! and `oneOf`. Resolving a context picks the matching variant, expands its
//! `$ref` pointers, flattens the inheritance chain into one property set,
//! rewrites nested shapes as nullable strings, and sorts the result.
//!
//! # Example
//!
//! ```
//! use odata_schema::{ResolveOptions, SchemaPipeline, StaticMetadataSource};
//! use serde_json::json;
//!
//! let document = json!({
//!     "anyOf": [
//!         { "pattern": "^users$", "value": { "items": { "$ref": "userType" } } }
//!     ],
//!     "definitions": {
//!         "userType": {
//!             "properties": {
//!                 "id": { "type": "string" },
//!                 "manager": { "$ref": "userType" }
//!             }
//!         }
//!     }
//! });
//!
//! let source = StaticMetadataSource::new().with_document("v1.0", document);
//! let pipeline = SchemaPipeline::new(source);
//!
//! let options = ResolveOptions::new("https://graph.microsoft.com/v1.0/$metadata#users");
//! let schema = pipeline.resolve(&options).unwrap();
//!
//! assert_eq!(
//!     serde_json::to_string(&schema).unwrap(),
//!     r#"{"type":"object","properties":{"id":{"type":"string"},"manager":{"type":["string","null"]}}}"#
//! );
//! ```
//!
//! # Normalization Rules
//!
//! | Property shape | Output |
//! |----------------|--------|
//! | `type` is `object` or `array` (alone or in a type list) | `{"type": ["string", "null"]}` |
//! | has `allOf` / `anyOf` / `oneOf` | `{"type": ["string", "null"]}` |
//! | has nested `properties` | `{"type": ["string", "null"]}` |
//! | not an object (`true`, `false`) | `{"type": ["string", "null"]}` |
//! | anything else | unchanged |
//!
//! # Merge Order
//!
//! Own `properties` first, then `allOf`, `anyOf`, `oneOf` members in list
//! order, recursively. The property merged last wins.

mod cache;
mod compose;
mod document;
mod edm;
mod error;
mod loader;
mod matcher;
mod normalize;
mod pipeline;
mod records;
mod resolver;
mod types;

pub use cache::DocumentCache;
pub use compose::{flatten, flatten_members};
pub use document::{ContextTarget, ContextVariant, MetadataDocument};
pub use error::ResolveError;
pub use loader::{
    is_url, load_document_str, source_auto, FileMetadataSource, MetadataSource,
    StaticMetadataSource, METADATA_FILE, VERSION_PLACEHOLDER,
};
pub use matcher::match_context;
pub use normalize::{is_structural, normalize};
pub use pipeline::{resolve_in_document, SchemaPipeline};
pub use records::{stringify_structural, RecordPage, RecordSource, NEXT_LINK_KEY};
pub use resolver::{placeholder, ReferenceResolver};
pub use types::{
    nullable_string, ContextUri, ResolveOptions, ResolvedSchema, COMPOSITION_KEYS,
    DEFAULT_API_VERSION, DEFAULT_MAX_DEPTH, MIN_MAX_DEPTH,
};

#[cfg(feature = "remote")]
pub use loader::HttpMetadataSource;

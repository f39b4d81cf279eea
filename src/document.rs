//! Parsed OData metadata documents.
//!
//! The document is the JSON Schema produced from a service's CSDL `$metadata`:
//!
//! ```json
//! {
//!   "anyOf": [
//!     {
//!       "description": "Collection of user",
//!       "properties": {
//!         "@odata.context": { "pattern": "^(.*/)?\\$metadata#users$" },
//!         "value": { "type": "array", "items": { "$ref": "#/definitions/microsoft.graph.user" } }
//!       }
//!     }
//!   ],
//!   "definitions": { "microsoft.graph.user": { "type": "object", "properties": {} } }
//! }
//! ```
//!
//! Each root `anyOf` entry is one context variant. A compact form with
//! `pattern` and `value` placed directly on the variant is accepted too.

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::types::json_type_name;

/// What a context variant resolves to.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextTarget {
    /// Collection context (`#users`): the schema of one array item.
    Collection(Value),
    /// Single-entity context (`#users/$entity`): composition members to flatten.
    Entity(Vec<Value>),
}

/// One candidate shape for an `@odata.context`.
#[derive(Debug, Clone)]
pub struct ContextVariant {
    /// Pattern as written in the document.
    pub pattern: String,
    pub description: Option<String>,
    pub target: ContextTarget,
    /// Compiled pattern, or the compile error reported when the variant is tried.
    regex: Result<Regex, regex::Error>,
}

impl ContextVariant {
    /// Create a variant, compiling its pattern.
    ///
    /// Patterns are anchored at the start of the tested string only; a
    /// trailing `$` in the pattern is needed to anchor the end. A pattern the
    /// regex engine rejects (lookaround, backreferences) does not fail here;
    /// it fails when [`matches`](Self::matches) is called.
    pub fn new(
        pattern: impl Into<String>,
        description: Option<String>,
        target: ContextTarget,
    ) -> Self {
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^(?:{})", pattern));
        Self {
            pattern,
            description,
            target,
            regex,
        }
    }

    /// Test the pattern against a context string.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidPattern` if the pattern did not compile.
    pub fn matches(&self, context: &str) -> Result<bool, ResolveError> {
        match &self.regex {
            Ok(regex) => Ok(regex.is_match(context)),
            Err(source) => Err(ResolveError::InvalidPattern {
                pattern: self.pattern.clone(),
                source: source.clone(),
            }),
        }
    }

    /// Description for logs, falling back to the pattern.
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.pattern)
    }
}

/// Root metadata artifact for one API version. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct MetadataDocument {
    variants: Vec<ContextVariant>,
    definitions: Map<String, Value>,
}

impl MetadataDocument {
    /// Build a document from variants and type definitions.
    pub fn new(variants: Vec<ContextVariant>, definitions: Map<String, Value>) -> Self {
        Self {
            variants,
            definitions,
        }
    }

    /// Parse a document from its JSON form.
    ///
    /// Variant order is preserved; it decides which variant wins when
    /// several patterns match.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::InvalidDocument` if the root is not an object,
    /// has no variant list, or a variant has neither a collection item type
    /// nor an `allOf` list.
    pub fn from_value(root: Value) -> Result<Self, ResolveError> {
        let mut root = match root {
            Value::Object(map) => map,
            other => {
                return Err(invalid(format!(
                    "expected object at document root, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let definitions = match root.remove("definitions").or_else(|| root.remove("$defs")) {
            Some(Value::Object(defs)) => defs,
            None => Map::new(),
            Some(other) => {
                return Err(invalid(format!(
                    "definitions must be an object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let variants = match root.remove("anyOf") {
            Some(Value::Array(variants)) => variants,
            Some(other) => {
                return Err(invalid(format!(
                    "root anyOf must be an array, got {}",
                    json_type_name(&other)
                )))
            }
            None => return Err(invalid("missing root anyOf list of context variants")),
        };

        let variants = variants
            .iter()
            .enumerate()
            .map(|(index, variant)| parse_variant(index, variant))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(variants, definitions))
    }

    /// Context variants in document order.
    pub fn variants(&self) -> &[ContextVariant] {
        &self.variants
    }

    /// Look up a type definition by name.
    pub fn definition(&self, name: &str) -> Option<&Value> {
        self.definitions.get(name)
    }
}

fn parse_variant(index: usize, variant: &Value) -> Result<ContextVariant, ResolveError> {
    let obj = variant.as_object().ok_or_else(|| {
        invalid(format!(
            "variant {}: expected object, got {}",
            index,
            json_type_name(variant)
        ))
    })?;

    let properties = obj.get("properties");

    let pattern = properties
        .and_then(|p| p.get("@odata.context"))
        .and_then(|c| c.get("pattern"))
        .or_else(|| obj.get("pattern"))
        .and_then(Value::as_str)
        .ok_or_else(|| invalid(format!("variant {}: missing @odata.context pattern", index)))?;

    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .map(String::from);

    let items = properties
        .and_then(|p| p.get("value"))
        .or_else(|| obj.get("value"))
        .and_then(|v| v.get("items"));

    let target = match (items, obj.get("allOf")) {
        (Some(items), _) => ContextTarget::Collection(items.clone()),
        (None, Some(Value::Array(members))) => ContextTarget::Entity(members.clone()),
        _ => {
            return Err(invalid(format!(
                "variant {} ({}): neither value.items nor allOf present",
                index, pattern
            )))
        }
    };

    Ok(ContextVariant::new(pattern, description, target))
}

fn invalid(message: impl Into<String>) -> ResolveError {
    ResolveError::InvalidDocument {
        message: message.into(),
    }
}

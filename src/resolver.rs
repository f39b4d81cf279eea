//! Reference resolution - inlines `$ref` pointers into expanded subtrees.

use std::borrow::Cow;
use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::document::MetadataDocument;
use crate::edm;
use crate::error::ResolveError;
use crate::types::{COMPOSITION_KEYS, DEFAULT_MAX_DEPTH, MIN_MAX_DEPTH};

/// Opaque definition substituted where expansion stops.
///
/// It is an object shape, so the normalizer turns it into a nullable string.
pub fn placeholder() -> Value {
    json!({ "type": "object" })
}

/// Where a `$ref` string points.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RefTarget<'r> {
    /// A name in the document's own definitions.
    Local(Cow<'r, str>),
    /// A primitive from the OData meta-schema.
    Primitive(&'r str),
}

impl<'r> RefTarget<'r> {
    /// Key for the active-path set; distinct targets never share a key.
    fn key(&self) -> String {
        match self {
            RefTarget::Local(name) => format!("#/definitions/{}", name),
            RefTarget::Primitive(name) => format!("{}#/definitions/{}", edm::META_SCHEMA_FILE, name),
        }
    }
}

/// Parse a reference string.
///
/// Accepts bare names (`userType`), local pointers (`#/definitions/x`,
/// `#/$defs/x`) and meta-schema pointers (`...odata-meta-schema.json#/definitions/Edm.String`).
fn parse_ref(reference: &str) -> Option<RefTarget<'_>> {
    match reference.split_once('#') {
        None => Some(RefTarget::Local(Cow::Borrowed(reference))),
        Some(("", pointer)) => {
            let path = pointer.trim_start_matches('/');
            let name = path
                .strip_prefix("definitions/")
                .or_else(|| path.strip_prefix("$defs/"))?;
            if name.contains('~') {
                // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
                Some(RefTarget::Local(Cow::Owned(
                    name.replace("~1", "/").replace("~0", "~"),
                )))
            } else {
                Some(RefTarget::Local(Cow::Borrowed(name)))
            }
        }
        Some((document, pointer)) if document.ends_with(edm::META_SCHEMA_FILE) => pointer
            .trim_start_matches('/')
            .strip_prefix("definitions/")
            .map(RefTarget::Primitive),
        Some(_) => None,
    }
}

/// Dereferences `$ref` pointers against one metadata document.
///
/// Expansion is depth-first and preserves the order of composition members.
/// A reference already being expanded on the current path is replaced by
/// [`placeholder`] instead of recursing, as is any reference nested more than
/// `max_depth` property levels deep. Composition members do not count toward
/// the depth, and references held directly by a type's own properties are
/// always inlined.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceResolver<'d> {
    document: &'d MetadataDocument,
    max_depth: usize,
}

impl<'d> ReferenceResolver<'d> {
    pub fn new(document: &'d MetadataDocument) -> Self {
        Self {
            document,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set how many nested property levels are expanded.
    ///
    /// Values below [`MIN_MAX_DEPTH`] are raised to it, so a primitive
    /// reference on a top-level property keeps its scalar type.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(MIN_MAX_DEPTH);
        self
    }

    /// Resolve a named reference to its fully expanded definition.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnresolvedReference` if the reference, or any
    /// reference reached while expanding it, names no known definition.
    pub fn resolve(&self, reference: &str) -> Result<Value, ResolveError> {
        self.resolve_ref(reference, &mut HashSet::new(), 0)
    }

    /// Expand every reference inside a schema fragment.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::UnresolvedReference` for unknown references.
    pub fn expand(&self, schema: &Value) -> Result<Value, ResolveError> {
        self.expand_value(schema, &mut HashSet::new(), 0)
    }

    fn lookup(&self, reference: &str) -> Result<(String, Cow<'d, Value>), ResolveError> {
        let unresolved = || ResolveError::UnresolvedReference {
            reference: reference.to_string(),
        };
        let target = parse_ref(reference).ok_or_else(unresolved)?;
        let definition = match &target {
            RefTarget::Local(name) => self.document.definition(name).map(Cow::Borrowed),
            RefTarget::Primitive(name) => edm::definition(name).map(Cow::Owned),
        }
        .ok_or_else(unresolved)?;
        Ok((target.key(), definition))
    }

    fn resolve_ref(
        &self,
        reference: &str,
        active: &mut HashSet<String>,
        depth: usize,
    ) -> Result<Value, ResolveError> {
        let (key, definition) = self.lookup(reference)?;

        if active.contains(&key) {
            debug!(reference, "reference cycle, expansion truncated");
            return Ok(placeholder());
        }
        if depth > self.max_depth {
            debug!(reference, depth, "expansion depth reached, expansion truncated");
            return Ok(placeholder());
        }

        active.insert(key.clone());
        let expanded = self.expand_value(&definition, active, depth);
        active.remove(&key);
        expanded
    }

    fn expand_value(
        &self,
        value: &Value,
        active: &mut HashSet<String>,
        depth: usize,
    ) -> Result<Value, ResolveError> {
        let Value::Object(map) = value else {
            return Ok(value.clone());
        };

        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            return self.inline_ref(reference, map, active, depth);
        }

        let mut result = Map::new();
        for (key, child) in map {
            let expanded = match key.as_str() {
                "properties" => match child {
                    Value::Object(props) => {
                        let mut expanded = Map::new();
                        for (name, prop) in props {
                            let prop = self.expand_value(prop, active, depth + 1)?;
                            expanded.insert(name.clone(), prop);
                        }
                        Value::Object(expanded)
                    }
                    other => other.clone(),
                },
                "items" | "additionalProperties" => self.expand_value(child, active, depth + 1)?,
                k if COMPOSITION_KEYS.contains(&k) => match child {
                    Value::Array(members) => Value::Array(
                        members
                            .iter()
                            .map(|member| self.expand_value(member, active, depth))
                            .collect::<Result<Vec<_>, ResolveError>>()?,
                    ),
                    other => other.clone(),
                },
                // Annotations, enums, formats and the like carry no references we use
                _ => child.clone(),
            };
            result.insert(key.clone(), expanded);
        }

        Ok(Value::Object(result))
    }

    /// Replace a `$ref` node with its definition.
    ///
    /// Sibling keys on the node win over keys of the same name in the definition.
    fn inline_ref(
        &self,
        reference: &str,
        node: &Map<String, Value>,
        active: &mut HashSet<String>,
        depth: usize,
    ) -> Result<Value, ResolveError> {
        let resolved = self.resolve_ref(reference, active, depth)?;

        let siblings: Map<String, Value> = node
            .iter()
            .filter(|(k, _)| k.as_str() != "$ref")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if siblings.is_empty() {
            return Ok(resolved);
        }

        let mut result = match self.expand_value(&Value::Object(siblings), active, depth)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        if let Value::Object(target) = resolved {
            for (k, v) in target {
                result.entry(k).or_insert(v);
            }
        }
        Ok(Value::Object(result))
    }
}

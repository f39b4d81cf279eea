//! Composition flattening - collapses inherited property sets into one mapping.
//!
//! OData entity inheritance shows up as composition: a derived type's
//! definition is an `allOf` over its base type and its own properties, and
//! the base may itself be composed. Flattening walks the whole tree.
//!
//! # Merge Order
//!
//! 1. The schema's own `properties`
//! 2. Members of `allOf`, then `anyOf`, then `oneOf`, each in list order
//! 3. Within a member, the same order applies recursively
//!
//! On a name collision the property merged later replaces the earlier one.
//! `oneOf` alternatives are merged like any other member, so the flat schema
//! is a superset of every alternative.

use serde_json::{Map, Value};

use crate::types::COMPOSITION_KEYS;

/// Flatten an expanded schema into a single property mapping.
///
/// The input must already have its references expanded. Composition depth
/// is unbounded.
pub fn flatten(schema: &Value) -> Map<String, Value> {
    let mut properties = Map::new();
    flatten_into(schema, &mut properties);
    properties
}

/// Flatten a list of composition members as if they were one `allOf`.
pub fn flatten_members(members: &[Value]) -> Map<String, Value> {
    let mut properties = Map::new();
    for member in members {
        flatten_into(member, &mut properties);
    }
    properties
}

fn flatten_into(schema: &Value, acc: &mut Map<String, Value>) {
    if let Some(Value::Object(props)) = schema.get("properties") {
        for (name, prop) in props {
            acc.insert(name.clone(), prop.clone());
        }
    }

    for key in COMPOSITION_KEYS {
        if let Some(Value::Array(members)) = schema.get(*key) {
            for member in members {
                flatten_into(member, acc);
            }
        }
    }
}

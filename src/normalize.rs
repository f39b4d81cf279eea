//! Type normalization - rewrites structural property shapes as nullable strings.
//!
//! Flat tabular targets have no nested or union types. Structural values are
//! written as JSON text by the record transformation, so their schema is
//! `{"type": ["string", "null"]}`.

use serde_json::{Map, Value};

use crate::types::{nullable_string, COMPOSITION_KEYS};

/// Normalize every property of a flattened mapping.
///
/// Keys and their order are preserved. Running it twice gives the same result.
/// Property schemas that are not objects (`true`, `false`) carry no usable
/// type and become nullable strings as well.
pub fn normalize(properties: Map<String, Value>) -> Map<String, Value> {
    properties
        .into_iter()
        .map(|(name, schema)| {
            if !schema.is_object() || is_structural(&schema) {
                (name, nullable_string())
            } else {
                (name, schema)
            }
        })
        .collect()
}

/// Whether a property schema describes a nested object, array, or composition.
///
/// A `type` list counts as structural if it contains `object` or `array`.
pub fn is_structural(schema: &Value) -> bool {
    let Some(map) = schema.as_object() else {
        return false;
    };

    if COMPOSITION_KEYS.iter().any(|k| map.contains_key(*k)) || map.contains_key("properties") {
        return true;
    }

    match map.get("type") {
        Some(Value::String(t)) => is_structural_type(t),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(is_structural_type),
        _ => false,
    }
}

fn is_structural_type(t: &str) -> bool {
    t == "object" || t == "array"
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn primitives_untouched() {
        let input = props(json!({
            "id": { "type": "string" },
            "age": { "type": ["integer", "null"], "format": "int32" },
            "enabled": { "type": "boolean" },
            "createdDateTime": { "type": ["string", "null"], "format": "date-time" }
        }));
        assert_eq!(normalize(input.clone()), input);
    }

    #[test]
    fn object_and_array_become_string() {
        let result = normalize(props(json!({
            "address": { "type": "object", "properties": { "city": { "type": "string" } } },
            "tags": { "type": "array", "items": { "type": "string" } }
        })));
        assert_eq!(result["address"], nullable_string());
        assert_eq!(result["tags"], nullable_string());
    }

    #[test]
    fn composition_becomes_string() {
        let result = normalize(props(json!({
            "status": { "anyOf": [{ "type": "string", "enum": ["a"] }, { "type": "null" }] },
            "owner": { "allOf": [{ "type": "object" }] },
            "choice": { "oneOf": [{ "type": "string" }, { "type": "integer" }] }
        })));
        for name in ["status", "owner", "choice"] {
            assert_eq!(result[name], nullable_string(), "{} not normalized", name);
        }
    }

    #[test]
    fn type_list_with_structure_becomes_string() {
        let result = normalize(props(json!({
            "manager": { "type": ["object", "null"] },
            "ids": { "type": ["array", "null"] }
        })));
        assert_eq!(result["manager"], nullable_string());
        assert_eq!(result["ids"], nullable_string());
    }

    #[test]
    fn untyped_properties_block_becomes_string() {
        let result = normalize(props(json!({
            "settings": { "properties": { "locale": { "type": "string" } } }
        })));
        assert_eq!(result["settings"], nullable_string());
    }

    #[test]
    fn boolean_schemas_become_string() {
        let result = normalize(props(json!({
            "anything": true,
            "nothing": false,
            "id": { "type": "string" }
        })));
        assert_eq!(result["anything"], nullable_string());
        assert_eq!(result["nothing"], nullable_string());
        assert_eq!(result["id"], json!({ "type": "string" }));
    }

    #[test]
    fn preserves_key_order() {
        let result = normalize(props(json!({
            "z": { "type": "object" },
            "a": { "type": "string" },
            "m": { "type": "array" }
        })));
        let names: Vec<&str> = result.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
    }

    #[test]
    fn idempotent() {
        let input = props(json!({
            "a": { "type": "object" },
            "b": { "type": "string" },
            "c": { "anyOf": [] }
        }));
        let once = normalize(input);
        let twice = normalize(once.clone());
        assert_eq!(once, twice);
    }
}

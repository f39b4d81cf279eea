//! Primitive types of the OData JSON meta-schema.
//!
//! Generated metadata refers to primitive types through the meta-schema
//! (`.../odata-meta-schema.json#/definitions/Edm.Int32`) rather than through
//! its own `definitions`. Only the scalar core of each type is kept; that is
//! all a flat schema can carry.

use serde_json::{json, Value};

/// File name of the OData JSON meta-schema.
pub const META_SCHEMA_FILE: &str = "odata-meta-schema.json";

/// Look up the scalar schema of an `Edm.*` primitive type.
pub fn definition(name: &str) -> Option<Value> {
    let schema = match name {
        "Edm.String" => json!({ "type": "string" }),
        "Edm.Boolean" => json!({ "type": "boolean" }),
        "Edm.Binary" | "Edm.Stream" => {
            json!({ "type": "string", "contentEncoding": "base64url" })
        }
        "Edm.Guid" => json!({ "type": "string", "format": "uuid" }),
        "Edm.Date" => json!({ "type": "string", "format": "date" }),
        "Edm.DateTimeOffset" => json!({ "type": "string", "format": "date-time" }),
        "Edm.TimeOfDay" => json!({ "type": "string", "format": "time" }),
        "Edm.Duration" => json!({ "type": "string", "format": "duration" }),
        "Edm.Byte" => json!({ "type": "integer", "format": "uint8" }),
        "Edm.SByte" => json!({ "type": "integer", "format": "int8" }),
        "Edm.Int16" => json!({ "type": "integer", "format": "int16" }),
        "Edm.Int32" => json!({ "type": "integer", "format": "int32" }),
        "Edm.Int64" => json!({ "type": "integer", "format": "int64" }),
        "Edm.Single" => json!({ "type": "number", "format": "single" }),
        "Edm.Double" => json!({ "type": "number", "format": "double" }),
        "Edm.Decimal" => json!({ "type": "number", "format": "decimal" }),
        // Spatial values are GeoJSON objects
        name if name.starts_with("Edm.Geography") || name.starts_with("Edm.Geometry") => {
            json!({ "type": "object" })
        }
        _ => return None,
    };
    Some(schema)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_types() {
        assert_eq!(definition("Edm.String"), Some(json!({ "type": "string" })));
        assert_eq!(definition("Edm.Int64").unwrap()["type"], "integer");
        assert_eq!(definition("Edm.DateTimeOffset").unwrap()["format"], "date-time");
    }

    #[test]
    fn spatial_types_are_objects() {
        assert_eq!(definition("Edm.GeographyPoint").unwrap()["type"], "object");
        assert_eq!(definition("Edm.GeometryPolygon").unwrap()["type"], "object");
    }

    #[test]
    fn unknown_type() {
        assert_eq!(definition("Edm.Untyped"), None);
        assert_eq!(definition("microsoft.graph.user"), None);
    }
}

//! Schema inference from a JSON payload

use super::types::{InferredSchema, PrimitiveType, SchemaNode, LIST_ELEMENT_NAME};
use crate::types::{JsonObject, JsonValue};

/// Infer the schema of one payload
///
/// Arrays are assumed homogeneous: only the first element decides the
/// element type.
pub fn infer(payload: &JsonObject, message_type: &str) -> InferredSchema {
    InferredSchema::new(message_type, infer_fields(payload))
}

fn infer_fields(object: &JsonObject) -> Vec<SchemaNode> {
    object
        .iter()
        .filter_map(|(key, value)| infer_node(key, value))
        .collect()
}

fn infer_node(name: &str, value: &JsonValue) -> Option<SchemaNode> {
    match value {
        JsonValue::Null => None,
        JsonValue::Object(map) if map.is_empty() => None,
        JsonValue::Array(items) if items.is_empty() => None,
        JsonValue::Object(map) => {
            let children = infer_fields(map);
            // An object holding only omitted fields would be an empty group
            if children.is_empty() {
                return None;
            }
            Some(SchemaNode::Group {
                name: name.to_string(),
                children,
            })
        }
        JsonValue::Array(items) => {
            let element = infer_node(LIST_ELEMENT_NAME, &items[0])?;
            Some(SchemaNode::List {
                name: name.to_string(),
                element: Box::new(element),
            })
        }
        primitive => primitive_type(primitive).map(|kind| SchemaNode::Primitive {
            name: name.to_string(),
            kind,
        }),
    }
}

/// Map a scalar JSON value to its Parquet type
pub(crate) fn primitive_type(value: &JsonValue) -> Option<PrimitiveType> {
    match value {
        JsonValue::String(_) => Some(PrimitiveType::ByteArray),
        JsonValue::Bool(_) => Some(PrimitiveType::Boolean),
        JsonValue::Number(n) if n.is_i64() => Some(PrimitiveType::Int64),
        JsonValue::Number(_) => Some(PrimitiveType::Double),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

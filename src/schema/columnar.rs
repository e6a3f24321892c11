//! Conversion of an `InferredSchema` to an Arrow schema

use super::types::{InferredSchema, PrimitiveType, SchemaNode};
use arrow::datatypes::{DataType, Field, Fields, Schema, TimeUnit};
use std::collections::HashMap;
use std::sync::Arc;

/// Schema metadata key carrying the root message type
pub const MESSAGE_TYPE_METADATA_KEY: &str = "message_type";

/// Build the Arrow schema used by the Parquet writer
///
/// Every field is non-nullable.
pub fn to_arrow_schema(schema: &InferredSchema) -> Schema {
    let fields: Vec<Field> = schema.fields.iter().map(to_field).collect();
    let metadata = HashMap::from([(
        MESSAGE_TYPE_METADATA_KEY.to_string(),
        schema.message_type.clone(),
    )]);
    Schema::new_with_metadata(fields, metadata)
}

fn to_field(node: &SchemaNode) -> Field {
    Field::new(node.name(), to_data_type(node), false)
}

fn to_data_type(node: &SchemaNode) -> DataType {
    match node {
        SchemaNode::Primitive { kind, .. } => primitive_data_type(*kind),
        SchemaNode::Group { children, .. } => {
            DataType::Struct(Fields::from(children.iter().map(to_field).collect::<Vec<_>>()))
        }
        SchemaNode::List { element, .. } => DataType::List(Arc::new(to_field(element))),
    }
}

fn primitive_data_type(kind: PrimitiveType) -> DataType {
    match kind {
        PrimitiveType::ByteArray => DataType::Utf8,
        PrimitiveType::Int32 => DataType::Int32,
        PrimitiveType::Int64 => DataType::Int64,
        PrimitiveType::Int96 => DataType::Timestamp(TimeUnit::Nanosecond, None),
        PrimitiveType::Float => DataType::Float32,
        PrimitiveType::Double => DataType::Float64,
        PrimitiveType::Boolean => DataType::Boolean,
    }
}

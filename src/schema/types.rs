//! Schema tree types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name given to the child of every list node
pub const LIST_ELEMENT_NAME: &str = "element";

/// Parquet physical type of a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimitiveType {
    ByteArray,
    Int32,
    Int64,
    Int96,
    Float,
    Double,
    Boolean,
}

impl PrimitiveType {
    /// Parquet type name
    pub fn parquet_name(self) -> &'static str {
        match self {
            Self::ByteArray => "BYTE_ARRAY",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Int96 => "INT96",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.parquet_name())
    }
}

/// One named node of the schema tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum SchemaNode {
    /// Typed leaf
    Primitive { name: String, kind: PrimitiveType },
    /// Nested object
    Group { name: String, children: Vec<SchemaNode> },
    /// Array wrapping one element node
    List {
        name: String,
        element: Box<SchemaNode>,
    },
}

impl SchemaNode {
    /// Node name
    pub fn name(&self) -> &str {
        match self {
            Self::Primitive { name, .. } | Self::Group { name, .. } | Self::List { name, .. } => {
                name
            }
        }
    }

    /// Direct child by name (groups only)
    pub fn child(&self, name: &str) -> Option<&SchemaNode> {
        match self {
            Self::Group { children, .. } => children.iter().find(|c| c.name() == name),
            _ => None,
        }
    }

    fn collect_leaf_paths(&self, prefix: &str, out: &mut Vec<String>) {
        let path = if prefix.is_empty() {
            self.name().to_string()
        } else {
            format!("{prefix}.{}", self.name())
        };
        match self {
            Self::Primitive { .. } => out.push(path),
            Self::Group { children, .. } => {
                for child in children {
                    child.collect_leaf_paths(&path, out);
                }
            }
            Self::List { element, .. } => element.collect_leaf_paths(&path, out),
        }
    }
}

/// Schema inferred from one payload; the root is tagged with the message type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferredSchema {
    pub message_type: String,
    pub fields: Vec<SchemaNode>,
}

impl InferredSchema {
    /// Create a schema from top-level fields
    pub fn new(message_type: impl Into<String>, fields: Vec<SchemaNode>) -> Self {
        Self {
            message_type: message_type.into(),
            fields,
        }
    }

    /// Top-level field by name
    pub fn field(&self, name: &str) -> Option<&SchemaNode> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Node at a dotted path (`"c.d"`); list elements are addressed as `element`
    pub fn lookup(&self, path: &str) -> Option<&SchemaNode> {
        let mut parts = path.split('.');
        let mut node = self.field(parts.next()?)?;
        for part in parts {
            node = match node {
                SchemaNode::List { element, .. } if part == LIST_ELEMENT_NAME => element,
                other => other.child(part)?,
            };
        }
        Some(node)
    }

    /// Dotted paths of all leaves
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for field in &self.fields {
            field.collect_leaf_paths("", &mut out);
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

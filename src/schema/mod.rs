//! Schema inference module
//!
//! Builds an `InferredSchema` tree from a single JSON payload and converts
//! it to an Arrow schema at the file-writing boundary.
//!
//! # Rules
//!
//! - `null`, `{}` and `[]` fields are omitted
//! - objects become groups, arrays become lists typed by their first element
//! - every field is required

mod columnar;
mod inference;
mod types;

pub use columnar::{to_arrow_schema, MESSAGE_TYPE_METADATA_KEY};
pub use inference::infer;
pub use types::{InferredSchema, PrimitiveType, SchemaNode, LIST_ELEMENT_NAME};

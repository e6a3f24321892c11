//! JSON payload to Arrow RecordBatch

use crate::error::{Error, Result};
use arrow::datatypes::SchemaRef;
use arrow::json::ReaderBuilder;
use arrow::record_batch::RecordBatch;
use std::io::Cursor;

/// Decode a single JSON record into a one-row batch
///
/// Fields the schema omitted (nulls, empty containers) are ignored. A value
/// that does not fit its inferred column, or a missing required value, is
/// a write error.
pub fn payload_to_batch(schema: SchemaRef, payload: &[u8]) -> Result<RecordBatch> {
    let mut reader = ReaderBuilder::new(schema)
        .with_batch_size(1)
        .with_strict_mode(false)
        .build(Cursor::new(payload))
        .map_err(|e| Error::write(format!("Failed to build JSON decoder: {e}")))?;

    match reader.next() {
        Some(Ok(batch)) => Ok(batch),
        Some(Err(e)) => Err(Error::write(format!("Payload does not match schema: {e}"))),
        None => Err(Error::write("Payload contained no record")),
    }
}

//! Tests for output module

use super::*;
use crate::error::Error;
use crate::schema::{infer, to_arrow_schema};
use crate::types::{CompressionCodec, JsonObject};
use arrow::array::{Array, BooleanArray, Int64Array, ListArray, StringArray, StructArray};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn object(value: serde_json::Value) -> JsonObject {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn read_back(path: &std::path::Path) -> (arrow::record_batch::RecordBatch, Compression) {
    let file = std::fs::File::open(path).unwrap();
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).unwrap();
    let compression = builder.metadata().row_group(0).column(0).compression();
    let mut reader = builder.build().unwrap();
    (reader.next().unwrap().unwrap(), compression)
}

// ============================================================================
// Batch Tests
// ============================================================================

#[test]
fn test_payload_to_batch_ignores_omitted_fields() {
    let payload = json!({"a": 1, "b": "x", "c": {"d": true}, "e": null, "f": {}, "g": []});
    let schema = infer(&object(payload.clone()), "t");
    let bytes = serde_json::to_vec(&payload).unwrap();

    let batch = payload_to_batch(Arc::new(to_arrow_schema(&schema)), &bytes).unwrap();

    assert_eq!(batch.num_rows(), 1);
    assert_eq!(batch.num_columns(), 3);
    let a = batch
        .column_by_name("a")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(a.value(0), 1);

    let c = batch
        .column_by_name("c")
        .unwrap()
        .as_any()
        .downcast_ref::<StructArray>()
        .unwrap();
    let d = c
        .column_by_name("d")
        .unwrap()
        .as_any()
        .downcast_ref::<BooleanArray>()
        .unwrap();
    assert!(d.value(0));
}

#[test]
fn test_payload_to_batch_rejects_mismatched_list_element() {
    // Only the first element decides the element type
    let payload = json!({"items": [{"sku": "A"}, {"qty": 2}]});
    let schema = infer(&object(payload.clone()), "t");
    let bytes = serde_json::to_vec(&payload).unwrap();

    let err = payload_to_batch(Arc::new(to_arrow_schema(&schema)), &bytes).unwrap_err();
    assert!(err.is_write_failure());
}

// ============================================================================
// Writer Tests
// ============================================================================

#[test]
fn test_write_roundtrips_nested_payload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested/out.parquet");
    let payload = json!({
        "id": 7,
        "user": {"name": "ada"},
        "tags": ["x", "y"]
    });
    let schema = infer(&object(payload.clone()), "signup");

    let written = FileWriter::new()
        .write(
            &schema,
            &path,
            &serde_json::to_vec(&payload).unwrap(),
            CompressionCodec::Snappy,
        )
        .unwrap();

    assert_eq!(written.rows, 1);
    assert!(written.bytes > 0);

    let (batch, compression) = read_back(&path);
    assert_eq!(compression, Compression::SNAPPY);
    assert_eq!(batch.num_rows(), 1);

    let tags = batch
        .column_by_name("tags")
        .unwrap()
        .as_any()
        .downcast_ref::<ListArray>()
        .unwrap();
    let values = tags.value(0);
    let values = values.as_any().downcast_ref::<StringArray>().unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values.value(1), "y");
}

#[test]
fn test_write_applies_codecs() {
    let dir = tempdir().unwrap();
    let payload = json!({"v": 1});
    let schema = infer(&object(payload.clone()), "t");
    let bytes = serde_json::to_vec(&payload).unwrap();

    for (codec, expected) in [
        (CompressionCodec::None, Compression::UNCOMPRESSED),
        (CompressionCodec::Gzip, parquet_compression(CompressionCodec::Gzip)),
        (CompressionCodec::Lzo, Compression::UNCOMPRESSED),
    ] {
        let path = dir.path().join(format!("{codec:?}.parquet"));
        FileWriter::new().write(&schema, &path, &bytes, codec).unwrap();
        let (_, compression) = read_back(&path);
        assert_eq!(compression, expected, "codec {codec:?}");
    }
}

#[test]
fn test_failed_write_leaves_no_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.parquet");
    let schema = infer(&object(json!({"v": 1})), "t");

    let err = FileWriter::new()
        .write(&schema, &path, br#"{"v": "not a number"}"#, CompressionCodec::None)
        .unwrap_err();

    assert!(matches!(err, Error::Write { .. }));
    assert!(!path.exists());
}

#[test]
fn test_empty_schema_is_a_write_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.parquet");
    let schema = infer(&object(json!({"only": null})), "t");

    let err = FileWriter::new()
        .write(&schema, &path, br#"{"only": null}"#, CompressionCodec::None)
        .unwrap_err();
    assert!(err.to_string().contains("no writable fields"));
    assert!(!path.exists());
}

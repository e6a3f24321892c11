//! Parquet file writer

use super::batch::payload_to_batch;
use crate::error::{Error, Result};
use crate::schema::{to_arrow_schema, InferredSchema};
use crate::types::CompressionCodec;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel};
use parquet::file::properties::WriterProperties;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Parquet codec for a configured compression codec
///
/// LZO has no writer support in the Parquet library; it falls back to
/// uncompressed.
pub fn parquet_compression(codec: CompressionCodec) -> Compression {
    match codec {
        CompressionCodec::None => Compression::UNCOMPRESSED,
        CompressionCodec::Snappy => Compression::SNAPPY,
        CompressionCodec::Gzip => Compression::GZIP(GzipLevel::default()),
        CompressionCodec::Lzo => {
            warn!("LZO compression is not supported by the Parquet writer, writing uncompressed");
            Compression::UNCOMPRESSED
        }
    }
}

/// A finished local Parquet file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub rows: usize,
    pub bytes: u64,
}

/// Writes one payload per file
#[derive(Debug, Clone)]
pub struct FileWriter {
    dictionary_enabled: bool,
}

impl Default for FileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWriter {
    /// Create a writer with default properties
    pub fn new() -> Self {
        Self {
            dictionary_enabled: true,
        }
    }

    /// Enable or disable dictionary encoding
    #[must_use]
    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    fn build_properties(&self, codec: CompressionCodec) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(parquet_compression(codec))
            .set_dictionary_enabled(self.dictionary_enabled)
            .set_created_by(format!("rtdl-ingest {}", env!("CARGO_PKG_VERSION")))
            .build()
    }

    /// Write `payload` to `path` using `schema` and `codec`
    ///
    /// On failure any partially written file is removed.
    pub fn write(
        &self,
        schema: &InferredSchema,
        path: &Path,
        payload: &[u8],
        codec: CompressionCodec,
    ) -> Result<WrittenFile> {
        if schema.is_empty() {
            return Err(Error::write(format!(
                "Payload for '{}' has no writable fields",
                schema.message_type
            )));
        }

        let result = self.write_file(schema, path, payload, codec);
        if result.is_err() && path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!("Failed to remove partial file {}: {e}", path.display());
            }
        }
        result
    }

    fn write_file(
        &self,
        schema: &InferredSchema,
        path: &Path,
        payload: &[u8],
        codec: CompressionCodec,
    ) -> Result<WrittenFile> {
        let arrow_schema = Arc::new(to_arrow_schema(schema));
        let batch = payload_to_batch(Arc::clone(&arrow_schema), payload)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::write(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let file = File::create(path)
            .map_err(|e| Error::write(format!("Failed to create {}: {e}", path.display())))?;

        let props = self.build_properties(codec);
        let mut writer = ArrowWriter::try_new(file, arrow_schema, Some(props))
            .map_err(|e| Error::write(format!("Failed to create Parquet writer: {e}")))?;
        writer
            .write(&batch)
            .map_err(|e| Error::write(format!("Failed to write record: {e}")))?;
        writer
            .close()
            .map_err(|e| Error::write(format!("Failed to close Parquet writer: {e}")))?;

        let bytes = std::fs::metadata(path).map(|m| m.len()).unwrap_or_default();
        debug!(
            path = %path.display(),
            message_type = %schema.message_type,
            bytes,
            "Wrote Parquet file"
        );

        Ok(WrittenFile {
            path: path.to_path_buf(),
            rows: batch.num_rows(),
            bytes,
        })
    }
}

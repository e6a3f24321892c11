//! Local staging of files bound for remote backends

use super::WriteRequest;
use crate::error::{Error, Result};
use crate::output::{FileWriter, WrittenFile};
use crate::schema::InferredSchema;
use crate::types::CompressionCodec;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A staged local file, removed when dropped
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    bytes: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size on disk
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// Read the whole file
    pub async fn read(&self) -> Result<Vec<u8>> {
        tokio::fs::read(&self.path).await.map_err(|e| {
            Error::write(format!("Failed to read staged file {}: {e}", self.path.display()))
        })
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed staged file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove staged file {}: {e}", self.path.display()),
        }
    }
}

/// Writes Parquet files into a staging directory
#[derive(Debug, Clone)]
pub struct Stager {
    dir: PathBuf,
    writer: FileWriter,
}

impl Stager {
    /// Stage files under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writer: FileWriter::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the request's payload into a uniquely named staged file
    pub async fn stage(&self, request: &WriteRequest<'_>) -> Result<StagedFile> {
        let path = self.dir.join(&request.path.leaf);
        let written = write_parquet(
            self.writer.clone(),
            request.schema.clone(),
            path,
            request.payload.to_vec(),
            request.codec,
        )
        .await?;
        Ok(StagedFile {
            path: written.path,
            bytes: written.bytes,
        })
    }
}

/// Run the blocking Parquet writer off the async runtime
pub(crate) async fn write_parquet(
    writer: FileWriter,
    schema: InferredSchema,
    path: PathBuf,
    payload: Vec<u8>,
    codec: CompressionCodec,
) -> Result<WrittenFile> {
    tokio::task::spawn_blocking(move || writer.write(&schema, &path, &payload, codec))
        .await
        .map_err(|e| Error::write(format!("Parquet writer task failed: {e}")))?
}

//! Local filesystem backend

use super::staging::write_parquet;
use super::{Location, StorageBackend, WriteRequest};
use crate::config::StreamConfig;
use crate::error::Result;
use crate::output::FileWriter;
use crate::types::{FileStoreKind, JsonValue};
use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};

/// Writes directly under `{root}/{folder}/{subfolder}/{leaf}`
#[derive(Debug, Clone)]
pub struct LocalBackend {
    root: PathBuf,
    writer: FileWriter,
}

impl LocalBackend {
    /// Create a backend rooted at `root` (made absolute when possible)
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
            writer: FileWriter::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn kind(&self) -> FileStoreKind {
        FileStoreKind::Local
    }

    async fn write(&self, request: &WriteRequest<'_>) -> Result<Location> {
        let key = request.path.key();
        let path = self.root.join(&key);
        let written = write_parquet(
            self.writer.clone(),
            request.schema.clone(),
            path,
            request.payload.to_vec(),
            request.codec,
        )
        .await?;

        Ok(Location {
            kind: FileStoreKind::Local,
            uri: written.path.display().to_string(),
            container: None,
            key,
        })
    }

    fn catalog_source(&self, config: &StreamConfig) -> Result<JsonValue> {
        let path = match config.folder() {
            "" => self.root.clone(),
            folder => self.root.join(folder),
        };
        Ok(json!({
            "type": "NAS",
            "config": {
                "path": path.display().to_string()
            }
        }))
    }
}

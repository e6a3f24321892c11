//! Storage backends
//!
//! One `StorageBackend` per file store kind, selected per stream through a
//! `BackendRegistry`. Each backend writes the Parquet file to its
//! destination and knows how its location is described to the catalog.
//!
//! # Backends
//!
//! | kind  | transport                           | staging        |
//! |-------|-------------------------------------|----------------|
//! | Local | filesystem under the datastore root | none           |
//! | S3    | `object_store` (AWS)                | local temp file |
//! | GCS   | `object_store` (GCP)                | local temp file |
//! | Azure | Blob REST + `object_store` (Azure)  | local temp file |
//! | HDFS  | WebHDFS REST                        | local temp file |

mod azure;
mod gcs;
mod hdfs;
mod local;
mod registry;
mod s3;
mod staging;

pub use azure::{shared_key_signature, AzureBackend};
pub use gcs::{parse_service_account, GcsBackend};
pub use hdfs::HdfsBackend;
pub use local::LocalBackend;
pub use registry::BackendRegistry;
pub use s3::S3Backend;
pub use staging::{StagedFile, Stager};

use crate::config::StreamConfig;
use crate::error::Result;
use crate::partition::PlannedPath;
use crate::schema::InferredSchema;
use crate::types::{CompressionCodec, FileStoreKind, JsonValue};
use async_trait::async_trait;
use serde::Serialize;

/// Everything a backend needs to persist one payload
#[derive(Debug, Clone, Copy)]
pub struct WriteRequest<'a> {
    pub config: &'a StreamConfig,
    pub message_type: &'a str,
    pub schema: &'a InferredSchema,
    /// Payload serialized as JSON
    pub payload: &'a [u8],
    pub codec: CompressionCodec,
    pub path: &'a PlannedPath,
}

/// Where a file ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub kind: FileStoreKind,
    /// Fully qualified location (`s3://bucket/key`, `/abs/path`, ...)
    pub uri: String,
    /// Bucket or container, when the backend has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    /// Object key or path below the container/root
    pub key: String,
}

/// How a written message type becomes a catalog dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetRegistration {
    /// Promote the folder through the catalog API
    PhysicalDataset,
    /// Mark the folder's format through the legacy folder-format call
    FolderFormat,
}

/// A storage destination
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Backend kind
    fn kind(&self) -> FileStoreKind;

    /// Write the payload and return its final location
    async fn write(&self, request: &WriteRequest<'_>) -> Result<Location>;

    /// Catalog source definition (`type` and `config`) for a stream
    fn catalog_source(&self, config: &StreamConfig) -> Result<JsonValue>;

    /// How datasets are registered for this backend
    fn dataset_registration(&self) -> DatasetRegistration {
        DatasetRegistration::PhysicalDataset
    }
}

/// `/{container}/{folder}` (or `/{container}` without a folder)
pub(crate) fn root_path(container: &str, folder: &str) -> String {
    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        format!("/{container}")
    } else {
        format!("/{container}/{folder}")
    }
}

/// `object_store` client options shared by the cloud backends
pub(crate) fn client_options(timeout: std::time::Duration) -> object_store::ClientOptions {
    object_store::ClientOptions::new().with_timeout(timeout)
}

//! Common types used throughout the ingest service
//!
//! Shared type aliases plus the three enumerations that the lookup tables
//! (`file_store_type`, `partition_time`, `compression_type`) resolve to.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Type Aliases
// ============================================================================

/// JSON value type (re-exported from serde_json)
pub type JsonValue = serde_json::Value;

/// JSON object type
pub type JsonObject = serde_json::Map<String, JsonValue>;

/// Reserved `message_type` that asks the pipeline to reload its config cache
pub const REFRESH_SENTINEL: &str = "rtdl_205";

/// Message type used when neither payload, envelope nor config name one
pub const DEFAULT_MESSAGE_TYPE: &str = "rtdl_default";

/// Normalise a lookup name for matching ("Google Cloud Storage" -> "googlecloudstorage")
fn normalise(name: &str) -> String {
    name.chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_ascii_lowercase()
}

// ============================================================================
// File Store Kind
// ============================================================================

/// Storage backend selected per stream by `file_store_type_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStoreKind {
    /// Amazon S3
    S3,
    /// Google Cloud Storage
    Gcs,
    /// Azure Blob Storage
    Azure,
    /// Hadoop HDFS (through WebHDFS)
    Hdfs,
    /// Local filesystem under the datastore root
    Local,
}

impl FileStoreKind {
    /// All kinds, in default id order
    pub const ALL: [FileStoreKind; 5] = [
        FileStoreKind::S3,
        FileStoreKind::Gcs,
        FileStoreKind::Azure,
        FileStoreKind::Hdfs,
        FileStoreKind::Local,
    ];

    /// Resolve from a lookup-table name
    pub fn from_name(name: &str) -> Option<Self> {
        match normalise(name).as_str() {
            "aws" | "s3" | "awss3" | "amazons3" => Some(Self::S3),
            "gcp" | "gcs" | "googlecloudstorage" | "google" => Some(Self::Gcs),
            "azure" | "azureblob" | "azureblobstorage" | "blob" => Some(Self::Azure),
            "hdfs" | "hadoop" => Some(Self::Hdfs),
            "local" | "localfilesystem" | "filesystem" | "file" => Some(Self::Local),
            _ => None,
        }
    }

    /// Resolve from the default id numbering (1=AWS .. 5=Local)
    pub fn from_default_id(id: i64) -> Option<Self> {
        usize::try_from(id - 1)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Short name used in logs and catalog payloads
    pub fn as_str(self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Gcs => "gcs",
            Self::Azure => "azure",
            Self::Hdfs => "hdfs",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for FileStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Partition Granularity
// ============================================================================

/// Time bucket used to group written files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionGranularity {
    #[default]
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

impl PartitionGranularity {
    /// All granularities, in default id order
    pub const ALL: [PartitionGranularity; 5] = [
        PartitionGranularity::Hourly,
        PartitionGranularity::Daily,
        PartitionGranularity::Weekly,
        PartitionGranularity::Monthly,
        PartitionGranularity::Quarterly,
    ];

    /// Resolve from a lookup-table name
    pub fn from_name(name: &str) -> Option<Self> {
        match normalise(name).as_str() {
            "hourly" | "hour" => Some(Self::Hourly),
            "daily" | "day" => Some(Self::Daily),
            "weekly" | "week" => Some(Self::Weekly),
            "monthly" | "month" => Some(Self::Monthly),
            "quarterly" | "quarter" => Some(Self::Quarterly),
            _ => None,
        }
    }

    /// Resolve from the default id numbering (1=Hourly .. 5=Quarterly)
    pub fn from_default_id(id: i64) -> Option<Self> {
        usize::try_from(id - 1)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }
}

// ============================================================================
// Compression Codec
// ============================================================================

/// Parquet compression codec configured per stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionCodec {
    #[default]
    None,
    Snappy,
    Gzip,
    Lzo,
}

impl CompressionCodec {
    /// All codecs, in default id order
    pub const ALL: [CompressionCodec; 4] = [
        CompressionCodec::None,
        CompressionCodec::Snappy,
        CompressionCodec::Gzip,
        CompressionCodec::Lzo,
    ];

    /// Resolve from a lookup-table name
    pub fn from_name(name: &str) -> Option<Self> {
        match normalise(name).as_str() {
            "none" | "uncompressed" => Some(Self::None),
            "snappy" => Some(Self::Snappy),
            "gzip" | "gz" => Some(Self::Gzip),
            "lzo" => Some(Self::Lzo),
            _ => None,
        }
    }

    /// Resolve from the default id numbering (1=None .. 4=LZO)
    pub fn from_default_id(id: i64) -> Option<Self> {
        usize::try_from(id - 1)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }
}

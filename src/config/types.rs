//! Stream configuration and lookup table types

use crate::error::{Error, Result};
use crate::types::{
    CompressionCodec, FileStoreKind, JsonValue, PartitionGranularity, DEFAULT_MESSAGE_TYPE,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Stream Config
// ============================================================================

/// Per-stream configuration record
///
/// Only the credential fields for the selected backend are meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Unique stream identifier
    pub stream_id: String,
    /// Alternate identifier (e.g. an analytics write key)
    pub stream_alt_id: Option<String>,
    /// Inactive streams drop their messages
    pub active: bool,
    /// Default message type for the stream
    pub message_type: Option<String>,

    /// Backend selector (lookup: file_store_type)
    pub file_store_type_id: i64,
    pub region: Option<String>,
    pub bucket_name: Option<String>,
    pub folder_name: Option<String>,
    /// Partition granularity (lookup: partition_time)
    pub partition_time_id: i64,
    /// Parquet codec (lookup: compression_type)
    pub compression_type_id: i64,

    // AWS
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,

    // GCP: either an object or a JSON-encoded string
    pub gcp_json_credentials: Option<JsonValue>,

    // Azure
    pub azure_storage_account_name: Option<String>,
    pub azure_storage_access_key: Option<String>,
    pub azure_sas_token: Option<String>,

    // HDFS
    pub namenode_host: Option<String>,
    pub namenode_port: Option<u16>,

    // Glue
    pub glue_enabled: bool,
    pub glue_role: Option<String>,
    pub glue_crawler_schedule: Option<String>,

    // Snowflake
    pub snowflake_enabled: bool,
    pub snowflake_account: Option<String>,
    pub snowflake_username: Option<String>,
    pub snowflake_password: Option<String>,
    pub snowflake_database: Option<String>,
    pub snowflake_warehouse: Option<String>,
}

impl StreamConfig {
    /// Create a minimal config for a stream
    pub fn new(stream_id: impl Into<String>) -> Self {
        Self {
            stream_id: stream_id.into(),
            active: true,
            ..Self::default()
        }
    }

    /// Parse a config row, ignoring `null` fields
    pub fn from_value(value: JsonValue) -> Result<Self> {
        let cleaned = strip_nulls(value);
        let config: StreamConfig = serde_json::from_value(cleaned)?;
        if config.stream_id.is_empty() {
            return Err(Error::config_load("stream config without stream_id"));
        }
        Ok(config)
    }

    /// Folder prefix inside the bucket/container/datastore (no slashes at the ends)
    pub fn folder(&self) -> &str {
        self.folder_name
            .as_deref()
            .unwrap_or("")
            .trim_matches('/')
    }

    /// Required field accessor producing a write error naming the field
    pub fn require<'a>(&self, value: &'a Option<String>, field: &str) -> Result<&'a str> {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::write(format!(
                    "stream '{}' is missing required field '{field}'",
                    self.stream_id
                ))
            })
    }

    /// The stream's default message type, if one is set
    pub fn default_message_type(&self) -> Option<&str> {
        self.message_type.as_deref().filter(|t| !t.is_empty())
    }
}

/// Remove `null` members of an object so serde defaults apply
fn strip_nulls(value: JsonValue) -> JsonValue {
    match value {
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect(),
        ),
        other => other,
    }
}

// ============================================================================
// Lookup Tables
// ============================================================================

/// One row of a lookup table (`file_store_type`, `partition_time`, `compression_type`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupEntry {
    #[serde(
        alias = "file_store_type_id",
        alias = "partition_time_id",
        alias = "compression_type_id"
    )]
    pub id: i64,
    #[serde(
        alias = "file_store_type_name",
        alias = "partition_time_name",
        alias = "compression_type_name"
    )]
    pub name: String,
}

impl LookupEntry {
    /// Create a lookup entry
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Small immutable id -> name table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
}

impl LookupTable {
    /// Build a table from entries
    pub fn new(entries: Vec<LookupEntry>) -> Self {
        Self { entries }
    }

    /// Name for an id
    pub fn name_of(&self, id: i64) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.name.as_str())
    }

    /// All entries
    pub fn entries(&self) -> &[LookupEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lookup table of storage backends
pub type FileStoreTypes = LookupTable;
/// Lookup table of partition granularities
pub type PartitionTimes = LookupTable;
/// Lookup table of compression codecs
pub type CompressionTypes = LookupTable;

// ============================================================================
// Snapshot
// ============================================================================

/// One immutable view of all stream configs and lookup tables
#[derive(Debug, Clone)]
pub struct ConfigSnapshot {
    pub streams: Vec<StreamConfig>,
    pub file_store_types: FileStoreTypes,
    pub partition_times: PartitionTimes,
    pub compression_types: CompressionTypes,
    /// Monotonic counter assigned by the cache on swap (0 = never loaded)
    pub generation: u64,
    pub loaded_at: DateTime<Utc>,
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self {
            streams: Vec::new(),
            file_store_types: LookupTable::default(),
            partition_times: LookupTable::default(),
            compression_types: LookupTable::default(),
            generation: 0,
            loaded_at: Utc::now(),
        }
    }
}

impl ConfigSnapshot {
    /// Build a snapshot from loaded parts
    pub fn new(
        streams: Vec<StreamConfig>,
        file_store_types: FileStoreTypes,
        partition_times: PartitionTimes,
        compression_types: CompressionTypes,
    ) -> Self {
        Self {
            streams,
            file_store_types,
            partition_times,
            compression_types,
            generation: 0,
            loaded_at: Utc::now(),
        }
    }

    /// Reject snapshots that break the `stream_id` uniqueness invariant
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for stream in &self.streams {
            if !seen.insert(stream.stream_id.as_str()) {
                return Err(Error::config_load(format!(
                    "duplicate stream_id '{}'",
                    stream.stream_id
                )));
            }
        }
        Ok(())
    }

    /// Find the config for a message
    ///
    /// A `stream_alt_id` match wins over a `stream_id` match. Empty ids never
    /// match.
    pub fn find(&self, stream_id: Option<&str>, stream_alt_id: Option<&str>) -> Option<&StreamConfig> {
        let alt = stream_alt_id.filter(|s| !s.is_empty());
        let id = stream_id.filter(|s| !s.is_empty());

        alt.and_then(|alt| {
            self.streams
                .iter()
                .find(|s| s.stream_alt_id.as_deref() == Some(alt))
        })
        .or_else(|| id.and_then(|id| self.streams.iter().find(|s| s.stream_id == id)))
    }

    /// Backend kind for a `file_store_type_id`
    pub fn file_store_kind(&self, id: i64) -> Option<FileStoreKind> {
        match self.file_store_types.name_of(id) {
            Some(name) => FileStoreKind::from_name(name),
            None => FileStoreKind::from_default_id(id),
        }
    }

    /// Partition granularity for a `partition_time_id` (Hourly when unknown)
    pub fn partition_granularity(&self, id: i64) -> PartitionGranularity {
        self.partition_times
            .name_of(id)
            .map_or_else(
                || PartitionGranularity::from_default_id(id),
                PartitionGranularity::from_name,
            )
            .unwrap_or_default()
    }

    /// Compression codec for a `compression_type_id` (None when unknown)
    pub fn compression_codec(&self, id: i64) -> CompressionCodec {
        self.compression_types
            .name_of(id)
            .map_or_else(
                || CompressionCodec::from_default_id(id),
                CompressionCodec::from_name,
            )
            .unwrap_or_default()
    }

    /// Resolve a config together with its lookup-derived settings
    pub fn resolve(&self, stream_id: Option<&str>, stream_alt_id: Option<&str>) -> Option<ResolvedStream> {
        self.find(stream_id, stream_alt_id).map(|config| ResolvedStream {
            backend: self.file_store_kind(config.file_store_type_id),
            granularity: self.partition_granularity(config.partition_time_id),
            codec: self.compression_codec(config.compression_type_id),
            config: config.clone(),
            generation: self.generation,
        })
    }
}

/// A stream config plus the lookup values it points at
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStream {
    pub config: StreamConfig,
    /// `None` when the backend id does not name a known backend
    pub backend: Option<FileStoreKind>,
    pub granularity: PartitionGranularity,
    pub codec: CompressionCodec,
    /// Snapshot generation the config was read from
    pub generation: u64,
}

impl ResolvedStream {
    /// Effective message type: payload `type` > envelope > config default > fallback
    pub fn effective_message_type(&self, payload_type: Option<&str>, envelope_type: Option<&str>) -> String {
        payload_type
            .filter(|t| !t.is_empty())
            .or_else(|| envelope_type.filter(|t| !t.is_empty()))
            .or_else(|| self.config.default_message_type())
            .unwrap_or(DEFAULT_MESSAGE_TYPE)
            .to_string()
    }
}

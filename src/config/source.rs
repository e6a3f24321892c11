//! Config sources
//!
//! A source produces a complete `ConfigSnapshot`. Sources never mutate
//! configuration; edits happen in the config service.

use super::types::{ConfigSnapshot, LookupEntry, LookupTable, StreamConfig};
use crate::error::{Error, Result, ResultExt};
use crate::http::{HttpClient, HttpClientConfig};
use crate::types::JsonValue;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// File holding the backend lookup table
pub const FILE_STORE_TYPES_FILE: &str = "file_store_types.json";
/// File holding the partition lookup table
pub const PARTITION_TIMES_FILE: &str = "partition_times.json";
/// File holding the compression lookup table
pub const COMPRESSION_TYPES_FILE: &str = "compression_types.json";

/// Something that can load the full configuration
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Load every stream config and lookup table
    async fn load(&self) -> Result<ConfigSnapshot>;

    /// Short description for logs
    fn describe(&self) -> String;
}

// ============================================================================
// Directory Source
// ============================================================================

/// One JSON file per stream plus shared constants files
///
/// Layout:
/// ```text
/// <root>/configs/<stream_id>.json
/// <root>/constants/file_store_types.json
/// <root>/constants/partition_times.json
/// <root>/constants/compression_types.json
/// ```
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    /// Create a source rooted at `root`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn configs_dir(&self) -> PathBuf {
        self.root.join("configs")
    }

    fn constants_dir(&self) -> PathBuf {
        self.root.join("constants")
    }

    async fn read_lookup(&self, file: &str) -> Result<LookupTable> {
        let path = self.constants_dir().join(file);
        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::config_load(format!("Failed to read {}: {e}", path.display()))
        })?;
        let entries: Vec<LookupEntry> = serde_json::from_str(&contents).map_err(|e| {
            Error::config_load(format!("Failed to parse {}: {e}", path.display()))
        })?;
        Ok(LookupTable::new(entries))
    }

    async fn read_streams(&self) -> Result<Vec<StreamConfig>> {
        let dir = self.configs_dir();
        let mut entries = tokio::fs::read_dir(&dir).await.map_err(|e| {
            Error::config_load(format!("Failed to read {}: {e}", dir.display()))
        })?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut streams = Vec::with_capacity(paths.len());
        for path in paths {
            let contents = tokio::fs::read_to_string(&path).await?;
            let value: JsonValue = serde_json::from_str(&contents)
                .with_context(|| format!("Invalid JSON in {}", path.display()))
                .map_err(|e| Error::config_load(e.to_string()))?;
            let config = StreamConfig::from_value(value).map_err(|e| {
                Error::config_load(format!("Invalid stream config {}: {e}", path.display()))
            })?;
            debug!(stream_id = %config.stream_id, "Loaded stream config from {}", path.display());
            streams.push(config);
        }
        Ok(streams)
    }
}

#[async_trait]
impl ConfigSource for DirectorySource {
    async fn load(&self) -> Result<ConfigSnapshot> {
        let file_store_types = self.read_lookup(FILE_STORE_TYPES_FILE).await?;
        let partition_times = self.read_lookup(PARTITION_TIMES_FILE).await?;
        let compression_types = self.read_lookup(COMPRESSION_TYPES_FILE).await?;
        let streams = self.read_streams().await?;

        Ok(ConfigSnapshot::new(
            streams,
            file_store_types,
            partition_times,
            compression_types,
        ))
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.root.display())
    }
}

// ============================================================================
// Config Service Source
// ============================================================================

/// Reads configuration from the config service's REST endpoints
#[derive(Debug)]
pub struct ConfigServiceSource {
    client: HttpClient,
    base_url: String,
}

impl ConfigServiceSource {
    /// Create a source for the service at `base_url`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        let client = HttpClient::with_config(
            HttpClientConfig::builder()
                .base_url(base_url.clone())
                .timeout(timeout)
                .build(),
        )?;
        Ok(Self { client, base_url })
    }

    async fn fetch_rows(&self, endpoint: &str) -> Result<Vec<JsonValue>> {
        let body: JsonValue = self.client.get_json(endpoint).await.map_err(|e| {
            Error::config_load(format!("GET {endpoint} failed: {e}"))
        })?;
        match body {
            JsonValue::Array(rows) => Ok(rows),
            JsonValue::Null => Ok(Vec::new()),
            other => Err(Error::config_load(format!(
                "GET {endpoint} returned {other} instead of an array"
            ))),
        }
    }

    async fn fetch_lookup(&self, endpoint: &str) -> Result<LookupTable> {
        let rows = self.fetch_rows(endpoint).await?;
        let entries = rows
            .into_iter()
            .map(|row| serde_json::from_value(unwrap_sql_nullable(row)))
            .collect::<std::result::Result<Vec<LookupEntry>, _>>()
            .map_err(|e| Error::config_load(format!("Invalid row from {endpoint}: {e}")))?;
        Ok(LookupTable::new(entries))
    }
}

#[async_trait]
impl ConfigSource for ConfigServiceSource {
    async fn load(&self) -> Result<ConfigSnapshot> {
        let streams = self
            .fetch_rows("/getAllStreams")
            .await?
            .into_iter()
            .map(|row| StreamConfig::from_value(unwrap_sql_nullable(row)))
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::config_load(e.to_string()))?;

        Ok(ConfigSnapshot::new(
            streams,
            self.fetch_lookup("/getAllFileStoreTypes").await?,
            self.fetch_lookup("/getAllPartitionTimes").await?,
            self.fetch_lookup("/getAllCompressionTypes").await?,
        ))
    }

    fn describe(&self) -> String {
        format!("service:{}", self.base_url)
    }
}

/// Flatten SQL-nullable wrappers in a row
///
/// `{"String": "x", "Valid": true}` becomes `"x"`; wrappers with
/// `"Valid": false` become `null`. Other values pass through.
pub fn unwrap_sql_nullable(row: JsonValue) -> JsonValue {
    match row {
        JsonValue::Object(map) => JsonValue::Object(
            map.into_iter()
                .map(|(key, value)| (key, unwrap_nullable_value(value)))
                .collect(),
        ),
        other => other,
    }
}

fn unwrap_nullable_value(value: JsonValue) -> JsonValue {
    let JsonValue::Object(mut inner) = value else {
        return value;
    };
    let Some(valid) = inner.get("Valid").and_then(JsonValue::as_bool) else {
        return JsonValue::Object(inner);
    };
    if !valid {
        return JsonValue::Null;
    }
    for key in ["String", "Int64", "Int32", "Bool", "Float64"] {
        if let Some(v) = inner.remove(key) {
            return v;
        }
    }
    JsonValue::Null
}

// ============================================================================
// Static Source
// ============================================================================

/// In-memory source, swappable between loads
#[derive(Debug, Default)]
pub struct StaticSource {
    snapshot: Mutex<ConfigSnapshot>,
}

impl StaticSource {
    /// Create a source that always returns `snapshot`
    pub fn new(snapshot: ConfigSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Replace what the next `load` returns
    pub fn set(&self, snapshot: ConfigSnapshot) {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = snapshot;
        }
    }
}

#[async_trait]
impl ConfigSource for StaticSource {
    async fn load(&self) -> Result<ConfigSnapshot> {
        self.snapshot
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| Error::config_load("static config source poisoned"))
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

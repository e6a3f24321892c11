//! Pipeline tests with fake backends and catalogs

use super::*;
use crate::catalog::{
    DremioClient, GlueCatalog, GlueConnector, GlueSync, SnowflakeConnector, SnowflakeSync,
    SqlSession,
};
use crate::config::{ConfigSnapshot, ConfigSource, LookupTable, StaticSource, StreamConfig};
use crate::egress::ChannelEgress;
use crate::settings::GlueSettings;
use crate::storage::{LocalBackend, StorageBackend};
use crate::types::{FileStoreKind, JsonValue};
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Fakes
// ============================================================================

/// Records every write and answers with an S3-style location
struct FakeS3 {
    writes: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl FakeS3 {
    fn new() -> Self {
        Self {
            writes: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn writes(&self) -> Vec<(String, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageBackend for FakeS3 {
    fn kind(&self) -> FileStoreKind {
        FileStoreKind::S3
    }

    async fn write(&self, request: &WriteRequest<'_>) -> Result<Location> {
        if self.fail {
            return Err(Error::write("AccessDenied"));
        }
        let key = request.path.key();
        self.writes
            .lock()
            .unwrap()
            .push((request.message_type.to_string(), key.clone()));
        Ok(Location {
            kind: FileStoreKind::S3,
            uri: format!("s3://events/{key}"),
            container: Some("events".to_string()),
            key,
        })
    }

    fn catalog_source(&self, _config: &StreamConfig) -> Result<JsonValue> {
        Ok(json!({"type": "S3", "config": {"rootPath": "/events/raw"}}))
    }
}

/// Counts how often the cache reloads
struct CountingSource {
    inner: StaticSource,
    loads: AtomicUsize,
}

#[async_trait]
impl ConfigSource for CountingSource {
    async fn load(&self) -> Result<ConfigSnapshot> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load().await
    }

    fn describe(&self) -> String {
        "counting".to_string()
    }
}

#[derive(Default)]
struct CountingGlue {
    connects: AtomicUsize,
}

impl GlueConnector for CountingGlue {
    fn connect(&self, _config: &StreamConfig) -> Result<Arc<dyn GlueCatalog>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Err(Error::catalog("glue", "unexpected connect"))
    }
}

#[derive(Default)]
struct CountingSnowflake {
    connects: AtomicUsize,
}

#[async_trait]
impl SnowflakeConnector for CountingSnowflake {
    async fn connect(&self, _config: &StreamConfig) -> Result<Box<dyn SqlSession>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Err(Error::catalog("snowflake", "unexpected connect"))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn s3_stream() -> StreamConfig {
    StreamConfig {
        stream_alt_id: Some("wk-1".to_string()),
        file_store_type_id: 1,
        partition_time_id: 2,
        compression_type_id: 2,
        bucket_name: Some("events".to_string()),
        folder_name: Some("raw".to_string()),
        message_type: Some("config_default".to_string()),
        ..StreamConfig::new("s1")
    }
}

fn snapshot(streams: Vec<StreamConfig>) -> ConfigSnapshot {
    ConfigSnapshot::new(
        streams,
        LookupTable::default(),
        LookupTable::default(),
        LookupTable::default(),
    )
}

struct Harness {
    pipeline: IngestPipeline,
    source: Arc<CountingSource>,
    egress: mpsc::Receiver<Bytes>,
}

async fn harness(
    streams: Vec<StreamConfig>,
    backends: BackendRegistry,
    catalogs: CatalogSync,
) -> Harness {
    let source = Arc::new(CountingSource {
        inner: StaticSource::new(snapshot(streams)),
        loads: AtomicUsize::new(0),
    });
    let cache = ConfigCache::load(source.clone()).await.unwrap();
    let (sink, egress) = ChannelEgress::channel(16);
    Harness {
        pipeline: IngestPipeline::new(Arc::new(cache), backends, catalogs, Arc::new(sink)),
        source,
        egress,
    }
}

fn payload(value: JsonValue) -> crate::types::JsonObject {
    value.as_object().cloned().unwrap()
}

async fn next_egress(rx: &mut mpsc::Receiver<Bytes>) -> JsonValue {
    serde_json::from_slice(&rx.recv().await.unwrap()).unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_refresh_sentinel_triggers_exactly_one_refresh() {
    let s3 = Arc::new(FakeS3::new());
    let mut h = harness(
        vec![s3_stream()],
        BackendRegistry::new().with(s3.clone()),
        CatalogSync::new(),
    )
    .await;
    assert_eq!(h.source.loads.load(Ordering::SeqCst), 1);

    let outcome = h.pipeline.ingest(IncomingMessage::refresh_sentinel()).await;

    assert_eq!(outcome, IngestOutcome::Refreshed { generation: 2 });
    assert_eq!(h.source.loads.load(Ordering::SeqCst), 2);
    assert_eq!(h.pipeline.cache().refresh_count(), 2);
    assert!(s3.writes().is_empty());
    assert!(h.egress.try_recv().is_err());
}

#[tokio::test]
async fn test_payload_type_wins_over_envelope_and_config() {
    let s3 = Arc::new(FakeS3::new());
    let mut h = harness(
        vec![s3_stream()],
        BackendRegistry::new().with(s3.clone()),
        CatalogSync::new(),
    )
    .await;

    let message = IncomingMessage::new("s1", payload(json!({"type": "X", "n": 1})))
        .with_message_type("Y");
    let outcome = h.pipeline.ingest(message).await;

    let IngestOutcome::Written {
        message_type,
        location,
        catalog_errors,
    } = outcome
    else {
        panic!("expected a write, got {outcome:?}");
    };
    assert_eq!(message_type, "X");
    assert!(location.key.starts_with("raw/X/"));
    assert!(catalog_errors.is_empty());
    assert_eq!(s3.writes()[0].0, "X");
    assert_eq!(next_egress(&mut h.egress).await, json!({"type": "X", "n": 1}));
}

#[tokio::test]
async fn test_envelope_then_config_default_message_type() {
    let s3 = Arc::new(FakeS3::new());
    let h = harness(
        vec![s3_stream()],
        BackendRegistry::new().with(s3.clone()),
        CatalogSync::new(),
    )
    .await;

    h.pipeline
        .ingest(IncomingMessage::new("s1", payload(json!({"n": 1}))).with_message_type("Y"))
        .await;
    h.pipeline
        .ingest(IncomingMessage::new("s1", payload(json!({"n": 2}))))
        .await;

    let types: Vec<String> = s3.writes().into_iter().map(|(t, _)| t).collect();
    assert_eq!(types, vec!["Y", "config_default"]);
}

#[tokio::test]
async fn test_aws_stream_without_glue_or_snowflake_only_uploads_and_syncs_dremio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apiv2/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "t"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/catalog"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [
            {"id": "src1", "path": ["s1"], "type": "CONTAINER", "containerType": "SOURCE"}
        ]})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/catalog/src1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"children": [
            {"id": "ds1", "path": ["s1", "clicks"], "type": "DATASET"}
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    let glue = Arc::new(CountingGlue::default());
    let snowflake = Arc::new(CountingSnowflake::default());
    let catalogs = CatalogSync::new()
        .with_dremio(
            DremioClient::self_hosted(server.uri(), "u", "p", Duration::from_secs(5)).unwrap(),
        )
        .with_glue(GlueSync::new(glue.clone(), GlueSettings::default()))
        .with_snowflake(SnowflakeSync::new(snowflake.clone()));
    let s3 = Arc::new(FakeS3::new());
    let h = harness(
        vec![s3_stream()],
        BackendRegistry::new().with(s3.clone()),
        catalogs,
    )
    .await;
    h.pipeline.catalogs().login().await.unwrap();

    let outcome = h
        .pipeline
        .ingest(IncomingMessage::new("s1", payload(json!({"type": "clicks"}))))
        .await;

    assert!(outcome.is_written(), "{outcome:?}");
    assert_eq!(s3.writes().len(), 1);
    assert_eq!(glue.connects.load(Ordering::SeqCst), 0);
    assert_eq!(snowflake.connects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_catalog_failure_is_reported_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/apiv2/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let catalogs = CatalogSync::new().with_dremio(
        DremioClient::self_hosted(server.uri(), "u", "p", Duration::from_secs(5)).unwrap(),
    );
    let s3 = Arc::new(FakeS3::new());
    let h = harness(vec![s3_stream()], BackendRegistry::new().with(s3.clone()), catalogs).await;

    let outcome = h
        .pipeline
        .ingest(IncomingMessage::new("s1", payload(json!({"n": 1}))))
        .await;

    let IngestOutcome::Written { catalog_errors, .. } = outcome else {
        panic!("expected a write, got {outcome:?}");
    };
    assert_eq!(catalog_errors.len(), 1);
    assert!(catalog_errors[0].contains("dremio"));
    assert_eq!(s3.writes().len(), 1);
}

#[tokio::test]
async fn test_unknown_and_inactive_streams_are_dropped_but_forwarded() {
    let inactive = StreamConfig {
        active: false,
        ..StreamConfig::new("off")
    };
    let s3 = Arc::new(FakeS3::new());
    let mut h = harness(
        vec![s3_stream(), inactive],
        BackendRegistry::new().with(s3.clone()),
        CatalogSync::new(),
    )
    .await;

    let unknown = h
        .pipeline
        .ingest(IncomingMessage::new("nope", payload(json!({"a": 1}))))
        .await;
    let off = h
        .pipeline
        .ingest(IncomingMessage::new("off", payload(json!({"a": 2}))))
        .await;

    assert!(matches!(unknown, IngestOutcome::Dropped { ref reason } if reason.contains("nope")));
    assert!(matches!(off, IngestOutcome::Dropped { ref reason } if reason.contains("not active")));
    assert!(s3.writes().is_empty());
    assert_eq!(next_egress(&mut h.egress).await, json!({"a": 1}));
    assert_eq!(next_egress(&mut h.egress).await, json!({"a": 2}));
}

#[tokio::test]
async fn test_alt_id_resolves_the_stream() {
    let s3 = Arc::new(FakeS3::new());
    let h = harness(
        vec![s3_stream()],
        BackendRegistry::new().with(s3.clone()),
        CatalogSync::new(),
    )
    .await;

    let mut message = IncomingMessage::new("", payload(json!({"n": 1})));
    message.stream_alt_id = Some("wk-1".to_string());

    assert!(h.pipeline.ingest(message).await.is_written());
}

#[tokio::test]
async fn test_write_failures() {
    let unknown_backend = StreamConfig {
        file_store_type_id: 42,
        ..StreamConfig::new("weird")
    };
    let failing = Arc::new(FakeS3::failing());
    let mut h = harness(
        vec![s3_stream(), unknown_backend],
        BackendRegistry::new().with(failing),
        CatalogSync::new(),
    )
    .await;

    let denied = h
        .pipeline
        .ingest(IncomingMessage::new("s1", payload(json!({"n": 1}))))
        .await;
    let weird = h
        .pipeline
        .ingest(IncomingMessage::new("weird", payload(json!({"n": 2}))))
        .await;

    assert!(matches!(denied, IngestOutcome::WriteFailed { ref error } if error.contains("AccessDenied")));
    assert!(matches!(weird, IngestOutcome::WriteFailed { ref error } if error.contains("no usable backend")));
    // Egress runs regardless of the write outcome
    assert!(h.egress.recv().await.is_some());
    assert!(h.egress.recv().await.is_some());
}

#[tokio::test]
async fn test_local_backend_end_to_end() {
    let root = tempdir().unwrap();
    let local = StreamConfig {
        file_store_type_id: 5,
        partition_time_id: 3,
        folder_name: Some("lake".to_string()),
        ..StreamConfig::new("s2")
    };
    let h = harness(
        vec![local],
        BackendRegistry::new().with(Arc::new(LocalBackend::new(root.path()))),
        CatalogSync::new(),
    )
    .await;

    let outcome = h
        .pipeline
        .ingest(IncomingMessage::new(
            "s2",
            payload(json!({"type": "signup", "user": {"id": 7, "tags": ["a"]}})),
        ))
        .await;

    let IngestOutcome::Written { location, .. } = outcome else {
        panic!("expected a write, got {outcome:?}");
    };
    assert!(location.key.starts_with("lake/signup/"));
    assert!(location.key.contains("-W"));
    assert!(root.path().join(&location.key).is_file());
}

#[tokio::test]
async fn test_path_traversal_message_type_is_dropped() {
    let base = tempdir().unwrap();
    let datastore = base.path().join("datastore");
    let local = StreamConfig {
        file_store_type_id: 5,
        folder_name: Some("lake".to_string()),
        ..StreamConfig::new("s2")
    };
    let mut h = harness(
        vec![local],
        BackendRegistry::new().with(Arc::new(LocalBackend::new(&datastore))),
        CatalogSync::new(),
    )
    .await;

    let outcome = h
        .pipeline
        .ingest(IncomingMessage::new(
            "s2",
            payload(json!({"type": "../../escaped", "v": 1})),
        ))
        .await;

    let IngestOutcome::Dropped { reason } = outcome else {
        panic!("expected a drop, got {outcome:?}");
    };
    assert!(reason.contains("escaped"));
    assert!(!base.path().join("escaped").exists());
    assert!(!datastore.join("lake").exists());

    // Still forwarded, like every other dropped message
    assert_eq!(next_egress(&mut h.egress).await, json!({"type": "../../escaped", "v": 1}));
}

#[tokio::test]
async fn test_unsafe_envelope_message_type_is_dropped() {
    let fake = Arc::new(FakeS3::new());
    let h = harness(
        vec![s3_stream()],
        BackendRegistry::new().with(fake.clone()),
        CatalogSync::new(),
    )
    .await;

    let outcome = h
        .pipeline
        .ingest(IncomingMessage::new("s1", payload(json!({"n": 1}))).with_message_type("page view"))
        .await;

    assert!(matches!(outcome, IngestOutcome::Dropped { .. }));
    assert!(fake.writes().is_empty());
}

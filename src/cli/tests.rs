//! HTTP host tests

use super::*;
use crate::catalog::CatalogSync;
use crate::config::{
    ConfigCache, ConfigSnapshot, ConfigSource, LookupTable, StaticSource, StreamConfig,
};
use crate::egress::ChannelEgress;
use crate::pipeline::IngestPipeline;
use crate::settings::Settings;
use crate::storage::{BackendRegistry, LocalBackend};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use bytes::Bytes;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};
use tokio::sync::mpsc;
use tower::ServiceExt;

struct Host {
    app: axum::Router,
    egress: mpsc::Receiver<Bytes>,
    cache: Arc<ConfigCache>,
    _root: TempDir,
}

async fn host() -> Host {
    let root = tempdir().unwrap();
    let stream = StreamConfig {
        stream_alt_id: Some("wk".to_string()),
        file_store_type_id: 5,
        folder_name: Some("lake".to_string()),
        ..StreamConfig::new("s1")
    };
    let source = Arc::new(StaticSource::new(ConfigSnapshot::new(
        vec![stream],
        LookupTable::default(),
        LookupTable::default(),
        LookupTable::default(),
    )));
    let cache = Arc::new(ConfigCache::load(source).await.unwrap());
    let (sink, egress) = ChannelEgress::channel(8);
    let pipeline = IngestPipeline::new(
        cache.clone(),
        BackendRegistry::new().with(Arc::new(LocalBackend::new(root.path()))),
        CatalogSync::new(),
        Arc::new(sink),
    );
    Host {
        app: router(Arc::new(pipeline)),
        egress,
        cache,
        _root: root,
    }
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let h = host().await;
    let response = h
        .app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_ingest_sync_returns_outcome() {
    let h = host().await;
    let response = h
        .app
        .oneshot(post_json(
            "/ingest/sync",
            &json!({"stream_id": "s1", "message_type": "orders", "payload": {"id": 1}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["outcome"], "written");
    assert_eq!(body["message_type"], "orders");
    assert!(body["location"]["key"]
        .as_str()
        .unwrap()
        .starts_with("lake/orders/"));
}

#[tokio::test]
async fn test_ingest_is_accepted_and_processed_in_background() {
    let mut h = host().await;
    let response = h
        .app
        .oneshot(post_json(
            "/ingest",
            &json!({"stream_id": "s1", "payload": {"id": 2}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let forwarded = tokio::time::timeout(Duration::from_secs(5), h.egress.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(serde_json::from_slice::<Value>(&forwarded).unwrap(), json!({"id": 2}));
}

#[tokio::test]
async fn test_events_are_normalised() {
    let mut h = host().await;
    let response = h
        .app
        .clone()
        .oneshot(post_json("/events", &json!({"writeKey": "wk", "type": "track"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let forwarded = tokio::time::timeout(Duration::from_secs(5), h.egress.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        serde_json::from_slice::<Value>(&forwarded).unwrap(),
        json!({"writeKey": "wk", "type": "track"})
    );

    let response = h
        .app
        .oneshot(post_json("/events", &json!({"type": "track"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_cache_reloads_config() {
    let h = host().await;
    assert_eq!(h.cache.refresh_count(), 1);

    let response = h
        .app
        .oneshot(Request::get("/refreshCache").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.cache.refresh_count() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_config_source_selection() {
    let dir = tempdir().unwrap();
    let mut settings = Settings {
        config_dir: Some(dir.path().to_path_buf()),
        ..Settings::default()
    };
    assert!(config_source(&settings).unwrap().describe().starts_with("dir:"));

    settings.config_service_url = Some("http://config:8080".to_string());
    assert_eq!(
        config_source(&settings).unwrap().describe(),
        "service:http://config:8080"
    );

    assert!(config_source(&Settings::default()).is_err());
}

#[tokio::test]
async fn test_ingest_command_reports_unreadable_message_file() {
    let dir = tempdir().unwrap();
    let settings = dir.path().join("settings.yaml");
    std::fs::write(&settings, format!("config_dir: {}\n", dir.path().display())).unwrap();
    let message = dir.path().join("message.json");
    std::fs::write(&message, "not json").unwrap();

    let runner = Runner::new(Cli {
        settings: Some(settings),
        verbose: false,
        command: Commands::Ingest { file: message },
    });
    let err = runner.run().await.unwrap_err();
    assert!(err.to_string().starts_with("Invalid message file: "));

    let runner = Runner::new(Cli {
        settings: Some(dir.path().join("settings.yaml")),
        verbose: false,
        command: Commands::Ingest {
            file: dir.path().join("missing.json"),
        },
    });
    let err = runner.run().await.unwrap_err();
    assert!(err.to_string().contains("missing.json"));
}

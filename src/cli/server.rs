//! HTTP ingest host
//!
//! Accepted messages are processed on their own task and answered with
//! `202 Accepted`; `/ingest/sync` processes inline and returns the outcome.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::{Error, Result};
use crate::message::IncomingMessage;
use crate::pipeline::IngestPipeline;

/// App state shared across handlers
#[derive(Clone)]
struct AppState {
    pipeline: Arc<IngestPipeline>,
}

/// Routes of the ingest host
pub fn router(pipeline: Arc<IngestPipeline>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ingest", post(ingest))
        .route("/ingest/sync", post(ingest_sync))
        .route("/events", post(events))
        .route("/refreshCache", get(refresh_cache).post(refresh_cache))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { pipeline })
}

/// Start the HTTP server
pub async fn serve(pipeline: Arc<IngestPipeline>, port: u16) -> Result<()> {
    let app = router(pipeline);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Other(format!("Failed to bind to port {port}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Other(format!("Server error: {e}")))?;

    Ok(())
}

fn accept(state: &AppState, message: IncomingMessage) -> (StatusCode, Json<Value>) {
    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        let outcome = pipeline.ingest(message).await;
        debug!(?outcome, "Message processed");
    });
    (StatusCode::ACCEPTED, Json(json!({ "accepted": true })))
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Queue an envelope
async fn ingest(
    State(state): State<AppState>,
    Json(message): Json<IncomingMessage>,
) -> impl IntoResponse {
    accept(&state, message)
}

/// Process an envelope inline and report the outcome
async fn ingest_sync(
    State(state): State<AppState>,
    Json(message): Json<IncomingMessage>,
) -> impl IntoResponse {
    let outcome = state.pipeline.ingest(message).await;
    (StatusCode::OK, Json(outcome))
}

/// Normalise a raw event and queue it
async fn events(State(state): State<AppState>, Json(event): Json<Value>) -> impl IntoResponse {
    match IncomingMessage::from_event(event) {
        Ok(message) => accept(&state, message).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "accepted": false, "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// Ask the pipeline to reload its config
async fn refresh_cache(State(state): State<AppState>) -> impl IntoResponse {
    accept(&state, IncomingMessage::refresh_sentinel())
}

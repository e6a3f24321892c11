//! Ingest pipeline
//!
//! `IngestPipeline::ingest` handles one message end to end:
//!
//! 1. the refresh control message reloads the config cache and stops there
//! 2. the stream config is resolved (alt id first); unknown or inactive
//!    streams are dropped
//! 3. the effective message type is chosen (payload `type` > envelope >
//!    config default > fallback); names that are not a plain path segment
//!    drop the message
//! 4. schema inference, path planning and the backend write
//! 5. catalog sync, whose failures are reported but never undo the write
//! 6. the payload is forwarded to the egress sink
//!
//! Nothing is shared between calls except the config cache, so the host
//! may run any number of `ingest` calls concurrently.

use crate::catalog::CatalogSync;
use crate::config::{ConfigCache, ResolvedStream};
use crate::egress::EgressSink;
use crate::error::{Error, Result};
use crate::message::IncomingMessage;
use crate::partition::{validate_message_type, PlannedPath};
use crate::schema::infer;
use crate::storage::{BackendRegistry, Location, WriteRequest};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// What happened to a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Control message; the config cache now holds `generation`
    Refreshed { generation: u64 },
    /// Not written, not retried
    Dropped { reason: String },
    /// File written; catalog failures are listed but do not fail the message
    Written {
        location: Location,
        message_type: String,
        catalog_errors: Vec<String>,
    },
    /// The file could not be written
    WriteFailed { error: String },
}

impl IngestOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, IngestOutcome::Written { .. })
    }
}

/// Per-message ingest orchestration
pub struct IngestPipeline {
    cache: Arc<ConfigCache>,
    backends: BackendRegistry,
    catalogs: CatalogSync,
    egress: Arc<dyn EgressSink>,
}

impl IngestPipeline {
    pub fn new(
        cache: Arc<ConfigCache>,
        backends: BackendRegistry,
        catalogs: CatalogSync,
        egress: Arc<dyn EgressSink>,
    ) -> Self {
        Self {
            cache,
            backends,
            catalogs,
            egress,
        }
    }

    pub fn cache(&self) -> &Arc<ConfigCache> {
        &self.cache
    }

    pub fn catalogs(&self) -> &CatalogSync {
        &self.catalogs
    }

    /// Process one message
    #[instrument(skip_all, fields(stream_id = ?message.stream_id, stream_alt_id = ?message.stream_alt_id))]
    pub async fn ingest(&self, message: IncomingMessage) -> IngestOutcome {
        if message.is_refresh() {
            return match self.cache.refresh().await {
                Ok(snapshot) => IngestOutcome::Refreshed {
                    generation: snapshot.generation,
                },
                Err(e) => {
                    error!("Config refresh failed, keeping the previous snapshot: {e}");
                    IngestOutcome::Dropped {
                        reason: e.to_string(),
                    }
                }
            };
        }

        let outcome = match self.resolve(&message).await {
            Ok(stream) => self.write(&message, &stream).await,
            Err(e) => {
                warn!("Dropping message: {e}");
                IngestOutcome::Dropped {
                    reason: e.to_string(),
                }
            }
        };

        self.forward(&message).await;
        outcome
    }

    async fn resolve(&self, message: &IncomingMessage) -> Result<ResolvedStream> {
        let stream = self
            .cache
            .resolve(
                message.stream_id.as_deref().filter(|s| !s.is_empty()),
                message.stream_alt_id.as_deref().filter(|s| !s.is_empty()),
            )
            .await?;
        if !stream.config.active {
            return Err(Error::StreamInactive {
                stream_id: stream.config.stream_id,
            });
        }
        Ok(stream)
    }

    async fn write(&self, message: &IncomingMessage, stream: &ResolvedStream) -> IngestOutcome {
        let config = &stream.config;
        let message_type =
            stream.effective_message_type(message.payload_type(), message.message_type.as_deref());
        if let Err(e) = validate_message_type(&message_type) {
            warn!(stream_id = %config.stream_id, "Dropping message: {e}");
            return IngestOutcome::Dropped {
                reason: e.to_string(),
            };
        }

        let Some(backend) = stream.backend.and_then(|kind| self.backends.get(kind)) else {
            let error = Error::write(format!(
                "stream '{}' has no usable backend (file_store_type_id={})",
                config.stream_id, config.file_store_type_id
            ));
            error!("{error}");
            return IngestOutcome::WriteFailed {
                error: error.to_string(),
            };
        };

        let payload = match message.payload_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                return IngestOutcome::WriteFailed {
                    error: e.to_string(),
                }
            }
        };
        let schema = infer(&message.payload, &message_type);
        let path = PlannedPath::plan(config.folder(), &message_type, stream.granularity, Utc::now());
        debug!(message_type = %message_type, key = %path.key(), fields = schema.len(), "Planned write");

        let request = WriteRequest {
            config,
            message_type: &message_type,
            schema: &schema,
            payload: &payload,
            codec: stream.codec,
            path: &path,
        };

        let location = match backend.write(&request).await {
            Ok(location) => location,
            Err(e) => {
                error!(backend = %backend.kind(), message_type = %message_type, "Write failed: {e}");
                return IngestOutcome::WriteFailed {
                    error: e.to_string(),
                };
            }
        };
        info!(backend = %backend.kind(), uri = %location.uri, message_type = %message_type, "Wrote file");

        let catalog_errors = self
            .catalogs
            .sync(&message_type, backend.as_ref(), config)
            .await
            .into_iter()
            .map(|e| e.to_string())
            .collect();

        IngestOutcome::Written {
            location,
            message_type,
            catalog_errors,
        }
    }

    async fn forward(&self, message: &IncomingMessage) {
        match message.payload_bytes() {
            Ok(payload) => {
                if let Err(e) = self.egress.publish(Bytes::from(payload)).await {
                    warn!("Egress publish failed: {e}");
                }
            }
            Err(e) => warn!("Payload could not be serialized for egress: {e}"),
        }
    }
}

impl std::fmt::Debug for IngestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestPipeline")
            .field("cache", &self.cache)
            .field("backends", &self.backends)
            .field("catalogs", &self.catalogs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;

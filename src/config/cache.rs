//! Config cache with atomic snapshot replacement

use super::source::ConfigSource;
use super::types::{ConfigSnapshot, ResolvedStream};
use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Holds the current `ConfigSnapshot` and swaps it wholesale on refresh
///
/// Readers clone the `Arc` of the current snapshot, so a refresh running
/// concurrently is never observed half-applied. Overlapping refreshes are
/// applied in the order they started: a load that finishes after a newer
/// one has been swapped in is discarded.
pub struct ConfigCache {
    source: Arc<dyn ConfigSource>,
    current: RwLock<Current>,
    generation: AtomicU64,
    refreshes: AtomicU64,
}

struct Current {
    snapshot: Arc<ConfigSnapshot>,
    /// Refresh ticket the snapshot was loaded under
    ticket: u64,
}

impl ConfigCache {
    /// Create an empty cache; call `refresh` before resolving
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self {
            source,
            current: RwLock::new(Current {
                snapshot: Arc::new(ConfigSnapshot::default()),
                ticket: 0,
            }),
            generation: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
        }
    }

    /// Create a cache and perform the initial load
    ///
    /// Failure here is fatal for the process.
    pub async fn load(source: Arc<dyn ConfigSource>) -> Result<Self> {
        let cache = Self::new(source);
        cache.refresh().await?;
        Ok(cache)
    }

    /// Reload everything from the source and swap it in atomically
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<Arc<ConfigSnapshot>> {
        let ticket = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;

        let mut snapshot = match self.source.load().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(source = %self.source.describe(), "Config refresh failed: {e}");
                return Err(match e {
                    Error::ConfigLoad { .. } => e,
                    other => Error::config_load(other.to_string()),
                });
            }
        };
        snapshot.validate()?;

        let mut current = self.current.write().await;
        if current.ticket > ticket {
            debug!(
                ticket,
                applied = current.ticket,
                "Discarding config load overtaken by a newer refresh"
            );
            return Ok(Arc::clone(&current.snapshot));
        }
        snapshot.generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let snapshot = Arc::new(snapshot);
        *current = Current {
            snapshot: Arc::clone(&snapshot),
            ticket,
        };
        drop(current);

        info!(
            generation = snapshot.generation,
            streams = snapshot.streams.len(),
            source = %self.source.describe(),
            "Config cache refreshed"
        );
        Ok(snapshot)
    }

    /// The current snapshot
    pub async fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.current.read().await.snapshot)
    }

    /// Resolve the config for a message
    pub async fn resolve(
        &self,
        stream_id: Option<&str>,
        stream_alt_id: Option<&str>,
    ) -> Result<ResolvedStream> {
        let snapshot = self.snapshot().await;
        snapshot
            .resolve(stream_id, stream_alt_id)
            .ok_or_else(|| Error::NoMatchingConfig {
                stream_id: stream_id.map(ToString::to_string),
                stream_alt_id: stream_alt_id.map(ToString::to_string),
            })
    }

    /// Number of refresh attempts so far (including the initial load)
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Human-readable description of the backing source
    pub fn source_description(&self) -> String {
        self.source.describe()
    }
}

impl std::fmt::Debug for ConfigCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigCache")
            .field("source", &self.source.describe())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

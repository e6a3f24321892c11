//! Catalog synchronization
//!
//! After a file lands, the stream's catalogs are brought up to date:
//! Dremio for every backend, Glue for S3 streams and Snowflake for S3 and
//! Azure streams, each only when the stream enables it. Every step checks
//! before it creates, and a failure never undoes the written file.

mod dremio;
mod glue;
mod snowflake;

pub use dremio::{CatalogEntry, CatalogUpdate, DremioClient};
pub use glue::{
    crawler_name, AwsGlue, AwsGlueConnector, CrawlerSpec, GlueCatalog, GlueConnector, GlueSync,
    GlueUpdate,
};
pub use snowflake::{
    sanitize_identifier, RestSession, RestSnowflakeConnector, SnowflakeConnector, SnowflakeSync,
    SqlSession,
};

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::settings::Settings;
use crate::storage::StorageBackend;
use crate::types::FileStoreKind;
use std::sync::Arc;
use tracing::{debug, warn};

/// `{folder}/{message_type}/`, or `{message_type}/` without a folder
pub(crate) fn message_type_prefix(config: &StreamConfig, message_type: &str) -> String {
    match config.folder() {
        "" => format!("{message_type}/"),
        folder => format!("{folder}/{message_type}/"),
    }
}

/// Runs every applicable catalog step for a written file
#[derive(Debug, Default)]
pub struct CatalogSync {
    dremio: Option<Arc<DremioClient>>,
    glue: Option<GlueSync>,
    snowflake: Option<SnowflakeSync>,
}

impl CatalogSync {
    /// No catalogs
    pub fn new() -> Self {
        Self::default()
    }

    /// Real clients for everything the settings configure
    ///
    /// Glue and Snowflake are always available; whether they run is decided
    /// per stream. Dremio is only used when configured.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = settings.request_timeout();
        let mut sync = Self::new()
            .with_glue(GlueSync::new(
                Arc::new(AwsGlueConnector::new(timeout)),
                settings.glue.clone(),
            ))
            .with_snowflake(SnowflakeSync::new(Arc::new(
                match settings.snowflake.endpoint.as_deref() {
                    Some(endpoint) => RestSnowflakeConnector::new(timeout).with_endpoint(endpoint),
                    None => RestSnowflakeConnector::new(timeout),
                },
            )));
        if let Some(dremio) = &settings.dremio {
            sync = sync.with_dremio(DremioClient::from_settings(dremio, timeout)?);
        }
        Ok(sync)
    }

    pub fn with_dremio(mut self, client: DremioClient) -> Self {
        self.dremio = Some(Arc::new(client));
        self
    }

    pub fn with_glue(mut self, glue: GlueSync) -> Self {
        self.glue = Some(glue);
        self
    }

    pub fn with_snowflake(mut self, snowflake: SnowflakeSync) -> Self {
        self.snowflake = Some(snowflake);
        self
    }

    pub fn dremio(&self) -> Option<&DremioClient> {
        self.dremio.as_deref()
    }

    /// Establish the Dremio session once at startup
    pub async fn login(&self) -> Result<()> {
        match &self.dremio {
            Some(dremio) => dremio
                .login()
                .await
                .map_err(|e| Error::catalog("dremio", format!("login: {e}"))),
            None => Ok(()),
        }
    }

    /// Sync every applicable catalog, collecting failures instead of stopping
    pub async fn sync(
        &self,
        message_type: &str,
        backend: &dyn StorageBackend,
        config: &StreamConfig,
    ) -> Vec<Error> {
        let kind = backend.kind();
        let mut errors = Vec::new();

        if let Some(dremio) = &self.dremio {
            let result = match dremio.update_catalog(message_type, backend, config).await {
                Ok(update) if update.dataset_deferred => dremio
                    .mark_folder_format(&config.stream_id, message_type)
                    .await,
                Ok(update) => {
                    debug!(stream_id = %config.stream_id, message_type, ?update, "Dremio sync done");
                    Ok(())
                }
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                errors.push(e);
            }
        }

        if kind == FileStoreKind::S3 && config.glue_enabled {
            if let Some(glue) = &self.glue {
                if let Err(e) = glue.sync(config, message_type).await {
                    errors.push(as_catalog_error("glue", e));
                }
            }
        }

        if matches!(kind, FileStoreKind::S3 | FileStoreKind::Azure) && config.snowflake_enabled {
            if let Some(snowflake) = &self.snowflake {
                if let Err(e) = snowflake.sync(config, kind, message_type).await {
                    errors.push(as_catalog_error("snowflake", e));
                }
            }
        }

        for error in &errors {
            warn!(stream_id = %config.stream_id, message_type, "Catalog sync failed: {error}");
        }
        errors
    }
}

/// Attribute an error to a catalog unless it already is one
fn as_catalog_error(catalog: &str, error: Error) -> Error {
    match error {
        Error::CatalogSync { .. } => error,
        other => Error::catalog(catalog, other.to_string()),
    }
}

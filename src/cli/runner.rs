//! CLI runner - executes commands

use crate::catalog::CatalogSync;
use crate::cli::commands::{Cli, Commands};
use crate::config::{ConfigCache, ConfigServiceSource, ConfigSource, DirectorySource};
use crate::egress::{EgressSink, HttpEgress, LogEgress};
use crate::error::{Error, Result, ResultExt};
use crate::message::IncomingMessage;
use crate::pipeline::{IngestOutcome, IngestPipeline};
use crate::settings::Settings;
use crate::storage::BackendRegistry;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let settings = Settings::load(self.cli.settings.as_deref())?;
        settings.validate()?;

        match &self.cli.command {
            Commands::Serve { port } => {
                let pipeline = build_pipeline(&settings).await?;
                crate::cli::serve(Arc::new(pipeline), *port).await
            }
            Commands::Ingest { file } => self.ingest(&settings, file).await,
            Commands::CheckConfig => self.check_config(&settings).await,
        }
    }

    async fn ingest(&self, settings: &Settings, file: &Path) -> Result<()> {
        let bytes = tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let message = IncomingMessage::from_bytes(&bytes).context("Invalid message file")?;

        let pipeline = build_pipeline(settings).await?;
        let outcome = pipeline.ingest(message).await;
        println!("{}", serde_json::to_string_pretty(&outcome)?);

        match outcome {
            IngestOutcome::WriteFailed { error } => Err(Error::write(error)),
            _ => Ok(()),
        }
    }

    async fn check_config(&self, settings: &Settings) -> Result<()> {
        let cache = ConfigCache::load(config_source(settings)?).await?;
        let snapshot = cache.snapshot().await;

        let streams: Vec<_> = snapshot
            .streams
            .iter()
            .filter_map(|s| snapshot.resolve(Some(&s.stream_id), None))
            .map(|resolved| {
                json!({
                    "stream_id": resolved.config.stream_id,
                    "stream_alt_id": resolved.config.stream_alt_id,
                    "active": resolved.config.active,
                    "backend": resolved.backend,
                    "partition": resolved.granularity,
                    "compression": resolved.codec,
                    "glue": resolved.config.glue_enabled,
                    "snowflake": resolved.config.snowflake_enabled,
                })
            })
            .collect();

        let summary = json!({
            "source": cache.source_description(),
            "generation": snapshot.generation,
            "streams": streams,
            "file_store_types": snapshot.file_store_types,
            "partition_times": snapshot.partition_times,
            "compression_types": snapshot.compression_types,
        });

        if self.cli.verbose {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{summary}");
        }
        Ok(())
    }
}

/// The config source the settings select (config service wins over a directory)
pub fn config_source(settings: &Settings) -> Result<Arc<dyn ConfigSource>> {
    if let Some(url) = &settings.config_service_url {
        return Ok(Arc::new(ConfigServiceSource::new(
            url.clone(),
            settings.request_timeout(),
        )?));
    }
    match &settings.config_dir {
        Some(dir) => Ok(Arc::new(DirectorySource::new(dir))),
        None => Err(Error::settings("no config source configured")),
    }
}

/// Load config, open backends and catalogs, and log in to Dremio
///
/// Any failure here is a startup failure.
pub async fn build_pipeline(settings: &Settings) -> Result<IngestPipeline> {
    let cache = ConfigCache::load(config_source(settings)?).await?;
    let backends = BackendRegistry::from_settings(settings)?;
    let catalogs = CatalogSync::from_settings(settings)?;
    catalogs.login().await?;

    let egress: Arc<dyn EgressSink> = match &settings.egress_url {
        Some(url) => Arc::new(HttpEgress::new(url.clone(), settings.request_timeout())?),
        None => Arc::new(LogEgress),
    };

    info!(
        source = %cache.source_description(),
        backends = ?backends.kinds(),
        dremio = catalogs.dremio().is_some(),
        "Pipeline ready"
    );
    Ok(IngestPipeline::new(
        Arc::new(cache),
        backends,
        catalogs,
        egress,
    ))
}

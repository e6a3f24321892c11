//! AWS Glue sync
//!
//! One Glue database per stream and one crawler per stream/message type,
//! both created only when missing.

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::settings::GlueSettings;
use async_trait::async_trait;
use aws_sdk_glue::config::timeout::TimeoutConfig;
use aws_sdk_glue::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_glue::error::DisplayErrorContext;
use aws_sdk_glue::types::{CrawlerTargets, DatabaseInput, S3Target};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const CATALOG: &str = "glue";

/// A crawler to create
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerSpec {
    pub name: String,
    pub database: String,
    pub role: String,
    pub schedule: String,
    /// `s3://bucket/folder/messageType/`
    pub s3_path: String,
}

/// The Glue operations the sync needs
#[async_trait]
pub trait GlueCatalog: Send + Sync {
    async fn database_exists(&self, name: &str) -> Result<bool>;

    async fn create_database(&self, name: &str) -> Result<()>;

    async fn crawler_exists(&self, name: &str) -> Result<bool>;

    async fn create_crawler(&self, spec: &CrawlerSpec) -> Result<()>;
}

/// Opens a Glue client with a stream's credentials
pub trait GlueConnector: Send + Sync {
    fn connect(&self, config: &StreamConfig) -> Result<Arc<dyn GlueCatalog>>;
}

/// Crawler name for a stream and message type
pub fn crawler_name(stream_id: &str, message_type: &str) -> String {
    format!("{stream_id}_{message_type}")
}

/// What a Glue sync changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlueUpdate {
    pub database_created: bool,
    pub crawler_created: bool,
}

/// Database and crawler registration for S3-backed streams
pub struct GlueSync {
    connector: Arc<dyn GlueConnector>,
    settings: GlueSettings,
}

impl GlueSync {
    pub fn new(connector: Arc<dyn GlueConnector>, settings: GlueSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    /// Crawler definition for a stream and message type
    pub fn crawler_spec(&self, config: &StreamConfig, message_type: &str) -> Result<CrawlerSpec> {
        let bucket = config.require(&config.bucket_name, "bucket_name")?;
        let role = config
            .glue_role
            .as_deref()
            .filter(|r| !r.is_empty())
            .or(self.settings.default_role.as_deref())
            .ok_or_else(|| {
                Error::catalog(
                    CATALOG,
                    format!("no crawler role for stream '{}'", config.stream_id),
                )
            })?;
        let schedule = config
            .glue_crawler_schedule
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.settings.default_schedule);

        Ok(CrawlerSpec {
            name: crawler_name(&config.stream_id, message_type),
            database: config.stream_id.clone(),
            role: role.to_string(),
            schedule: schedule.to_string(),
            s3_path: format!("s3://{bucket}/{}", super::message_type_prefix(config, message_type)),
        })
    }

    /// Create whatever is missing
    pub async fn sync(&self, config: &StreamConfig, message_type: &str) -> Result<GlueUpdate> {
        let spec = self.crawler_spec(config, message_type)?;
        let glue = self.connector.connect(config)?;
        let mut update = GlueUpdate::default();

        if glue.database_exists(&spec.database).await? {
            debug!(database = %spec.database, "Glue database exists");
        } else {
            glue.create_database(&spec.database).await?;
            info!(database = %spec.database, "Created Glue database");
            update.database_created = true;
        }

        if glue.crawler_exists(&spec.name).await? {
            debug!(crawler = %spec.name, "Glue crawler exists");
        } else {
            glue.create_crawler(&spec).await?;
            info!(crawler = %spec.name, path = %spec.s3_path, "Created Glue crawler");
            update.crawler_created = true;
        }

        Ok(update)
    }
}

impl std::fmt::Debug for GlueSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlueSync")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// AWS SDK
// ============================================================================

/// Connector building `aws-sdk-glue` clients from static stream credentials
#[derive(Debug, Clone)]
pub struct AwsGlueConnector {
    timeout: Duration,
}

impl AwsGlueConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl GlueConnector for AwsGlueConnector {
    fn connect(&self, config: &StreamConfig) -> Result<Arc<dyn GlueCatalog>> {
        let key = config.require(&config.aws_access_key_id, "aws_access_key_id")?;
        let secret = config.require(&config.aws_secret_access_key, "aws_secret_access_key")?;
        let region = config.region.clone().unwrap_or_else(|| "us-east-1".to_string());

        let sdk_config = aws_sdk_glue::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(Credentials::new(key, secret, None, None, "stream-config"))
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(self.timeout)
                    .build(),
            )
            .build();

        Ok(Arc::new(AwsGlue {
            client: aws_sdk_glue::Client::from_conf(sdk_config),
        }))
    }
}

/// `GlueCatalog` over the AWS SDK
#[derive(Debug, Clone)]
pub struct AwsGlue {
    client: aws_sdk_glue::Client,
}

fn sdk_error(action: &str, err: impl std::error::Error) -> Error {
    Error::catalog(CATALOG, format!("{action}: {}", DisplayErrorContext(err)))
}

#[async_trait]
impl GlueCatalog for AwsGlue {
    async fn database_exists(&self, name: &str) -> Result<bool> {
        match self.client.get_database().name(name).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_entity_not_found_exception()) => {
                Ok(false)
            }
            Err(e) => Err(sdk_error("GetDatabase", e)),
        }
    }

    async fn create_database(&self, name: &str) -> Result<()> {
        let input = DatabaseInput::builder()
            .name(name)
            .build()
            .map_err(|e| sdk_error("DatabaseInput", e))?;
        self.client
            .create_database()
            .database_input(input)
            .send()
            .await
            .map_err(|e| sdk_error("CreateDatabase", e))?;
        Ok(())
    }

    async fn crawler_exists(&self, name: &str) -> Result<bool> {
        match self.client.get_crawler().name(name).send().await {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|s| s.is_entity_not_found_exception()) => {
                Ok(false)
            }
            Err(e) => Err(sdk_error("GetCrawler", e)),
        }
    }

    async fn create_crawler(&self, spec: &CrawlerSpec) -> Result<()> {
        let targets = CrawlerTargets::builder()
            .s3_targets(S3Target::builder().path(&spec.s3_path).build())
            .build();
        self.client
            .create_crawler()
            .name(&spec.name)
            .role(&spec.role)
            .database_name(&spec.database)
            .schedule(&spec.schedule)
            .targets(targets)
            .send()
            .await
            .map_err(|e| sdk_error("CreateCrawler", e))?;
        Ok(())
    }
}

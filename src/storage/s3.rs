//! Amazon S3 backend

use super::{client_options, root_path, Location, Stager, StorageBackend, WriteRequest};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::types::{FileStoreKind, JsonValue};
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Uploads staged files with the stream's own access key
#[derive(Debug, Clone)]
pub struct S3Backend {
    stager: Stager,
    timeout: Duration,
    endpoint: Option<String>,
}

impl S3Backend {
    pub fn new(stager: Stager, timeout: Duration) -> Self {
        Self {
            stager,
            timeout,
            endpoint: None,
        }
    }

    /// Use an S3-compatible endpoint instead of AWS (path-style, plain HTTP allowed)
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn build_store(&self, config: &StreamConfig, bucket: &str) -> Result<impl ObjectStore> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(bucket)
            .with_region(config.region.as_deref().unwrap_or("us-east-1"))
            .with_access_key_id(config.require(&config.aws_access_key_id, "aws_access_key_id")?)
            .with_secret_access_key(
                config.require(&config.aws_secret_access_key, "aws_secret_access_key")?,
            )
            .with_client_options(client_options(self.timeout));

        if let Some(endpoint) = &self.endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }

        builder
            .build()
            .map_err(|e| Error::write(format!("Failed to create S3 client: {e}")))
    }
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn kind(&self) -> FileStoreKind {
        FileStoreKind::S3
    }

    async fn write(&self, request: &WriteRequest<'_>) -> Result<Location> {
        let config = request.config;
        let bucket = config.require(&config.bucket_name, "bucket_name")?;
        let store = self.build_store(config, bucket)?;

        let staged = self.stager.stage(request).await?;
        let key = request.path.key();
        let data = staged.read().await?;

        store
            .put(&ObjectPath::from(key.as_str()), PutPayload::from(data))
            .await
            .map_err(|e| Error::write(format!("S3 upload to {bucket}/{key} failed: {e}")))?;

        info!(stream_id = %config.stream_id, bucket, key = %key, "Uploaded to S3");
        Ok(Location {
            kind: FileStoreKind::S3,
            uri: format!("s3://{bucket}/{key}"),
            container: Some(bucket.to_string()),
            key,
        })
    }

    fn catalog_source(&self, config: &StreamConfig) -> Result<JsonValue> {
        let bucket = config.require(&config.bucket_name, "bucket_name")?;
        Ok(json!({
            "type": "S3",
            "config": {
                "credentialType": "ACCESS_KEY",
                "accessKey": config.require(&config.aws_access_key_id, "aws_access_key_id")?,
                "accessSecret": config.require(&config.aws_secret_access_key, "aws_secret_access_key")?,
                "secure": true,
                "rootPath": root_path(bucket, config.folder())
            }
        }))
    }
}

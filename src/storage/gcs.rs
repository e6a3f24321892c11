//! Google Cloud Storage backend

use super::{client_options, root_path, Location, Stager, StorageBackend, WriteRequest};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::types::{FileStoreKind, JsonObject, JsonValue};
use async_trait::async_trait;
use object_store::gcp::GoogleCloudStorageBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde_json::json;
use std::time::Duration;
use tracing::info;

/// Parse a stream's service-account credential
///
/// Accepts a JSON object or a JSON-encoded string. Strings copied out of
/// key files often carry raw newlines inside `private_key`; those are
/// escaped and the parse retried.
pub fn parse_service_account(config: &StreamConfig) -> Result<JsonObject> {
    let credentials = config.gcp_json_credentials.as_ref().ok_or_else(|| {
        Error::write(format!(
            "stream '{}' is missing required field 'gcp_json_credentials'",
            config.stream_id
        ))
    })?;

    let value = match credentials {
        JsonValue::String(raw) => serde_json::from_str::<JsonValue>(raw)
            .or_else(|_| serde_json::from_str(&raw.replace('\r', "").replace('\n', "\\n")))
            .map_err(|e| Error::write(format!("Invalid GCP service account JSON: {e}")))?,
        other => other.clone(),
    };

    match value {
        JsonValue::Object(map) => Ok(map),
        _ => Err(Error::write("GCP service account JSON is not an object")),
    }
}

fn credential_field<'a>(account: &'a JsonObject, key: &str) -> &'a str {
    account.get(key).and_then(JsonValue::as_str).unwrap_or_default()
}

/// Uploads staged files with the stream's service account
#[derive(Debug, Clone)]
pub struct GcsBackend {
    stager: Stager,
    timeout: Duration,
}

impl GcsBackend {
    pub fn new(stager: Stager, timeout: Duration) -> Self {
        Self { stager, timeout }
    }
}

#[async_trait]
impl StorageBackend for GcsBackend {
    fn kind(&self) -> FileStoreKind {
        FileStoreKind::Gcs
    }

    async fn write(&self, request: &WriteRequest<'_>) -> Result<Location> {
        let config = request.config;
        let bucket = config.require(&config.bucket_name, "bucket_name")?;
        let account = parse_service_account(config)?;
        let store = GoogleCloudStorageBuilder::new()
            .with_bucket_name(bucket)
            .with_service_account_key(JsonValue::Object(account).to_string())
            .with_client_options(client_options(self.timeout))
            .build()
            .map_err(|e| Error::write(format!("Failed to create GCS client: {e}")))?;

        let staged = self.stager.stage(request).await?;
        let key = request.path.key();
        let data = staged.read().await?;

        store
            .put(&ObjectPath::from(key.as_str()), PutPayload::from(data))
            .await
            .map_err(|e| Error::write(format!("GCS upload to {bucket}/{key} failed: {e}")))?;

        info!(stream_id = %config.stream_id, bucket, key = %key, "Uploaded to GCS");
        Ok(Location {
            kind: FileStoreKind::Gcs,
            uri: format!("gs://{bucket}/{key}"),
            container: Some(bucket.to_string()),
            key,
        })
    }

    fn catalog_source(&self, config: &StreamConfig) -> Result<JsonValue> {
        let bucket = config.require(&config.bucket_name, "bucket_name")?;
        let account = parse_service_account(config)?;
        Ok(json!({
            "type": "GCS",
            "config": {
                "authMode": "SERVICE_ACCOUNT_KEYS",
                "projectId": credential_field(&account, "project_id"),
                "clientEmail": credential_field(&account, "client_email"),
                "clientId": credential_field(&account, "client_id"),
                "privateKeyId": credential_field(&account, "private_key_id"),
                "privateKey": credential_field(&account, "private_key"),
                "rootPath": root_path(bucket, config.folder())
            }
        }))
    }
}

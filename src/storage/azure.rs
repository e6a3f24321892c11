//! Azure Blob Storage backend

use super::{client_options, root_path, Location, Stager, StorageBackend, WriteRequest};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::types::{FileStoreKind, JsonValue};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use object_store::azure::MicrosoftAzureBuilder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use reqwest::Method;
use serde_json::json;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, info};

type HmacSha256 = Hmac<Sha256>;

/// Blob service REST version used for container creation
const BLOB_API_VERSION: &str = "2021-08-06";

/// Base64 HMAC-SHA256 of `string_to_sign` under a base64 account key
pub fn shared_key_signature(account_key: &str, string_to_sign: &str) -> Result<String> {
    let key = STANDARD
        .decode(account_key)
        .map_err(|e| Error::write(format!("Azure access key is not valid base64: {e}")))?;
    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| Error::write(format!("Invalid Azure access key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// String-to-sign for an empty-bodied "Create Container" request
fn create_container_string_to_sign(account: &str, container: &str, date: &str) -> String {
    // VERB, then eleven standard headers (all empty here), then the
    // canonicalized x-ms headers and resource
    format!(
        "PUT\n\n\n\n\n\n\n\n\n\n\n\nx-ms-date:{date}\nx-ms-version:{BLOB_API_VERSION}\n/{account}/{container}\nrestype:container"
    )
}

/// Ensures the container exists, then uploads with the account key
#[derive(Debug)]
pub struct AzureBackend {
    stager: Stager,
    http: HttpClient,
    timeout: Duration,
    blob_endpoint: Option<String>,
}

impl AzureBackend {
    pub fn new(stager: Stager, timeout: Duration) -> Result<Self> {
        let http = HttpClient::with_config(
            HttpClientConfig::builder()
                .timeout(timeout)
                .max_retries(0)
                .build(),
        )?;
        Ok(Self {
            stager,
            http,
            timeout,
            blob_endpoint: None,
        })
    }

    /// Send container requests to `endpoint` instead of `https://{account}.blob.core.windows.net`
    #[must_use]
    pub fn with_blob_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.blob_endpoint = Some(endpoint.into());
        self
    }

    fn container_url(&self, account: &str, container: &str) -> String {
        match &self.blob_endpoint {
            Some(endpoint) => format!("{}/{container}", endpoint.trim_end_matches('/')),
            None => format!("https://{account}.blob.core.windows.net/{container}"),
        }
    }

    /// Create the container if it does not exist yet
    ///
    /// `409 ContainerAlreadyExists` counts as success.
    pub async fn ensure_container(&self, account: &str, key: &str, container: &str) -> Result<()> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let signature =
            shared_key_signature(key, &create_container_string_to_sign(account, container, &date))?;

        let request = RequestConfig::new()
            .query("restype", "container")
            .header("x-ms-date", date)
            .header("x-ms-version", BLOB_API_VERSION)
            .header("Authorization", format!("SharedKey {account}:{signature}"))
            .bytes(bytes::Bytes::new());

        match self
            .http
            .request(Method::PUT, &self.container_url(account, container), request)
            .await
        {
            Ok(_) => {
                info!(account, container, "Created Azure container");
                Ok(())
            }
            Err(Error::HttpStatus { status: 409, .. }) => {
                debug!(account, container, "Azure container already exists");
                Ok(())
            }
            Err(e) => Err(Error::write(format!(
                "Failed to create Azure container {container}: {e}"
            ))),
        }
    }
}

/// Container name for a stream (Azure requires lower case)
fn container_name(config: &StreamConfig) -> Result<String> {
    Ok(config
        .require(&config.bucket_name, "bucket_name")?
        .to_lowercase())
}

#[async_trait]
impl StorageBackend for AzureBackend {
    fn kind(&self) -> FileStoreKind {
        FileStoreKind::Azure
    }

    async fn write(&self, request: &WriteRequest<'_>) -> Result<Location> {
        let config = request.config;
        let account =
            config.require(&config.azure_storage_account_name, "azure_storage_account_name")?;
        let access_key =
            config.require(&config.azure_storage_access_key, "azure_storage_access_key")?;
        let container = container_name(config)?;

        self.ensure_container(account, access_key, &container).await?;

        let store = MicrosoftAzureBuilder::new()
            .with_account(account)
            .with_access_key(access_key)
            .with_container_name(&container)
            .with_client_options(client_options(self.timeout))
            .build()
            .map_err(|e| Error::write(format!("Failed to create Azure client: {e}")))?;

        let staged = self.stager.stage(request).await?;
        let key = request.path.key();
        let data = staged.read().await?;

        store
            .put(&ObjectPath::from(key.as_str()), PutPayload::from(data))
            .await
            .map_err(|e| Error::write(format!("Azure upload to {container}/{key} failed: {e}")))?;

        info!(stream_id = %config.stream_id, container = %container, key = %key, "Uploaded to Azure");
        Ok(Location {
            kind: FileStoreKind::Azure,
            uri: format!("azure://{account}.blob.core.windows.net/{container}/{key}"),
            container: Some(container),
            key,
        })
    }

    fn catalog_source(&self, config: &StreamConfig) -> Result<JsonValue> {
        let container = container_name(config)?;
        Ok(json!({
            "type": "AZURE_STORAGE",
            "config": {
                "accountKind": "STORAGE_V2",
                "accountName": config.require(&config.azure_storage_account_name, "azure_storage_account_name")?,
                "accessKey": config.require(&config.azure_storage_access_key, "azure_storage_access_key")?,
                "credentialsType": "ACCESS_KEY",
                "enableSSL": true,
                "rootPath": root_path(&container, config.folder())
            }
        }))
    }
}

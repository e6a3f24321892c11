//! HDFS backend over WebHDFS
//!
//! File creation follows the two-step WebHDFS protocol: the namenode
//! answers `CREATE`/`APPEND` with a `307` pointing at a datanode, and the
//! data goes to that location.

use super::{Location, Stager, StorageBackend, WriteRequest, DatasetRegistration};
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::types::{FileStoreKind, JsonValue};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Method, Response};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

/// Default namenode HTTP port
pub const DEFAULT_NAMENODE_PORT: u16 = 9870;

/// Writes staged files to HDFS through the namenode's REST API
#[derive(Debug)]
pub struct HdfsBackend {
    stager: Stager,
    http: HttpClient,
    user: Option<String>,
}

impl HdfsBackend {
    pub fn new(stager: Stager, timeout: Duration, user: Option<String>) -> Result<Self> {
        let http = HttpClient::with_config(HttpClientConfig::builder().timeout(timeout).build())?;
        Ok(Self { stager, http, user })
    }

    fn namenode(config: &StreamConfig) -> Result<(String, u16)> {
        let host = config.require(&config.namenode_host, "namenode_host")?;
        Ok((host.to_string(), config.namenode_port.unwrap_or(DEFAULT_NAMENODE_PORT)))
    }

    fn op(&self, op: &str) -> RequestConfig {
        let request = RequestConfig::new().query("op", op);
        match &self.user {
            Some(user) => request.query("user.name", user.as_str()),
            None => request,
        }
    }

    /// Whether `url` names an existing file or directory
    async fn exists(&self, url: &str) -> Result<bool> {
        match self.http.get_with_config(url, self.op("GETFILESTATUS")).await {
            Ok(_) => Ok(true),
            Err(Error::HttpStatus { status: 404, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Create `url` and its parents unless it already exists
    async fn ensure_directory(&self, url: &str) -> Result<()> {
        if self.exists(url).await? {
            return Ok(());
        }
        let body: JsonValue = self
            .http
            .request_json(Method::PUT, url, self.op("MKDIRS"))
            .await?;
        if body.get("boolean").and_then(JsonValue::as_bool) != Some(true) {
            return Err(Error::write(format!("MKDIRS refused for {url}: {body}")));
        }
        debug!("Created HDFS directory {url}");
        Ok(())
    }

    /// Namenode half of a two-step call; returns the datanode location
    async fn redirect_target(&self, method: Method, url: &str, request: RequestConfig) -> Result<String> {
        let response = self.http.request(method, url, request).await?;
        let location = location_header(&response)
            .ok_or_else(|| Error::write(format!("WebHDFS did not redirect {url}")))?;
        // Datanode targets must be absolute
        Ok(url::Url::parse(&location)?.into())
    }

    /// Create an empty file, then append the data and flush it
    async fn create_and_append(&self, url: &str, data: Vec<u8>) -> Result<()> {
        let create = self
            .redirect_target(Method::PUT, url, self.op("CREATE").query("overwrite", "false"))
            .await?;
        self.http
            .request(Method::PUT, &create, RequestConfig::new().bytes(Bytes::new()))
            .await?;

        let append = self
            .redirect_target(Method::POST, url, self.op("APPEND"))
            .await?;
        self.http
            .request(
                Method::POST,
                &append,
                RequestConfig::new()
                    .header("Content-Type", "application/octet-stream")
                    .bytes(Bytes::from(data)),
            )
            .await?;
        Ok(())
    }
}

fn location_header(response: &Response) -> Option<String> {
    if !response.status().is_redirection() {
        return None;
    }
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl StorageBackend for HdfsBackend {
    fn kind(&self) -> FileStoreKind {
        FileStoreKind::Hdfs
    }

    async fn write(&self, request: &WriteRequest<'_>) -> Result<Location> {
        let config = request.config;
        let (host, port) = Self::namenode(config)?;
        let base = format!("http://{host}:{port}/webhdfs/v1");
        let directory = request.path.directory();
        let key = request.path.key();

        let staged = self.stager.stage(request).await?;
        let data = staged.read().await?;

        let transfer = async {
            self.ensure_directory(&format!("{base}/{directory}")).await?;
            self.create_and_append(&format!("{base}/{key}"), data).await
        };
        transfer
            .await
            .map_err(|e| Error::write(format!("HDFS write to {key} failed: {e}")))?;

        info!(stream_id = %config.stream_id, namenode = %host, key = %key, "Wrote to HDFS");
        Ok(Location {
            kind: FileStoreKind::Hdfs,
            uri: format!("hdfs://{host}:{port}/{key}"),
            container: None,
            key,
        })
    }

    fn catalog_source(&self, config: &StreamConfig) -> Result<JsonValue> {
        let (host, port) = Self::namenode(config)?;
        Ok(json!({
            "type": "HDFS",
            "config": {
                "hostname": host,
                "port": port,
                "enableImpersonation": false,
                "rootPath": format!("/{}", config.folder())
            }
        }))
    }

    fn dataset_registration(&self) -> DatasetRegistration {
        DatasetRegistration::FolderFormat
    }
}

//! Dremio catalog client
//!
//! Self-hosted Dremio serves login and folder-format calls under `/apiv2`
//! and the catalog under `/api/v3`. Dremio Cloud serves everything under
//! `/v0/projects/{project_id}` and takes a bearer token.

use crate::auth::AuthConfig;
use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::settings::DremioSettings;
use crate::storage::{DatasetRegistration, StorageBackend};
use crate::types::JsonValue;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

const CATALOG: &str = "dremio";

/// One entry of a catalog listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub path: Vec<String>,
    /// `CONTAINER`, `DATASET` or `FILE`
    #[serde(rename = "type", default)]
    pub entry_type: String,
    #[serde(default)]
    pub container_type: Option<String>,
    #[serde(default)]
    pub dataset_type: Option<String>,
}

impl CatalogEntry {
    /// Last path element
    pub fn name(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }

    pub fn is_source(&self) -> bool {
        self.container_type.as_deref() == Some("SOURCE")
    }

    pub fn is_dataset(&self) -> bool {
        self.entry_type == "DATASET"
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    data: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct Container {
    #[serde(default)]
    children: Vec<CatalogEntry>,
}

/// What an `update_catalog` call changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogUpdate {
    pub source_created: bool,
    pub dataset_created: bool,
    /// Dataset missing but left to `mark_folder_format` (HDFS)
    pub dataset_deferred: bool,
}

impl CatalogUpdate {
    /// Whether the call changed nothing
    pub fn is_noop(&self) -> bool {
        !self.source_created && !self.dataset_created
    }
}

/// REST client for one Dremio deployment
#[derive(Debug)]
pub struct DremioClient {
    http: HttpClient,
    v3_prefix: &'static str,
    v2_prefix: &'static str,
}

impl DremioClient {
    /// Self-hosted Dremio at `base_url` (`http://host:port`), session login
    pub fn self_hosted(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let auth = AuthConfig::Session {
            login_url: format!("{}/apiv2/login", base_url.trim_end_matches('/')),
            login_body: json!({
                "userName": username.into(),
                "password": password.into()
            }),
            token_pointer: "/token".to_string(),
            token_header: "Authorization".to_string(),
            token_prefix: Some("_dremio".to_string()),
        };
        let http = HttpClient::with_auth(Self::http_config(base_url, timeout), auth)?;
        Ok(Self {
            http,
            v3_prefix: "api/v3",
            v2_prefix: "apiv2",
        })
    }

    /// Dremio Cloud project, bearer token
    pub fn cloud(
        cloud_url: &str,
        project_id: &str,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let base_url = format!("{}/v0/projects/{project_id}", cloud_url.trim_end_matches('/'));
        let auth = AuthConfig::Bearer {
            token: token.into(),
        };
        let http = HttpClient::with_auth(Self::http_config(base_url, timeout), auth)?;
        Ok(Self {
            http,
            v3_prefix: "",
            v2_prefix: "",
        })
    }

    /// Build from process settings
    pub fn from_settings(settings: &DremioSettings, timeout: Duration) -> Result<Self> {
        if settings.is_cloud() {
            let token = settings
                .cloud_token
                .clone()
                .ok_or_else(|| Error::settings("Dremio Cloud needs a cloud_token"))?;
            let project = settings.cloud_project_id.as_deref().unwrap_or_default();
            Self::cloud(&settings.cloud_url, project, token, timeout)
        } else {
            Self::self_hosted(
                format!("http://{}:{}", settings.host, settings.port),
                settings.username.clone().unwrap_or_default(),
                settings.password.clone().unwrap_or_default(),
                timeout,
            )
        }
    }

    fn http_config(base_url: String, timeout: Duration) -> HttpClientConfig {
        HttpClientConfig::builder()
            .base_url(base_url)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .build()
    }

    fn v3(&self, path: &str) -> String {
        join_path(self.v3_prefix, path)
    }

    fn v2(&self, path: &str) -> String {
        join_path(self.v2_prefix, path)
    }

    /// Log in once; the session token is reused for the process lifetime
    pub async fn login(&self) -> Result<()> {
        match self.http.authenticator() {
            Some(auth) => auth.login().await,
            None => Ok(()),
        }
    }

    /// All catalog sources
    pub async fn list_sources(&self) -> Result<Vec<CatalogEntry>> {
        let listing: Listing = self.http.get_json(&self.v3("catalog")).await?;
        Ok(listing.data.into_iter().filter(CatalogEntry::is_source).collect())
    }

    /// Create a source named `name` from a backend definition (`type` + `config`)
    pub async fn create_source(&self, name: &str, definition: &JsonValue) -> Result<CatalogEntry> {
        let body = json!({
            "entityType": "source",
            "name": name,
            "type": definition["type"],
            "config": definition["config"],
        });
        self.http.post_json(&self.v3("catalog"), body).await
    }

    /// Children of a container
    pub async fn children(&self, id: &str) -> Result<Vec<CatalogEntry>> {
        let container: Container = self
            .http
            .get_json(&self.v3(&format!("catalog/{}", encode_id(id))))
            .await?;
        Ok(container.children)
    }

    /// Promote the folder at `path` to a Parquet physical dataset
    pub async fn create_dataset(&self, id: &str, path: &[&str]) -> Result<()> {
        let body = json!({
            "entityType": "dataset",
            "id": id,
            "path": path,
            "type": "PHYSICAL_DATASET",
            "format": {"type": "Parquet"}
        });
        self.http
            .request(
                Method::POST,
                &self.v3(&format!("catalog/{}", encode_id(id))),
                RequestConfig::new().json(body),
            )
            .await?;
        Ok(())
    }

    /// Mark `source/folder` as Parquet through the legacy folder-format call
    ///
    /// Used for backends whose datasets are not promoted through `/catalog`.
    pub async fn mark_folder_format(&self, source: &str, folder: &str) -> Result<()> {
        let path = format!(
            "source/{}/folder_format/{}",
            encode_id(source),
            encode_id(folder)
        );
        self.http
            .request(
                Method::PUT,
                &self.v2(&path),
                RequestConfig::new().json(json!({"type": "Parquet"})),
            )
            .await
            .map_err(|e| Error::catalog(CATALOG, format!("folder format for {source}/{folder}: {e}")))?;
        info!(source, folder, "Marked Dremio folder as Parquet");
        Ok(())
    }

    /// Make sure the stream's source and the message type's dataset exist
    ///
    /// Existence is checked before every create, so repeating the call for
    /// the same stream and message type sends no mutating request. Datasets
    /// of `FolderFormat` backends are reported as deferred, not created.
    pub async fn update_catalog(
        &self,
        message_type: &str,
        backend: &dyn StorageBackend,
        config: &StreamConfig,
    ) -> Result<CatalogUpdate> {
        self.update_catalog_inner(message_type, backend, config)
            .await
            .map_err(|e| match e {
                Error::CatalogSync { .. } => e,
                other => Error::catalog(CATALOG, other.to_string()),
            })
    }

    async fn update_catalog_inner(
        &self,
        message_type: &str,
        backend: &dyn StorageBackend,
        config: &StreamConfig,
    ) -> Result<CatalogUpdate> {
        let stream_id = config.stream_id.as_str();
        let mut update = CatalogUpdate::default();

        let existing = self
            .list_sources()
            .await?
            .into_iter()
            .find(|s| s.name() == stream_id);

        // A freshly created source has no datasets yet
        let folder = match existing {
            Some(source) => {
                let children = self.children(&source.id).await?;
                let folder = children.into_iter().find(|c| c.name() == message_type);
                if folder.as_ref().is_some_and(CatalogEntry::is_dataset) {
                    debug!(stream_id, message_type, "Dremio dataset already registered");
                    return Ok(update);
                }
                folder
            }
            None => {
                let definition = backend.catalog_source(config)?;
                self.create_source(stream_id, &definition).await?;
                info!(stream_id, backend = %backend.kind(), "Created Dremio source");
                update.source_created = true;
                None
            }
        };

        if backend.dataset_registration() == DatasetRegistration::FolderFormat {
            update.dataset_deferred = true;
            return Ok(update);
        }

        let id = folder.map_or_else(|| dataset_id(stream_id, message_type), |f| f.id);
        self.create_dataset(&id, &[stream_id, message_type]).await?;
        info!(stream_id, message_type, "Registered Dremio dataset");
        update.dataset_created = true;
        Ok(update)
    }
}

/// Catalog id of a not-yet-promoted folder
fn dataset_id(source: &str, folder: &str) -> String {
    format!("dremio:/{source}/{folder}")
}

fn encode_id(id: &str) -> String {
    utf8_percent_encode(id, NON_ALPHANUMERIC).to_string()
}

fn join_path(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        format!("/{path}")
    } else {
        format!("/{prefix}/{path}")
    }
}

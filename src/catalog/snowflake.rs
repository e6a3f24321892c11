//! Snowflake sync
//!
//! Schema, stage and external table are created with `IF NOT EXISTS` DDL
//! sent as one multi-statement request, so repeating a sync is harmless.

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::types::FileStoreKind;
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

const CATALOG: &str = "snowflake";

/// An open SQL session
#[async_trait]
pub trait SqlSession: Send + Sync {
    /// Run one or more `;`-separated statements
    async fn execute(&self, sql: &str) -> Result<()>;
}

/// Opens sessions with a stream's Snowflake credentials
#[async_trait]
pub trait SnowflakeConnector: Send + Sync {
    async fn connect(&self, config: &StreamConfig) -> Result<Box<dyn SqlSession>>;
}

/// Upper-cased identifier with everything outside `[A-Za-z0-9_]` replaced
pub fn sanitize_identifier(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out.to_ascii_uppercase()
}

/// SQL string literal
fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// External stages and tables for S3 and Azure streams
pub struct SnowflakeSync {
    connector: Arc<dyn SnowflakeConnector>,
}

impl SnowflakeSync {
    pub fn new(connector: Arc<dyn SnowflakeConnector>) -> Self {
        Self { connector }
    }

    /// The DDL for one stream and message type, in execution order
    pub fn statements(
        config: &StreamConfig,
        kind: FileStoreKind,
        message_type: &str,
    ) -> Result<Vec<String>> {
        let database = sanitize_identifier(
            config.require(&config.snowflake_database, "snowflake_database")?,
        );
        let schema = format!("{database}.{}", sanitize_identifier(&config.stream_id));
        let table = format!("{schema}.{}", sanitize_identifier(message_type));
        let stage = format!("{table}_STAGE");
        let prefix = super::message_type_prefix(config, message_type);
        let bucket = config.require(&config.bucket_name, "bucket_name")?;

        let (url, credentials) = match kind {
            FileStoreKind::S3 => (
                format!("s3://{bucket}/{prefix}"),
                format!(
                    "AWS_KEY_ID={} AWS_SECRET_KEY={}",
                    literal(config.require(&config.aws_access_key_id, "aws_access_key_id")?),
                    literal(config.require(&config.aws_secret_access_key, "aws_secret_access_key")?)
                ),
            ),
            FileStoreKind::Azure => {
                let account = config
                    .require(&config.azure_storage_account_name, "azure_storage_account_name")?;
                let sas = config.require(&config.azure_sas_token, "azure_sas_token")?;
                (
                    format!(
                        "azure://{account}.blob.core.windows.net/{}/{prefix}",
                        bucket.to_lowercase()
                    ),
                    format!("AZURE_SAS_TOKEN={}", literal(sas)),
                )
            }
            other => {
                return Err(Error::catalog(
                    CATALOG,
                    format!("no external stage support for {other} streams"),
                ))
            }
        };

        Ok(vec![
            format!("CREATE SCHEMA IF NOT EXISTS {schema}"),
            format!(
                "CREATE STAGE IF NOT EXISTS {stage} URL={} CREDENTIALS=({credentials}) FILE_FORMAT=(TYPE=PARQUET)",
                literal(&url)
            ),
            format!(
                "CREATE EXTERNAL TABLE IF NOT EXISTS {table} WITH LOCATION=@{stage} AUTO_REFRESH=FALSE FILE_FORMAT=(TYPE=PARQUET)"
            ),
        ])
    }

    /// Open a session and run the DDL batch
    pub async fn sync(
        &self,
        config: &StreamConfig,
        kind: FileStoreKind,
        message_type: &str,
    ) -> Result<()> {
        let statements = Self::statements(config, kind, message_type)?;
        let session = self.connector.connect(config).await?;
        session.execute(&statements.join(";\n")).await?;
        info!(stream_id = %config.stream_id, message_type, "Snowflake external table in place");
        Ok(())
    }
}

impl std::fmt::Debug for SnowflakeSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnowflakeSync").finish_non_exhaustive()
    }
}

// ============================================================================
// REST Session
// ============================================================================

#[derive(Debug, Deserialize)]
struct SnowflakeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

impl SnowflakeResponse {
    fn into_result(self, action: &str) -> Result<Option<serde_json::Value>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(Error::catalog(
                CATALOG,
                format!("{action}: {}", self.message.unwrap_or_default()),
            ))
        }
    }
}

/// Logs in over Snowflake's REST session protocol
#[derive(Debug, Clone)]
pub struct RestSnowflakeConnector {
    timeout: Duration,
    endpoint: Option<String>,
}

impl RestSnowflakeConnector {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            endpoint: None,
        }
    }

    /// Send every request to `endpoint` instead of the account URL
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn base_url(&self, account: &str) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{account}.snowflakecomputing.com"))
    }
}

#[async_trait]
impl SnowflakeConnector for RestSnowflakeConnector {
    async fn connect(&self, config: &StreamConfig) -> Result<Box<dyn SqlSession>> {
        let account = config.require(&config.snowflake_account, "snowflake_account")?;
        let user = config.require(&config.snowflake_username, "snowflake_username")?;
        let password = config.require(&config.snowflake_password, "snowflake_password")?;

        let http = HttpClient::with_config(
            HttpClientConfig::builder()
                .base_url(self.base_url(account))
                .timeout(self.timeout)
                .header("Accept", "application/json")
                .build(),
        )?;

        let mut login = RequestConfig::new()
            .query("requestId", Uuid::new_v4().to_string())
            .json(json!({
                "data": {
                    "ACCOUNT_NAME": account,
                    "LOGIN_NAME": user,
                    "PASSWORD": password,
                    "CLIENT_APP_ID": env!("CARGO_PKG_NAME"),
                    "CLIENT_APP_VERSION": env!("CARGO_PKG_VERSION")
                }
            }));
        if let Some(database) = config.snowflake_database.as_deref() {
            login = login.query("databaseName", database);
        }
        if let Some(warehouse) = config.snowflake_warehouse.as_deref() {
            login = login.query("warehouse", warehouse);
        }

        let response: SnowflakeResponse = http
            .request_json(Method::POST, "/session/v1/login-request", login)
            .await
            .map_err(|e| Error::catalog(CATALOG, format!("login: {e}")))?;
        let token = response
            .into_result("login")?
            .as_ref()
            .and_then(|data| data.get("token"))
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::catalog(CATALOG, "login response without a token"))?;

        debug!(account, "Snowflake session opened");
        Ok(Box::new(RestSession { http, token }))
    }
}

/// A logged-in REST session
pub struct RestSession {
    http: HttpClient,
    token: String,
}

#[async_trait]
impl SqlSession for RestSession {
    async fn execute(&self, sql: &str) -> Result<()> {
        let request = RequestConfig::new()
            .query("requestId", Uuid::new_v4().to_string())
            .header("Authorization", format!("Snowflake Token=\"{}\"", self.token))
            .json(json!({
                "sqlText": sql,
                "asyncExec": false,
                "sequenceId": 1,
                "parameters": {"MULTI_STATEMENT_COUNT": 0}
            }));
        let response: SnowflakeResponse = self
            .http
            .request_json(Method::POST, "/queries/v1/query-request", request)
            .await
            .map_err(|e| Error::catalog(CATALOG, format!("query: {e}")))?;
        response.into_result("query")?;
        Ok(())
    }
}

//! Process settings
//!
//! Layered: built-in defaults, then an optional YAML file, then environment
//! variables. These are distinct from per-stream `StreamConfig` records.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default Dremio Cloud API endpoint
pub const DEFAULT_DREMIO_CLOUD_URL: &str = "https://api.dremio.cloud";

/// Default Glue crawler schedule (daily at midnight)
pub const DEFAULT_CRAWLER_SCHEDULE: &str = "cron(0 0 * * ? *)";

/// Top-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding `configs/` and `constants/`
    pub config_dir: Option<PathBuf>,
    /// Config service base URL (wins over `config_dir`)
    pub config_service_url: Option<String>,
    /// Root for the local backend
    pub datastore_dir: PathBuf,
    /// Where files are staged before upload (OS temp dir when unset)
    pub staging_dir: Option<PathBuf>,
    /// Timeout applied to every outbound call
    pub request_timeout_secs: u64,
    pub dremio: Option<DremioSettings>,
    pub glue: GlueSettings,
    pub snowflake: SnowflakeSettings,
    /// Webhook receiving every processed payload
    pub egress_url: Option<String>,
    /// User name passed to WebHDFS
    pub hdfs_user: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_dir: None,
            config_service_url: None,
            datastore_dir: PathBuf::from("datastore"),
            staging_dir: None,
            request_timeout_secs: 50,
            dremio: None,
            glue: GlueSettings::default(),
            snowflake: SnowflakeSettings::default(),
            egress_url: None,
            hdfs_user: None,
        }
    }
}

/// Dremio connection, self-hosted or cloud
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DremioSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Set for Dremio Cloud deployments
    pub cloud_project_id: Option<String>,
    pub cloud_token: Option<String>,
    pub cloud_url: String,
}

impl Default for DremioSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9047,
            username: None,
            password: None,
            cloud_project_id: None,
            cloud_token: None,
            cloud_url: DEFAULT_DREMIO_CLOUD_URL.to_string(),
        }
    }
}

impl DremioSettings {
    /// Whether this points at Dremio Cloud
    pub fn is_cloud(&self) -> bool {
        self.cloud_project_id.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Defaults for Glue crawlers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlueSettings {
    /// IAM role used when a stream does not name one
    pub default_role: Option<String>,
    pub default_schedule: String,
}

impl Default for GlueSettings {
    fn default() -> Self {
        Self {
            default_role: None,
            default_schedule: DEFAULT_CRAWLER_SCHEDULE.to_string(),
        }
    }
}

/// Snowflake connection overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowflakeSettings {
    /// Replaces `https://{account}.snowflakecomputing.com`
    pub endpoint: Option<String>,
}

impl Settings {
    /// Load settings from an optional YAML file plus the process environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Parse a YAML settings file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::settings(format!("Failed to read {}: {e}", path.display())))?;
        Self::from_yaml(&contents)
    }

    /// Parse YAML settings
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(dir) = var("RTDL_CONFIG_DIR") {
            self.config_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = var("RTDL_CONFIG_SERVICE_URL") {
            self.config_service_url = Some(url);
        }
        if let Some(dir) = var("RTDL_DATASTORE_DIR") {
            self.datastore_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("RTDL_STAGING_DIR") {
            self.staging_dir = Some(PathBuf::from(dir));
        }
        if let Some(url) = var("RTDL_EGRESS_URL") {
            self.egress_url = Some(url);
        }
        if let Some(secs) = var("RTDL_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = secs.parse().map_err(|_| {
                Error::settings(format!("RTDL_REQUEST_TIMEOUT_SECS is not a number: {secs}"))
            })?;
        }
        if let Some(user) = var("RTDL_HDFS_USER") {
            self.hdfs_user = Some(user);
        }
        if let Some(role) = var("RTDL_GLUE_ROLE") {
            self.glue.default_role = Some(role);
        }

        let dremio_keys = [
            "DREMIO_HOST",
            "DREMIO_PORT",
            "DREMIO_USERNAME",
            "DREMIO_PASSWORD",
            "DREMIO_CLOUD_PROJECT_ID",
            "DREMIO_CLOUD_TOKEN",
            "DREMIO_CLOUD_URL",
        ];
        if dremio_keys.iter().any(|key| var(key).is_some()) {
            let dremio = self.dremio.get_or_insert_with(DremioSettings::default);
            if let Some(host) = var("DREMIO_HOST") {
                dremio.host = host;
            }
            if let Some(port) = var("DREMIO_PORT") {
                dremio.port = port.parse().map_err(|_| {
                    Error::settings(format!("DREMIO_PORT is not a valid port: {port}"))
                })?;
            }
            if let Some(user) = var("DREMIO_USERNAME") {
                dremio.username = Some(user);
            }
            if let Some(password) = var("DREMIO_PASSWORD") {
                dremio.password = Some(password);
            }
            if let Some(project) = var("DREMIO_CLOUD_PROJECT_ID") {
                dremio.cloud_project_id = Some(project);
            }
            if let Some(token) = var("DREMIO_CLOUD_TOKEN") {
                dremio.cloud_token = Some(token);
            }
            if let Some(url) = var("DREMIO_CLOUD_URL") {
                dremio.cloud_url = url;
            }
        }

        Ok(())
    }

    /// Timeout for every outbound call
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Staging directory, falling back to the OS temp dir
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Check that a config source is configured
    pub fn validate(&self) -> Result<()> {
        if self.config_dir.is_none() && self.config_service_url.is_none() {
            return Err(Error::settings(
                "no config source: set config_dir or config_service_url",
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::settings("request_timeout_secs must be positive"));
        }
        Ok(())
    }
}

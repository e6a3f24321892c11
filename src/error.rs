//! Error types for the ingest service
//!
//! All public APIs return `Result<T, Error>` where Error is defined here.
//! The variants mirror how a failure is treated by the pipeline: startup
//! failures abort the process, per-message failures drop or fail only the
//! message at hand.

use thiserror::Error;

/// The main error type for the ingest service
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Failed to load stream configuration: {message}")]
    ConfigLoad { message: String },

    #[error("Invalid settings: {message}")]
    Settings { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    // ============================================================================
    // Message Errors
    // ============================================================================
    #[error("No stream configuration matches stream_id={stream_id:?} stream_alt_id={stream_alt_id:?}")]
    NoMatchingConfig {
        stream_id: Option<String>,
        stream_alt_id: Option<String>,
    },

    #[error("Stream '{stream_id}' is not active")]
    StreamInactive { stream_id: String },

    #[error("Malformed message: {message}")]
    MalformedMessage { message: String },

    // ============================================================================
    // Write Errors
    // ============================================================================
    #[error("Write failed: {message}")]
    Write { message: String },

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    // ============================================================================
    // Catalog Errors
    // ============================================================================
    #[error("Catalog sync failed ({catalog}): {message}")]
    CatalogSync { catalog: String, message: String },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    // ============================================================================
    // HTTP Errors
    // ============================================================================
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ============================================================================
    // I/O Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ============================================================================
    // Generic Errors
    // ============================================================================
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a config load error
    pub fn config_load(message: impl Into<String>) -> Self {
        Self::ConfigLoad {
            message: message.into(),
        }
    }

    /// Create a settings error
    pub fn settings(message: impl Into<String>) -> Self {
        Self::Settings {
            message: message.into(),
        }
    }

    /// Create a malformed message error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
        }
    }

    /// Create a write error
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }

    /// Create a catalog sync error for the named catalog
    pub fn catalog(catalog: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CatalogSync {
            catalog: catalog.into(),
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    /// Whether this error means "drop the message and keep going"
    ///
    /// Dropped messages are logged, never retried by the pipeline and never
    /// abort the process.
    pub fn is_dropped_message(&self) -> bool {
        matches!(
            self,
            Error::NoMatchingConfig { .. }
                | Error::StreamInactive { .. }
                | Error::MalformedMessage { .. }
        )
    }

    /// Whether this error happened while persisting the data file
    pub fn is_write_failure(&self) -> bool {
        matches!(
            self,
            Error::Write { .. }
                | Error::Arrow(_)
                | Error::Parquet(_)
                | Error::ObjectStore(_)
                | Error::Io(_)
        )
    }
}

/// Result type alias for the ingest service
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}

//! HTTP client module
//!
//! Provides the HTTP client shared by every REST collaborator (catalog,
//! config service, WebHDFS, Azure container API, Snowflake).
//!
//! # Features
//!
//! - **Timeouts**: One configured timeout bounds every outbound call
//! - **Retries**: Idempotent reads retry with exponential backoff
//! - **Authentication**: Integration with auth module

mod client;

pub use client::{HttpClient, HttpClientConfig, RequestConfig};

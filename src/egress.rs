//! Egress sinks
//!
//! Every processed payload is forwarded downstream, whether or not its
//! write succeeded. Sinks are best effort: the pipeline logs their errors
//! and moves on.

use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Method;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Downstream destination for processed payloads
#[async_trait]
pub trait EgressSink: Send + Sync {
    async fn publish(&self, payload: Bytes) -> Result<()>;
}

/// Logs each payload
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEgress;

#[async_trait]
impl EgressSink for LogEgress {
    async fn publish(&self, payload: Bytes) -> Result<()> {
        info!(bytes = payload.len(), "egress: {}", String::from_utf8_lossy(&payload));
        Ok(())
    }
}

/// POSTs each payload to a webhook
#[derive(Debug)]
pub struct HttpEgress {
    http: HttpClient,
    url: String,
}

impl HttpEgress {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = HttpClient::with_config(
            HttpClientConfig::builder()
                .timeout(timeout)
                .max_retries(0)
                .build(),
        )?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl EgressSink for HttpEgress {
    async fn publish(&self, payload: Bytes) -> Result<()> {
        self.http
            .request(
                Method::POST,
                &self.url,
                RequestConfig::new()
                    .header("Content-Type", "application/json")
                    .bytes(payload),
            )
            .await?;
        Ok(())
    }
}

/// Sends each payload into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelEgress {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelEgress {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }

    /// A sink plus the receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EgressSink for ChannelEgress {
    async fn publish(&self, payload: Bytes) -> Result<()> {
        self.tx
            .send(payload)
            .await
            .map_err(|_| Error::Other("egress channel closed".to_string()))
    }
}

//! HTTP adapter for the remote batch processing API.
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::model::{Record, Verdict};

pub mod model;

pub use model::{WireRecord, WireVerdict};

/// Failure to obtain a well-formed verdict list. Always retryable.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("processing API timed out: {0}")]
    Timeout(#[source] reqwest::Error),
    #[error("failed to reach processing API: {0}")]
    Request(#[source] reqwest::Error),
    #[error("processing API returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("invalid processing API response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout(err)
        } else {
            TransportError::Request(err)
        }
    }
}

/// Submits one batch and returns the per-record verdicts. The verdict list
/// may be shorter or longer than the batch.
#[async_trait]
pub trait ProcessingService: Send + Sync {
    async fn submit(&self, batch: &[Record]) -> Result<Vec<Verdict>, TransportError>;
}

#[derive(Clone)]
pub struct ProcessingClient {
    http: Client,
    endpoint: Url,
}

impl fmt::Debug for ProcessingClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ProcessingClient {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .user_agent("form-batcher/0.1")
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, endpoint })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let endpoint = Url::parse(cfg.processing.endpoint.trim())
            .context("invalid processing endpoint")?;
        Self::new(endpoint, cfg.processing_timeout())
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn build_request(&self, body: &[WireRecord]) -> Result<reqwest::Request, TransportError> {
        let request = self
            .http
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .json(body)
            .build()?;
        Ok(request)
    }

    pub async fn submit_batch(&self, batch: &[Record]) -> Result<Vec<Verdict>, TransportError> {
        let payload: Vec<WireRecord> = batch.iter().map(WireRecord::from).collect();
        debug!(
            "Sending payload: {}",
            serde_json::to_string(&payload).unwrap_or_else(|_| format!("{:?}", payload))
        );
        let request = self.build_request(&payload)?;
        info!(url = %request.url(), records = payload.len(), "submitting batch");

        let res = self.http.execute(request).await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            warn!(%status, %body, "processing API error");
            return Err(TransportError::Status { status, body });
        }

        let body = res.text().await?;
        info!("Received response: {}", body);
        decode_verdicts(&body)
    }
}

#[async_trait]
impl ProcessingService for ProcessingClient {
    async fn submit(&self, batch: &[Record]) -> Result<Vec<Verdict>, TransportError> {
        self.submit_batch(batch).await
    }
}

/// Strict decode of a response body: a JSON array of `{id, status}` objects.
/// Anything else is a transport failure.
pub fn decode_verdicts(body: &str) -> Result<Vec<Verdict>, TransportError> {
    let wire: Vec<WireVerdict> = serde_json::from_str(body)?;
    Ok(wire.into_iter().map(Verdict::from).collect())
}

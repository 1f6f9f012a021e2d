//! HTTP transport for config fetches and query relays.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::StatusCode;
use thiserror::Error;

use crate::config::TimeoutConfig;
use crate::constants::USER_AGENT;
use crate::http::request::HttpRequestSpec;
use crate::observability::metrics;

/// Errors produced while building or executing a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The URL could not be built; nothing was sent.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connection, DNS or timeout failure below HTTP.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with something other than 200.
    #[error("HTTP error status {0}")]
    Status(u16),

    /// A 200 response without a usable body.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Thin wrapper over a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct RelayClient {
    inner: reqwest::Client,
}

impl RelayClient {
    /// Build a client with the configured connect and request timeouts.
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, HttpError> {
        let inner = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.request_secs))
            .user_agent(USER_AGENT)
            // The oblivious proxy is the only intermediary we want.
            .no_proxy()
            .build()
            .map_err(|e| HttpError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { inner })
    }

    /// Execute one request and return the response body.
    pub async fn send(&self, spec: &HttpRequestSpec) -> Result<Bytes, HttpError> {
        let start = Instant::now();
        let kind = spec.kind.as_str();

        let mut request = self
            .inner
            .request(spec.method.clone(), spec.url.clone())
            .headers(spec.headers.clone());
        if let Some(body) = &spec.body {
            request = request.body(body.clone());
        }

        tracing::debug!(
            kind,
            method = %spec.method,
            url = %spec.url,
            body_len = spec.body.as_ref().map_or(0, |b| b.len()),
            "Sending request"
        );

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(kind, url = %spec.url, error = %e, "Request failed");
                metrics::record_relay(kind, "transport_error", start);
                return Err(HttpError::Transport(e.to_string()));
            }
        };

        let status = response.status();
        metrics::record_relay(kind, status.as_str(), start);

        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                kind,
                url = %spec.url,
                status = status.as_u16(),
                body = %body,
                "Received HTTP error status"
            );
            return Err(HttpError::Status(status.as_u16()));
        }

        // No content decoding is enabled, so a body failure is the connection
        // timing out or dropping mid-response.
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(kind, url = %spec.url, timeout = e.is_timeout(), error = %e, "Failed to read body");
                return Err(HttpError::Transport(format!("Failed to read body: {}", e)));
            }
        };
        if body.is_empty() {
            return Err(HttpError::InvalidResponse("Empty body".to_string()));
        }

        tracing::debug!(
            kind,
            body_len = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request completed"
        );
        Ok(body)
    }
}

//! Inference API client.
//!
//! # Responsibilities
//! - Send one `POST /v1/messages` per relayed request
//! - Attach the API key and version headers
//! - Hand back the upstream status and JSON body unchanged
//!
//! # Design Decisions
//! - No retries: every failure goes straight back to the caller
//! - Non-2xx replies are errors carrying the upstream body verbatim
//! - Transport failures and timeouts are distinct from upstream statuses

use std::time::{Duration, Instant};

use serde_json::Value;
use thiserror::Error;

use crate::config::RelayConfig;
use crate::http::response::ErrorBody;
use crate::observability::metrics;
use crate::upstream::secret::ApiKey;
use crate::upstream::types::{MessagesRequest, UpstreamReply};

const API_KEY_HEADER: &str = "x-api-key";
const VERSION_HEADER: &str = "anthropic-version";

/// Errors from the inference API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The API answered with a non-success status.
    #[error("upstream returned status {status}")]
    Status { status: u16, body: Value },

    /// The call did not complete within the configured timeout.
    #[error("upstream timed out after {0} seconds")]
    Timeout(u64),

    /// Connection or protocol failure.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// Success status with a body that isn't JSON.
    #[error("upstream response could not be decoded: {0}")]
    Decode(String),
}

/// Client for the upstream messages endpoint.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    endpoint: String,
    api_version: String,
    timeout_secs: u64,
}

impl UpstreamClient {
    /// Build a client from the relay configuration.
    pub fn new(config: &RelayConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .timeout(Duration::from_secs(config.timeouts.upstream_secs))
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/v1/messages", config.upstream.base_url.trim_end_matches('/')),
            api_version: config.upstream.api_version.clone(),
            timeout_secs: config.timeouts.upstream_secs,
        })
    }

    /// Send one messages request.
    pub async fn create_message(
        &self,
        api_key: &ApiKey,
        request: &MessagesRequest,
    ) -> Result<UpstreamReply, UpstreamError> {
        let start = Instant::now();

        let response = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, api_key.expose())
            .header(VERSION_HEADER, &self.api_version)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    UpstreamError::Timeout(self.timeout_secs)
                } else {
                    UpstreamError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        metrics::record_upstream(status.as_u16(), start);

        if !status.is_success() {
            let body = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| {
                let wrapped = ErrorBody::new("Upstream API error").with_details(Value::String(text));
                serde_json::to_value(wrapped).unwrap_or(Value::Null)
            });
            return Err(UpstreamError::Status { status: status.as_u16(), body });
        }

        let body = serde_json::from_str::<Value>(&text)
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;

        Ok(UpstreamReply {
            status: status.as_u16(),
            body,
        })
    }
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .finish()
    }
}

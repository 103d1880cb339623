//! HTTP probe processor.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use auditq_config::PipelineConfig;
use auditq_workqueue::UrlProcessor;

use crate::error::PipelineError;

/// Build the HTTP client shared by URL collection and probing.
pub(crate) fn http_client(config: &PipelineConfig) -> Result<Client, PipelineError> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .user_agent(&config.user_agent)
        .build()?)
}

/// Outcome of probing one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// HTTP status code.
    pub status: u16,
    /// URL after redirects.
    pub final_url: String,
    /// Response body size in bytes.
    pub content_length: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Time to receive the full response.
    pub elapsed_ms: u64,
}

/// Fetches each URL with a GET request.
///
/// Non-2xx responses are failures, so the queue retries them.
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Ok(Self::with_client(http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UrlProcessor for HttpProbe {
    type Output = ProbeResult;
    type Error = PipelineError;

    async fn process(&self, url: &str) -> Result<ProbeResult, PipelineError> {
        let started = Instant::now();
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?;

        let result = ProbeResult {
            status: status.as_u16(),
            final_url,
            content_length: body.len() as u64,
            content_type,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        debug!(
            "Probed {}: {} ({} bytes, {}ms)",
            url, result.status, result.content_length, result.elapsed_ms
        );
        Ok(result)
    }
}

#[cfg(test)]
#[path = "probe_tests.rs"]
mod tests;

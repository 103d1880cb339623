//! Pipeline error types.

use thiserror::Error;

use auditq_checkpoint::CheckpointError;
use auditq_monitor::MonitorError;
use auditq_workqueue::QueueError;

/// Errors raised while collecting URLs or running a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Sitemap {location} could not be read: {message}")]
    Sitemap { location: String, message: String },

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("No URLs to process")]
    NoUrls,

    #[error("Persistence is disabled")]
    PersistenceDisabled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

//! Configuration schema.

use serde::{Deserialize, Serialize};

pub use auditq_checkpoint::PersistenceConfig;
pub use auditq_monitor::MonitorConfig;
pub use auditq_workqueue::{BackpressureConfig, PriorityRule, QueueConfig};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub backpressure: BackpressureConfig,

    #[serde(default)]
    pub monitor: MonitorConfig,

    #[serde(default)]
    pub persistence: PersistenceConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// URL collection and probing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Maximum URLs per run (0 = unlimited).
    #[serde(default)]
    pub max_urls: usize,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User agent for sitemap fetches and probes.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("auditq/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_urls: 0,
            request_timeout_secs: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

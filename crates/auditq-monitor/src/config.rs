//! Monitor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Resource monitor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Whether resource monitoring is enabled.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Sampling interval in milliseconds.
    #[serde(default = "default_sample_interval")]
    pub sample_interval_ms: u64,

    /// Resident memory (MB) above which a warning is raised.
    #[serde(default = "default_memory_warning")]
    pub memory_warning_mb: f64,

    /// Resident memory (MB) above which a critical alert is raised.
    #[serde(default = "default_memory_critical")]
    pub memory_critical_mb: f64,

    /// CPU usage (%) above which a warning is raised.
    #[serde(default = "default_cpu_warning")]
    pub cpu_warning_percent: f64,

    /// CPU usage (%) above which a critical alert is raised.
    #[serde(default = "default_cpu_critical")]
    pub cpu_critical_percent: f64,

    /// Run the reclaim hook on critical memory alerts.
    #[serde(default = "default_reclaim_on_critical")]
    pub reclaim_on_critical: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_sample_interval() -> u64 {
    2_000
}

fn default_memory_warning() -> f64 {
    1_024.0
}

fn default_memory_critical() -> f64 {
    1_536.0
}

fn default_cpu_warning() -> f64 {
    70.0
}

fn default_cpu_critical() -> f64 {
    90.0
}

fn default_reclaim_on_critical() -> bool {
    true
}

impl MonitorConfig {
    /// Sampling interval as a [`Duration`].
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            sample_interval_ms: default_sample_interval(),
            memory_warning_mb: default_memory_warning(),
            memory_critical_mb: default_memory_critical(),
            cpu_warning_percent: default_cpu_warning(),
            cpu_critical_percent: default_cpu_critical(),
            reclaim_on_critical: default_reclaim_on_critical(),
        }
    }
}

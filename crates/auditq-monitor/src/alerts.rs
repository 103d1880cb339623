//! Resource alert types and threshold evaluation.

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::MonitorConfig;
use crate::sampler::ResourceUsage;

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Above the warning threshold.
    Warning,
    /// Above the critical threshold.
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Which resource crossed a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Resident memory, in MB.
    Memory,
    /// CPU usage, in percent.
    Cpu,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Memory => write!(f, "memory"),
            ResourceKind::Cpu => write!(f, "cpu"),
        }
    }
}

/// A threshold crossing observed in one sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceAlert {
    /// Resource that crossed the threshold.
    pub kind: ResourceKind,
    /// Severity level.
    pub severity: AlertSeverity,
    /// Observed value (MB or %).
    pub value: f64,
    /// Threshold that was crossed.
    pub threshold: f64,
    /// Timestamp of the sample.
    pub timestamp: DateTime<Utc>,
}

impl ResourceAlert {
    /// Evaluate a sample against the configured thresholds.
    ///
    /// At most one alert per resource is produced: the critical one wins over
    /// the warning.
    pub fn evaluate(usage: &ResourceUsage, config: &MonitorConfig) -> Vec<ResourceAlert> {
        let mut alerts = Vec::new();

        let checks = [
            (
                ResourceKind::Memory,
                usage.memory_mb,
                config.memory_warning_mb,
                config.memory_critical_mb,
            ),
            (
                ResourceKind::Cpu,
                usage.cpu_percent,
                config.cpu_warning_percent,
                config.cpu_critical_percent,
            ),
        ];

        for (kind, value, warning, critical) in checks {
            let crossed = if value >= critical {
                Some((AlertSeverity::Critical, critical))
            } else if value >= warning {
                Some((AlertSeverity::Warning, warning))
            } else {
                None
            };

            if let Some((severity, threshold)) = crossed {
                alerts.push(ResourceAlert {
                    kind,
                    severity,
                    value,
                    threshold,
                    timestamp: usage.sampled_at,
                });
            }
        }

        alerts
    }

    /// Format for log output.
    pub fn format_text(&self) -> String {
        let unit = match self.kind {
            ResourceKind::Memory => "MB",
            ResourceKind::Cpu => "%",
        };
        format!(
            "[{}] {} at {:.1}{} (threshold {:.1}{})",
            self.severity, self.kind, self.value, unit, self.threshold, unit
        )
    }
}

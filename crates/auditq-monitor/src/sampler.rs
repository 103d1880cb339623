//! Process resource sampling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::error::MonitorError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One resource usage sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Resident memory in MB.
    pub memory_mb: f64,
    /// CPU usage in percent (may exceed 100 on multi-core hosts).
    pub cpu_percent: f64,
    /// When the sample was taken.
    pub sampled_at: DateTime<Utc>,
}

impl ResourceUsage {
    /// Build a sample stamped with the current time.
    pub fn now(memory_mb: f64, cpu_percent: f64) -> Self {
        Self {
            memory_mb,
            cpu_percent,
            sampled_at: Utc::now(),
        }
    }
}

/// Source of resource samples.
pub trait ResourceSampler: Send {
    /// Take a fresh sample.
    fn sample(&mut self) -> Result<ResourceUsage, MonitorError>;
}

/// Samples the current process through `sysinfo`.
///
/// CPU usage is computed between two refreshes, so the first sample always
/// reports 0%.
pub struct SysinfoSampler {
    system: System,
    pid: Pid,
}

impl SysinfoSampler {
    /// Create a sampler for the current process.
    pub fn new() -> Result<Self, MonitorError> {
        let pid = sysinfo::get_current_pid().map_err(|e| MonitorError::Sampling(e.to_string()))?;
        Ok(Self {
            system: System::new(),
            pid,
        })
    }
}

impl ResourceSampler for SysinfoSampler {
    fn sample(&mut self) -> Result<ResourceUsage, MonitorError> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);

        let process = self
            .system
            .process(self.pid)
            .ok_or_else(|| MonitorError::Sampling(format!("process {} not found", self.pid)))?;

        Ok(ResourceUsage::now(
            process.memory() as f64 / BYTES_PER_MB,
            process.cpu_usage() as f64,
        ))
    }
}

//! Derived queue statistics.

use std::time::Duration;

use auditq_monitor::ResourceUsage;
use serde::Serialize;

use crate::backpressure::BackpressureSnapshot;

/// Exponential moving average of task durations.
#[derive(Debug, Clone)]
pub struct DurationAverage {
    alpha: f64,
    value: Option<f64>,
    samples: u64,
}

impl DurationAverage {
    /// Create an average with smoothing factor `alpha` in `(0, 1]`.
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            value: None,
            samples: 0,
        }
    }

    pub fn record(&mut self, duration: Duration) {
        let ms = duration.as_secs_f64() * 1000.0;
        self.value = Some(match self.value {
            Some(avg) => avg + self.alpha * (ms - avg),
            None => ms,
        });
        self.samples += 1;
    }

    /// Current average in milliseconds.
    pub fn value_ms(&self) -> Option<f64> {
        self.value
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }
}

impl Default for DurationAverage {
    fn default() -> Self {
        Self::new(0.2)
    }
}

/// Snapshot of queue progress.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub retrying: usize,
    pub completed: usize,
    pub failed: usize,
    /// Share of URLs in a terminal state, 0..=100.
    pub completion_percent: f64,
    /// Moving average of task duration in milliseconds.
    pub avg_duration_ms: Option<f64>,
    /// Estimated time until the queue drains, in milliseconds.
    pub eta_ms: Option<u64>,
    /// Time since the run started, in milliseconds.
    pub elapsed_ms: u64,
    pub resources: Option<ResourceUsage>,
    pub backpressure: BackpressureSnapshot,
}

impl QueueStats {
    /// URLs not yet in a terminal state.
    pub fn remaining(&self) -> usize {
        self.pending + self.in_progress + self.retrying
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    pub(crate) fn estimate_eta(
        remaining: usize,
        avg_ms: Option<f64>,
        max_concurrent: usize,
    ) -> Option<u64> {
        let avg = avg_ms?;
        let lanes = max_concurrent.max(1) as f64;
        Some((remaining as f64 * avg / lanes).round() as u64)
    }

    pub(crate) fn percent(done: usize, total: usize) -> f64 {
        if total == 0 {
            100.0
        } else {
            done as f64 * 100.0 / total as f64
        }
    }
}

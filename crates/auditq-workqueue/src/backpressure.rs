//! Adaptive backpressure.
//!
//! The controller folds active workload, recent task outcomes and resource
//! samples into a single pressure ratio. URLs that are pending but not yet
//! started hold no resources and do not count toward pressure. Once the ratio reaches the activation
//! threshold the queue starts delaying dequeues and retries; it only stops
//! after the ratio falls below the (lower) deactivation threshold, so the
//! delay does not flap around a single cut-off.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Backpressure configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackpressureConfig {
    /// Whether backpressure is applied at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Active workers plus retrying tasks considered full load.
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Memory considered full load, in MB.
    #[serde(default = "default_max_memory")]
    pub max_memory_mb: f64,

    /// CPU considered full load, in percent.
    #[serde(default = "default_max_cpu")]
    pub max_cpu_percent: f64,

    /// Pressure at which backpressure turns on.
    #[serde(default = "default_activation")]
    pub activation_threshold: f64,

    /// Pressure below which backpressure turns off.
    #[serde(default = "default_deactivation")]
    pub deactivation_threshold: f64,

    /// Delay at the deactivation threshold, in milliseconds.
    #[serde(default = "default_min_delay")]
    pub min_delay_ms: u64,

    /// Delay at full pressure, in milliseconds.
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Number of recent task outcomes used for the error rate.
    #[serde(default = "default_error_window")]
    pub error_window: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_max_queue_size() -> usize {
    1000
}

fn default_max_memory() -> f64 {
    2048.0
}

fn default_max_cpu() -> f64 {
    90.0
}

fn default_activation() -> f64 {
    0.8
}

fn default_deactivation() -> f64 {
    0.6
}

fn default_min_delay() -> u64 {
    50
}

fn default_max_delay() -> u64 {
    5000
}

fn default_error_window() -> usize {
    20
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_queue_size: default_max_queue_size(),
            max_memory_mb: default_max_memory(),
            max_cpu_percent: default_max_cpu(),
            activation_threshold: default_activation(),
            deactivation_threshold: default_deactivation(),
            min_delay_ms: default_min_delay(),
            max_delay_ms: default_max_delay(),
            error_window: default_error_window(),
        }
    }
}

/// A change of the active flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressureTransition {
    Activated,
    Deactivated,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackpressureSnapshot {
    pub active: bool,
    pub delay_ms: u64,
    pub pressure: f64,
    pub queue_depth: usize,
    pub retrying: usize,
    pub active_workers: usize,
    pub memory_mb: f64,
    pub cpu_percent: f64,
    pub error_rate: f64,
}

/// Hysteresis-based backpressure controller.
#[derive(Debug, Clone)]
pub struct BackpressureController {
    config: BackpressureConfig,
    active: bool,
    delay: Duration,
    pressure: f64,
    queue_depth: usize,
    retrying: usize,
    active_workers: usize,
    memory_mb: f64,
    cpu_percent: f64,
    outcomes: VecDeque<bool>,
}

impl BackpressureController {
    /// Create an inactive controller.
    pub fn new(config: BackpressureConfig) -> Self {
        let window = config.error_window;
        Self {
            config,
            active: false,
            delay: Duration::ZERO,
            pressure: 0.0,
            queue_depth: 0,
            retrying: 0,
            active_workers: 0,
            memory_mb: 0.0,
            cpu_percent: 0.0,
            outcomes: VecDeque::with_capacity(window),
        }
    }

    pub fn config(&self) -> &BackpressureConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Delay to apply before the next dequeue or retry.
    pub fn current_delay(&self) -> Duration {
        self.delay
    }

    pub fn pressure(&self) -> f64 {
        self.pressure
    }

    /// Update queue depth, retrying tasks and active worker count.
    ///
    /// Only `retrying + active_workers` feeds the load ratio; the depth is
    /// kept for reporting.
    pub fn update_queue(
        &mut self,
        queue_depth: usize,
        retrying: usize,
        active_workers: usize,
    ) -> Option<BackpressureTransition> {
        self.queue_depth = queue_depth;
        self.retrying = retrying;
        self.active_workers = active_workers;
        self.recompute()
    }

    /// Record the outcome of a finished attempt.
    pub fn record_outcome(&mut self, is_error: bool) -> Option<BackpressureTransition> {
        if self.config.error_window == 0 {
            return self.recompute();
        }
        if self.outcomes.len() == self.config.error_window {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(is_error);
        self.recompute()
    }

    /// Update the latest resource sample.
    pub fn record_resources(
        &mut self,
        memory_mb: f64,
        cpu_percent: f64,
    ) -> Option<BackpressureTransition> {
        self.memory_mb = memory_mb;
        self.cpu_percent = cpu_percent;
        self.recompute()
    }

    /// Share of errors in the outcome window.
    ///
    /// The denominator is the full window size, so a handful of early
    /// failures cannot saturate the ratio on their own.
    pub fn error_rate(&self) -> f64 {
        if self.config.error_window == 0 {
            return 0.0;
        }
        let errors = self.outcomes.iter().filter(|e| **e).count();
        errors as f64 / self.config.error_window as f64
    }

    pub fn snapshot(&self) -> BackpressureSnapshot {
        BackpressureSnapshot {
            active: self.active,
            delay_ms: self.delay.as_millis() as u64,
            pressure: self.pressure,
            queue_depth: self.queue_depth,
            retrying: self.retrying,
            active_workers: self.active_workers,
            memory_mb: self.memory_mb,
            cpu_percent: self.cpu_percent,
            error_rate: self.error_rate(),
        }
    }

    fn compute_pressure(&self) -> f64 {
        let load = ratio(
            (self.retrying + self.active_workers) as f64,
            self.config.max_queue_size as f64,
        );
        let memory = ratio(self.memory_mb, self.config.max_memory_mb);
        let cpu = ratio(self.cpu_percent, self.config.max_cpu_percent);

        load.max(memory).max(cpu).max(self.error_rate())
    }

    fn recompute(&mut self) -> Option<BackpressureTransition> {
        if !self.config.enabled {
            self.pressure = 0.0;
            self.delay = Duration::ZERO;
            return None;
        }

        self.pressure = self.compute_pressure();

        let transition = if !self.active && self.pressure >= self.config.activation_threshold {
            self.active = true;
            Some(BackpressureTransition::Activated)
        } else if self.active && self.pressure < self.config.deactivation_threshold {
            self.active = false;
            Some(BackpressureTransition::Deactivated)
        } else {
            None
        };

        self.delay = if self.active {
            self.scaled_delay()
        } else {
            Duration::ZERO
        };

        transition
    }

    fn scaled_delay(&self) -> Duration {
        let min = self.config.min_delay_ms as f64;
        let max = self.config.max_delay_ms.max(self.config.min_delay_ms) as f64;
        let floor = self.config.deactivation_threshold;
        let span = 1.0 - floor;

        let fraction = if span > 0.0 {
            ((self.pressure - floor) / span).clamp(0.0, 1.0)
        } else {
            1.0
        };

        Duration::from_millis((min + (max - min) * fraction).round() as u64)
    }
}

fn ratio(value: f64, limit: f64) -> f64 {
    if limit <= 0.0 { 0.0 } else { value / limit }
}

#[cfg(test)]
#[path = "backpressure_tests.rs"]
mod tests;

//! Queue event observers.

use std::time::Duration;

use auditq_monitor::ResourceAlert;
use tracing::{debug, error, info, warn};

use crate::backpressure::BackpressureSnapshot;
use crate::error::QueueError;
use crate::stats::QueueStats;

/// Receives queue events. Every method defaults to a no-op.
///
/// Methods are called after the queue has released its internal lock, so an
/// observer may call back into the queue.
pub trait QueueObserver<R>: Send + Sync {
    fn on_task_added(&self, _url: &str, _priority: i32) {}

    fn on_task_started(&self, _url: &str, _attempt: u32) {}

    fn on_task_completed(&self, _url: &str, _result: &R, _duration: Duration) {}

    /// A failed attempt that will be retried after `delay`.
    fn on_task_retrying(&self, _url: &str, _error: &str, _attempt: u32, _delay: Duration) {}

    /// A task that exhausted its attempts.
    fn on_task_failed(&self, _url: &str, _error: &str, _attempts: u32) {}

    /// Fired once per run when the queue drains.
    fn on_queue_empty(&self, _stats: &QueueStats) {}

    fn on_progress(&self, _stats: &QueueStats) {}

    fn on_queue_error(&self, _error: &QueueError) {}

    fn on_backpressure_activated(&self, _snapshot: &BackpressureSnapshot) {}

    fn on_backpressure_deactivated(&self, _snapshot: &BackpressureSnapshot) {}

    fn on_resource_warning(&self, _alert: &ResourceAlert) {}

    fn on_resource_critical(&self, _alert: &ResourceAlert) {}

    fn on_memory_reclaimed(&self, _before_mb: f64, _after_mb: f64) {}
}

/// Forwards every queue event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogObserver;

impl<R> QueueObserver<R> for LogObserver {
    fn on_task_added(&self, url: &str, priority: i32) {
        debug!("Task added: {} (priority {})", url, priority);
    }

    fn on_task_started(&self, url: &str, attempt: u32) {
        debug!("Task started: {} (attempt {})", url, attempt);
    }

    fn on_task_completed(&self, url: &str, _result: &R, duration: Duration) {
        info!("Completed {} in {}ms", url, duration.as_millis());
    }

    fn on_task_retrying(&self, url: &str, error: &str, attempt: u32, delay: Duration) {
        warn!(
            "Attempt {} for {} failed: {} (retrying in {}ms)",
            attempt,
            url,
            error,
            delay.as_millis()
        );
    }

    fn on_task_failed(&self, url: &str, error: &str, attempts: u32) {
        error!("Failed {} after {} attempts: {}", url, attempts, error);
    }

    fn on_queue_empty(&self, stats: &QueueStats) {
        info!(
            "Queue drained: {} completed, {} failed in {}ms",
            stats.completed, stats.failed, stats.elapsed_ms
        );
    }

    fn on_progress(&self, stats: &QueueStats) {
        info!(
            completed = stats.completed,
            failed = stats.failed,
            in_progress = stats.in_progress,
            pending = stats.pending,
            eta_ms = stats.eta_ms,
            "Progress {:.1}% ({}/{})",
            stats.completion_percent,
            stats.completed + stats.failed,
            stats.total
        );
    }

    fn on_queue_error(&self, error: &QueueError) {
        error!("Queue error: {}", error);
    }

    fn on_backpressure_activated(&self, snapshot: &BackpressureSnapshot) {
        warn!(
            "Backpressure activated (pressure {:.2}, delay {}ms)",
            snapshot.pressure, snapshot.delay_ms
        );
    }

    fn on_backpressure_deactivated(&self, snapshot: &BackpressureSnapshot) {
        info!("Backpressure deactivated (pressure {:.2})", snapshot.pressure);
    }

    fn on_resource_warning(&self, alert: &ResourceAlert) {
        warn!("{}", alert.format_text());
    }

    fn on_resource_critical(&self, alert: &ResourceAlert) {
        error!("{}", alert.format_text());
    }

    fn on_memory_reclaimed(&self, before_mb: f64, after_mb: f64) {
        info!("Memory reclaimed: {:.1}MB -> {:.1}MB", before_mb, after_mb);
    }
}

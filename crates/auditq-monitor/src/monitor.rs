//! Periodic resource monitor.

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alerts::{AlertSeverity, ResourceAlert, ResourceKind};
use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::sampler::{ResourceSampler, ResourceUsage, SysinfoSampler};

/// Callback run on critical memory pressure to release memory.
///
/// Rust has no collector to force, so this is where callers drop caches or
/// shrink pools.
pub type ReclaimHook = Arc<dyn Fn() + Send + Sync>;

/// Receives samples and alerts from a [`ResourceMonitor`].
///
/// Callbacks run on the sampling task and must not block.
pub trait ResourceListener: Send + Sync {
    /// A new sample was taken.
    fn on_sample(&self, _usage: &ResourceUsage) {}

    /// A threshold was crossed.
    fn on_alert(&self, _alert: &ResourceAlert) {}

    /// The reclaim hook ran.
    fn on_reclaim(&self, _before_mb: f64, _after_mb: f64) {}
}

struct MonitorCore {
    config: MonitorConfig,
    sampler: Mutex<Box<dyn ResourceSampler>>,
    reclaim: Option<ReclaimHook>,
    latest: RwLock<Option<ResourceUsage>>,
}

impl MonitorCore {
    fn sample_once(&self, listener: &dyn ResourceListener) -> Option<ResourceUsage> {
        let usage = match self.sampler.lock().sample() {
            Ok(usage) => usage,
            Err(e) => {
                warn!("Resource sampling failed: {}", e);
                return None;
            }
        };

        *self.latest.write() = Some(usage);
        listener.on_sample(&usage);

        let alerts = ResourceAlert::evaluate(&usage, &self.config);
        let mut memory_critical = false;

        for alert in &alerts {
            match alert.severity {
                AlertSeverity::Warning => warn!("[ALERT] {}", alert.format_text()),
                AlertSeverity::Critical => error!("[ALERT] {}", alert.format_text()),
            }
            if alert.kind == ResourceKind::Memory && alert.severity == AlertSeverity::Critical {
                memory_critical = true;
            }
            listener.on_alert(alert);
        }

        if memory_critical && self.config.reclaim_on_critical {
            if let Some(hook) = &self.reclaim {
                return Some(self.reclaim(hook, usage, listener));
            }
        }

        Some(usage)
    }

    fn reclaim(
        &self,
        hook: &ReclaimHook,
        before: ResourceUsage,
        listener: &dyn ResourceListener,
    ) -> ResourceUsage {
        hook();

        let after = match self.sampler.lock().sample() {
            Ok(after) => after,
            Err(e) => {
                warn!("Resource sampling after reclaim failed: {}", e);
                before
            }
        };

        info!(
            "Memory reclaim: {:.1}MB -> {:.1}MB",
            before.memory_mb, after.memory_mb
        );
        *self.latest.write() = Some(after);
        listener.on_reclaim(before.memory_mb, after.memory_mb);
        after
    }
}

struct MonitorTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Samples process resources on a fixed interval.
pub struct ResourceMonitor {
    core: Arc<MonitorCore>,
    task: Mutex<Option<MonitorTask>>,
}

impl ResourceMonitor {
    /// Create a monitor sampling the current process.
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        Ok(Self::with_sampler(config, Box::new(SysinfoSampler::new()?)))
    }

    /// Create a monitor with a custom sampler.
    pub fn with_sampler(config: MonitorConfig, sampler: Box<dyn ResourceSampler>) -> Self {
        Self {
            core: Arc::new(MonitorCore {
                config,
                sampler: Mutex::new(sampler),
                reclaim: None,
                latest: RwLock::new(None),
            }),
            task: Mutex::new(None),
        }
    }

    /// Set the reclaim hook. Must be called before [`ResourceMonitor::start`].
    pub fn with_reclaim_hook(mut self, hook: ReclaimHook) -> Self {
        if let Some(core) = Arc::get_mut(&mut self.core) {
            core.reclaim = Some(hook);
        }
        self
    }

    /// Get the configuration.
    pub fn config(&self) -> &MonitorConfig {
        &self.core.config
    }

    /// Latest sample, if any was taken.
    pub fn latest(&self) -> Option<ResourceUsage> {
        *self.core.latest.read()
    }

    /// Check if the sampling task is running.
    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Take one sample immediately and dispatch it.
    pub fn sample_once(&self, listener: &dyn ResourceListener) -> Option<ResourceUsage> {
        self.core.sample_once(listener)
    }

    /// Start periodic sampling. Calling it while running is a no-op.
    pub fn start(&self, listener: Arc<dyn ResourceListener>) {
        if !self.core.config.enabled {
            debug!("Resource monitor disabled");
            return;
        }

        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let core = self.core.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let interval = core.config.sample_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        core.sample_once(listener.as_ref());
                    }
                }
            }
            debug!("Resource monitor loop exited");
        });

        info!("Resource monitor started (interval {:?})", interval);
        *task = Some(MonitorTask { cancel, handle });
    }

    /// Stop periodic sampling. Calling it while stopped is a no-op.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.cancel.cancel();
            task.handle.abort();
            info!("Resource monitor stopped");
        }
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.cancel.cancel();
            task.handle.abort();
        }
    }
}

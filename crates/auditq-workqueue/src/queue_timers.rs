//! Timers owned by the queue: hard timeouts, retry re-admission, auto-save
//! and progress reporting, plus the resource monitor bridge.

use std::sync::{Arc, Weak};
use std::time::Duration;

use auditq_monitor::{AlertSeverity, ResourceAlert, ResourceListener, ResourceUsage};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::queue::{Shared, TaskQueue};
use crate::task::QueueResult;

impl<R: QueueResult> TaskQueue<R> {
    fn downgrade(&self) -> Weak<Shared<R>> {
        Arc::downgrade(&self.shared)
    }

    /// Spawn the hard-timeout timer of one attempt. Cancel the returned token to disarm it.
    pub(crate) fn arm_hard_timeout(
        &self,
        url: String,
        attempt: u32,
        timeout: Duration,
    ) -> CancellationToken {
        let disarm = CancellationToken::new();
        let token = disarm.clone();
        let weak = self.downgrade();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if let Some(shared) = weak.upgrade() {
                        TaskQueue { shared }.expire_attempt(&url, attempt, timeout).await;
                    }
                }
            }
        });

        disarm
    }

    /// Spawn the timer that moves a retrying URL back to pending.
    pub(crate) fn schedule_retry(&self, url: String, delay: Duration) -> JoinHandle<()> {
        let weak = self.downgrade();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(shared) = weak.upgrade() {
                TaskQueue { shared }.readmit(&url);
            }
        })
    }

    /// Start the run: resource monitor, auto-save and progress timers.
    ///
    /// Timers stop when the queue drains or shuts down. Calling `start` again
    /// replaces them.
    pub fn start(&self) {
        let token = CancellationToken::new();
        let (progress, drained) = {
            let mut inner = self.shared.inner.lock();
            if inner.shut_down {
                warn!("Cannot start a queue after shutdown");
                return;
            }
            inner.run_started.get_or_insert_with(Instant::now);
            if let Some(previous) = inner.background.replace(token.clone()) {
                previous.cancel();
            }
            (inner.config.progress_interval(), inner.drain_fired)
        };

        if drained {
            debug!("Queue already drained, timers not started");
            return;
        }

        if let Some(monitor) = &self.shared.monitor {
            monitor.start(Arc::new(ResourceBridge {
                shared: self.downgrade(),
            }));
        }

        if self.persistence_active() {
            self.spawn_auto_save(self.shared.persistence.auto_save_interval(), token.clone());
        }

        if let Some(every) = progress {
            self.spawn_progress(every, token);
        }

        info!("Queue started");
    }

    fn spawn_auto_save(&self, every: Duration, token: CancellationToken) {
        let weak = self.downgrade();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(shared) = weak.upgrade() else { break };
                        let queue = TaskQueue { shared };
                        match queue.auto_save(&token).await {
                            Ok(Some(id)) => debug!("Auto-saved state {}", id),
                            Ok(None) => break,
                            Err(e) => {
                                warn!("Auto-save failed: {}", e);
                                queue.emit_error(&e);
                            }
                        }
                    }
                }
            }
            debug!("Auto-save loop exited");
        });
    }

    fn spawn_progress(&self, every: Duration, token: CancellationToken) {
        let weak = self.downgrade();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(shared) = weak.upgrade() else { break };
                        let queue = TaskQueue { shared };
                        let stats = queue.stats();
                        for observer in queue.observers() {
                            observer.on_progress(&stats);
                        }
                    }
                }
            }
        });
    }
}

/// Feeds resource samples into backpressure and forwards alerts to observers.
struct ResourceBridge<R> {
    shared: Weak<Shared<R>>,
}

impl<R: QueueResult> ResourceBridge<R> {
    fn queue(&self) -> Option<TaskQueue<R>> {
        self.shared.upgrade().map(|shared| TaskQueue { shared })
    }
}

impl<R: QueueResult> ResourceListener for ResourceBridge<R> {
    fn on_sample(&self, usage: &ResourceUsage) {
        let Some(queue) = self.queue() else {
            return;
        };

        let mut events = Vec::new();
        {
            let mut inner = queue.shared.inner.lock();
            let transition = inner
                .backpressure
                .record_resources(usage.memory_mb, usage.cpu_percent);
            inner.push_transition(transition, &mut events);
        }
        queue.dispatch(events);
    }

    fn on_alert(&self, alert: &ResourceAlert) {
        let Some(queue) = self.queue() else {
            return;
        };
        for observer in queue.observers() {
            match alert.severity {
                AlertSeverity::Warning => observer.on_resource_warning(alert),
                AlertSeverity::Critical => observer.on_resource_critical(alert),
            }
        }
    }

    fn on_reclaim(&self, before_mb: f64, after_mb: f64) {
        let Some(queue) = self.queue() else {
            return;
        };
        for observer in queue.observers() {
            observer.on_memory_reclaimed(before_mb, after_mb);
        }
    }
}

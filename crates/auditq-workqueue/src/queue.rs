//! Priority URL queue.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use auditq_checkpoint::{PersistenceConfig, StateStore};
use auditq_monitor::ResourceMonitor;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, error, info, warn};

use crate::backpressure::{
    BackpressureConfig, BackpressureController, BackpressureSnapshot, BackpressureTransition,
};
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::observer::QueueObserver;
use crate::stats::{DurationAverage, QueueStats};
use crate::task::{FailureRecord, QueueResult, Task, TaskResult, TaskStatus};

/// Pending ordering key: priority descending, then insertion order.
type PendingKey = (Reverse<i32>, u64);

/// A claimed attempt.
///
/// The cancellation token fires when the attempt's hard timeout expires or
/// the queue shuts down; the holder should stop working on the URL.
#[derive(Debug, Clone)]
pub struct TaskLease {
    url: String,
    attempt: u32,
    cancel: CancellationToken,
}

impl TaskLease {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Attempt number, starting at 1.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the attempt is abandoned.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }
}

pub(crate) struct TaskEntry<R> {
    pub(crate) task: Task<R>,
    seq: u64,
    started: Option<Instant>,
    /// Stops the hard-timeout timer of the current attempt.
    timer: Option<CancellationToken>,
    /// Shared with the worker holding the current attempt.
    lease: Option<CancellationToken>,
    retry: Option<JoinHandle<()>>,
}

impl<R> TaskEntry<R> {
    fn cancel_timers(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        if let Some(lease) = self.lease.take() {
            lease.cancel();
        }
        if let Some(retry) = self.retry.take() {
            retry.abort();
        }
    }
}

pub(crate) enum Outcome<R> {
    Success(R),
    Failure(String),
}

enum Settled {
    Completed,
    Retrying(Duration),
    Failed,
}

pub(crate) enum QueueEvent<R> {
    Added { url: String, priority: i32 },
    Started { url: String, attempt: u32 },
    Completed { url: String, result: R, duration: Duration },
    Retrying { url: String, error: String, attempt: u32, delay: Duration },
    Failed { url: String, error: String, attempts: u32 },
    Backpressure(BackpressureTransition, BackpressureSnapshot),
}

pub(crate) struct Inner<R> {
    pub(crate) config: QueueConfig,
    pub(crate) tasks: HashMap<String, TaskEntry<R>>,
    /// Every admitted URL, in insertion order.
    pub(crate) order: Vec<String>,
    pending: BTreeMap<PendingKey, String>,
    /// Completed URLs, in completion order.
    pub(crate) completed: Vec<String>,
    /// Failed URLs, in failure order.
    pub(crate) failed: Vec<String>,
    in_progress: usize,
    retrying: usize,
    next_seq: u64,
    pub(crate) backpressure: BackpressureController,
    durations: DurationAverage,
    pub(crate) paused: bool,
    pub(crate) shut_down: bool,
    pub(crate) drain_fired: bool,
    drained: bool,
    /// Bumped whenever new work re-arms the drain check.
    run_generation: u64,
    pub(crate) run_started: Option<Instant>,
    pub(crate) background: Option<CancellationToken>,
    pub(crate) state_id: Option<String>,
    pub(crate) state_started_at: Option<DateTime<Utc>>,
    pub(crate) cursor: usize,
}

impl<R> Inner<R> {
    fn new(config: QueueConfig, backpressure: BackpressureConfig) -> Self {
        Self {
            config,
            tasks: HashMap::new(),
            order: Vec::new(),
            pending: BTreeMap::new(),
            completed: Vec::new(),
            failed: Vec::new(),
            in_progress: 0,
            retrying: 0,
            next_seq: 0,
            backpressure: BackpressureController::new(backpressure),
            durations: DurationAverage::default(),
            paused: false,
            shut_down: false,
            drain_fired: false,
            drained: false,
            run_generation: 0,
            run_started: None,
            background: None,
            state_id: None,
            state_started_at: None,
            cursor: 0,
        }
    }

    /// Admit a new URL as pending. The caller has checked it is unknown.
    pub(crate) fn admit(&mut self, url: String, priority: i32) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.insert((Reverse(priority), seq), url.clone());
        self.order.push(url.clone());
        self.tasks.insert(
            url.clone(),
            TaskEntry {
                task: Task::new(url, priority),
                seq,
                started: None,
                timer: None,
                lease: None,
                retry: None,
            },
        );
        self.rearm_drain();
    }

    /// Record a URL restored from a snapshot in a terminal state.
    pub(crate) fn restore_terminal(&mut self, task: Task<R>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        let url = task.url.clone();
        match task.status {
            TaskStatus::Completed => self.completed.push(url.clone()),
            _ => self.failed.push(url.clone()),
        }
        self.order.push(url.clone());
        self.tasks.insert(
            url,
            TaskEntry {
                task,
                seq,
                started: None,
                timer: None,
                lease: None,
                retry: None,
            },
        );
    }

    fn can_claim(&self) -> bool {
        !self.paused
            && !self.shut_down
            && self.in_progress < self.config.max_concurrent
            && !self.pending.is_empty()
    }

    pub(crate) fn has_outstanding_work(&self) -> bool {
        !self.pending.is_empty() || self.retrying > 0 || self.in_progress > 0
    }

    fn rearm_drain(&mut self) {
        self.drain_fired = false;
        self.drained = false;
        self.run_generation += 1;
    }

    fn refresh_load(&mut self, events: &mut Vec<QueueEvent<R>>) {
        let transition = self
            .backpressure
            .update_queue(self.pending.len(), self.retrying, self.in_progress);
        self.push_transition(transition, events);
    }

    pub(crate) fn push_transition(
        &self,
        transition: Option<BackpressureTransition>,
        events: &mut Vec<QueueEvent<R>>,
    ) {
        if let Some(transition) = transition {
            events.push(QueueEvent::Backpressure(
                transition,
                self.backpressure.snapshot(),
            ));
        }
    }

    /// Mark the run drained if nothing is left.
    ///
    /// Returns the run generation exactly once per run; `None` otherwise.
    fn try_fire_drain(&mut self) -> Option<u64> {
        if self.drain_fired || self.shut_down || self.has_outstanding_work() {
            return None;
        }
        self.drain_fired = true;
        if let Some(background) = self.background.take() {
            background.cancel();
        }
        Some(self.run_generation)
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

pub(crate) struct Shared<R> {
    pub(crate) inner: Mutex<Inner<R>>,
    observers: RwLock<Vec<Arc<dyn QueueObserver<R>>>>,
    pub(crate) monitor: Option<Arc<ResourceMonitor>>,
    pub(crate) store: Option<Arc<dyn StateStore>>,
    pub(crate) persistence: PersistenceConfig,
    /// Held for the whole of every store write so snapshots land in order.
    pub(crate) save_lock: tokio::sync::Mutex<()>,
    drained: Notify,
}

/// Builder for [`TaskQueue`].
pub struct TaskQueueBuilder<R> {
    config: QueueConfig,
    backpressure: BackpressureConfig,
    monitor: Option<Arc<ResourceMonitor>>,
    store: Option<Arc<dyn StateStore>>,
    persistence: PersistenceConfig,
    observers: Vec<Arc<dyn QueueObserver<R>>>,
}

impl<R: QueueResult> TaskQueueBuilder<R> {
    pub fn backpressure(mut self, config: BackpressureConfig) -> Self {
        self.backpressure = config;
        self
    }

    /// Attach a resource monitor; it runs while the queue is processing.
    pub fn monitor(mut self, monitor: Arc<ResourceMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// Attach a state store used for checkpoints.
    pub fn persistence(mut self, config: PersistenceConfig, store: Arc<dyn StateStore>) -> Self {
        self.persistence = config;
        self.store = Some(store);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn QueueObserver<R>>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> TaskQueue<R> {
        let mut inner = Inner::new(self.config, self.backpressure);
        inner.state_id = self.persistence.state_id.clone();

        TaskQueue {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                observers: RwLock::new(self.observers),
                monitor: self.monitor,
                store: self.store,
                persistence: self.persistence,
                save_lock: tokio::sync::Mutex::new(()),
                drained: Notify::new(),
            }),
        }
    }
}

/// Priority URL queue shared between workers.
///
/// Cloning is cheap; clones share the same queue.
pub struct TaskQueue<R> {
    pub(crate) shared: Arc<Shared<R>>,
}

impl<R> Clone for TaskQueue<R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<R: QueueResult> TaskQueue<R> {
    /// Create a queue without persistence or monitoring.
    pub fn new(config: QueueConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: QueueConfig) -> TaskQueueBuilder<R> {
        TaskQueueBuilder {
            config,
            backpressure: BackpressureConfig::default(),
            monitor: None,
            store: None,
            persistence: PersistenceConfig::default(),
            observers: Vec::new(),
        }
    }

    /// Register an observer.
    pub fn add_observer(&self, observer: Arc<dyn QueueObserver<R>>) {
        self.shared.observers.write().push(observer);
    }

    pub fn config(&self) -> QueueConfig {
        self.shared.inner.lock().config.clone()
    }

    /// Add URLs, skipping any the queue already knows. Returns how many were admitted.
    pub fn add_urls<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut events = Vec::new();
        {
            let mut inner = self.shared.inner.lock();
            if inner.shut_down {
                warn!("Ignoring URLs added after shutdown");
                return 0;
            }

            for url in urls {
                let url = url.into();
                if url.is_empty() || inner.tasks.contains_key(&url) {
                    continue;
                }
                let priority = inner.config.priority_for(&url);
                inner.admit(url.clone(), priority);
                events.push(QueueEvent::Added { url, priority });
            }

            if !events.is_empty() {
                inner.refresh_load(&mut events);
            }
        }

        let added = events
            .iter()
            .filter(|e| matches!(e, QueueEvent::Added { .. }))
            .count();
        debug!("Added {} URLs to queue", added);
        self.dispatch(events);
        added
    }

    /// Claim the highest-priority pending URL.
    ///
    /// Sleeps for the current backpressure delay first. Returns `None` when
    /// the concurrency limit is reached, nothing is pending, or the queue is
    /// paused.
    pub async fn get_next_url(&self) -> Option<TaskLease> {
        let delay = {
            let inner = self.shared.inner.lock();
            if !inner.can_claim() {
                return None;
            }
            inner.backpressure.current_delay()
        };

        if !delay.is_zero() {
            debug!("Backpressure delay {}ms before dequeue", delay.as_millis());
            tokio::time::sleep(delay).await;
        }

        let mut events = Vec::new();
        let lease = {
            let mut inner = self.shared.inner.lock();
            if !inner.can_claim() {
                return None;
            }
            let (_, url) = inner.pending.pop_first()?;
            let hard_timeout = inner.config.hard_timeout();
            let entry = inner.tasks.get_mut(&url)?;

            entry.task.status = TaskStatus::InProgress;
            entry.task.attempts += 1;
            entry.task.started_at = Some(Utc::now());
            entry.started = Some(Instant::now());

            let attempt = entry.task.attempts;
            let lease = CancellationToken::new();
            entry.lease = Some(lease.clone());
            entry.timer = Some(self.arm_hard_timeout(url.clone(), attempt, hard_timeout));

            inner.in_progress += 1;
            inner.run_started.get_or_insert_with(Instant::now);
            events.push(QueueEvent::Started {
                url: url.clone(),
                attempt,
            });
            inner.refresh_load(&mut events);

            TaskLease {
                url,
                attempt,
                cancel: lease,
            }
        };

        self.dispatch(events);
        Some(lease)
    }

    /// Mark an in-progress URL completed. Returns false if it was not in progress.
    pub async fn mark_completed(&self, url: &str, result: R) -> bool {
        self.finish(url, None, Outcome::Success(result)).await
    }

    /// Mark an in-progress URL failed. Returns false if it was not in progress.
    pub async fn mark_failed(&self, url: &str, error: impl Into<String>) -> bool {
        self.finish(url, None, Outcome::Failure(error.into())).await
    }

    /// Complete the attempt held by `lease`. Stale attempts are ignored.
    pub async fn complete_attempt(&self, lease: &TaskLease, result: R) -> bool {
        self.finish(&lease.url, Some(lease.attempt), Outcome::Success(result))
            .await
    }

    /// Fail the attempt held by `lease`. Stale attempts are ignored.
    pub async fn fail_attempt(&self, lease: &TaskLease, error: impl Into<String>) -> bool {
        self.finish(
            &lease.url,
            Some(lease.attempt),
            Outcome::Failure(error.into()),
        )
        .await
    }

    pub(crate) async fn finish(&self, url: &str, attempt: Option<u32>, outcome: Outcome<R>) -> bool {
        let mut events = Vec::new();
        let drained = {
            let mut inner = self.shared.inner.lock();
            let max_retries = inner.config.max_retries;
            let retry_delay = inner.config.retry_delay() + inner.backpressure.current_delay();

            if !inner.tasks.contains_key(url) {
                drop(inner);
                let err = QueueError::UnknownTask(url.to_string());
                error!("{}", err);
                self.emit_error(&err);
                return false;
            }
            let Some(entry) = inner.tasks.get_mut(url) else {
                return false;
            };

            if entry.task.status != TaskStatus::InProgress
                || attempt.is_some_and(|a| a != entry.task.attempts)
            {
                debug!(
                    "Ignoring report for {} ({}, attempt {:?})",
                    url, entry.task.status, attempt
                );
                return false;
            }

            if let Some(timer) = entry.timer.take() {
                timer.cancel();
            }
            entry.lease = None;

            let elapsed = entry
                .started
                .take()
                .map(|s| s.elapsed())
                .unwrap_or_default();
            let attempts = entry.task.attempts;

            let settled = match outcome {
                Outcome::Success(result) => {
                    entry.task.status = TaskStatus::Completed;
                    entry.task.completed_at = Some(Utc::now());
                    entry.task.duration_ms = Some(elapsed.as_millis() as u64);
                    entry.task.error = None;
                    entry.task.result = Some(result.clone());
                    events.push(QueueEvent::Completed {
                        url: url.to_string(),
                        result,
                        duration: elapsed,
                    });
                    Settled::Completed
                }
                Outcome::Failure(error) if attempts < max_retries => {
                    entry.task.status = TaskStatus::Retrying;
                    entry.task.error = Some(error.clone());
                    entry.retry = Some(self.schedule_retry(url.to_string(), retry_delay));
                    events.push(QueueEvent::Retrying {
                        url: url.to_string(),
                        error,
                        attempt: attempts,
                        delay: retry_delay,
                    });
                    Settled::Retrying(retry_delay)
                }
                Outcome::Failure(error) => {
                    entry.task.status = TaskStatus::Failed;
                    entry.task.completed_at = Some(Utc::now());
                    entry.task.duration_ms = Some(elapsed.as_millis() as u64);
                    entry.task.error = Some(error.clone());
                    events.push(QueueEvent::Failed {
                        url: url.to_string(),
                        error,
                        attempts,
                    });
                    Settled::Failed
                }
            };

            inner.in_progress -= 1;
            let is_error = match settled {
                Settled::Completed => {
                    inner.completed.push(url.to_string());
                    inner.durations.record(elapsed);
                    false
                }
                Settled::Retrying(delay) => {
                    inner.retrying += 1;
                    debug!("Retrying {} in {}ms", url, delay.as_millis());
                    true
                }
                Settled::Failed => {
                    inner.failed.push(url.to_string());
                    true
                }
            };
            let terminal = inner.completed.len() + inner.failed.len();
            inner.cursor = inner.cursor.max(terminal);

            let transition = inner.backpressure.record_outcome(is_error);
            inner.push_transition(transition, &mut events);
            inner.refresh_load(&mut events);

            inner.try_fire_drain()
        };

        self.dispatch(events);
        if let Some(generation) = drained {
            self.complete_drain(generation).await;
        }
        true
    }

    /// Move a retrying URL back to pending.
    pub(crate) fn readmit(&self, url: &str) {
        let mut events = Vec::new();
        {
            let mut inner = self.shared.inner.lock();
            if inner.shut_down {
                return;
            }
            let Some(entry) = inner.tasks.get_mut(url) else {
                return;
            };
            if entry.task.status != TaskStatus::Retrying {
                return;
            }
            entry.task.status = TaskStatus::Pending;
            entry.retry = None;
            let key = (Reverse(entry.task.priority), entry.seq);

            inner.retrying -= 1;
            inner.pending.insert(key, url.to_string());
            inner.refresh_load(&mut events);
        }
        debug!("Re-admitted {} after retry delay", url);
        self.dispatch(events);
    }

    /// Force-fail an attempt whose hard timeout expired.
    pub(crate) async fn expire_attempt(&self, url: &str, attempt: u32, timeout: Duration) {
        let lease = {
            let inner = self.shared.inner.lock();
            match inner.tasks.get(url) {
                Some(entry)
                    if entry.task.status == TaskStatus::InProgress
                        && entry.task.attempts == attempt =>
                {
                    entry.lease.clone()
                }
                _ => None,
            }
        };

        let Some(lease) = lease else {
            return;
        };

        warn!(
            "Hard timeout for {} after {}ms (attempt {})",
            url,
            timeout.as_millis(),
            attempt
        );
        lease.cancel();
        self.finish(
            url,
            Some(attempt),
            Outcome::Failure(format!("hard timeout after {}ms", timeout.as_millis())),
        )
        .await;
    }

    /// Run the drain check now. Returns whether the queue is drained.
    ///
    /// Needed when a run starts on a queue that never had any work.
    pub async fn check_drained(&self) -> bool {
        let fire = self.shared.inner.lock().try_fire_drain();
        if let Some(generation) = fire {
            self.complete_drain(generation).await;
        }
        self.is_drained()
    }

    async fn complete_drain(&self, generation: u64) {
        if let Some(monitor) = &self.shared.monitor {
            monitor.stop();
        }

        if self.persistence_active() {
            match self.save_final_state().await {
                Ok(id) => debug!("Final state saved: {}", id),
                Err(e) => {
                    warn!("Final state save failed: {}", e);
                    self.emit_error(&e);
                }
            }
        }

        let stats = self.stats();
        info!(
            "Queue drained: {} completed, {} failed",
            stats.completed, stats.failed
        );
        for observer in self.observers() {
            observer.on_queue_empty(&stats);
        }

        let settled = {
            let mut inner = self.shared.inner.lock();
            let current = inner.drain_fired && inner.run_generation == generation;
            if current {
                inner.drained = true;
            }
            current
        };
        if settled {
            self.shared.drained.notify_waiters();
        } else {
            debug!("New work arrived during the final save, queue stays open");
        }
    }

    /// Whether the current run has drained and its final save finished.
    pub fn is_drained(&self) -> bool {
        self.shared.inner.lock().drained
    }

    /// Wait until the queue drains.
    pub async fn wait_drained(&self) {
        loop {
            let notified = self.shared.drained.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_drained() {
                return;
            }
            notified.await;
        }
    }

    /// Whether anything is pending, retrying or in progress.
    pub fn has_outstanding_work(&self) -> bool {
        self.shared.inner.lock().has_outstanding_work()
    }

    /// Stop handing out URLs. In-flight attempts keep running.
    pub fn pause(&self) {
        self.shared.inner.lock().paused = true;
        info!("Queue paused");
    }

    /// Resume handing out URLs after [`TaskQueue::pause`].
    pub fn resume_processing(&self) {
        self.shared.inner.lock().paused = false;
        info!("Queue resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.shared.inner.lock().paused
    }

    /// Cancel every timer and in-flight attempt and stop the monitor.
    pub fn shutdown(&self) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.shut_down {
                return;
            }
            inner.shut_down = true;
            for entry in inner.tasks.values_mut() {
                entry.cancel_timers();
            }
            if let Some(background) = inner.background.take() {
                background.cancel();
            }
        }

        if let Some(monitor) = &self.shared.monitor {
            monitor.stop();
        }
        info!("Queue shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.inner.lock().shut_down
    }

    /// Snapshot of one task.
    pub fn task(&self, url: &str) -> Option<Task<R>> {
        self.shared
            .inner
            .lock()
            .tasks
            .get(url)
            .map(|entry| entry.task.clone())
    }

    /// Pending URLs in dequeue order.
    pub fn pending_urls(&self) -> Vec<String> {
        self.shared.inner.lock().pending.values().cloned().collect()
    }

    /// Completed URLs with results, in completion order.
    pub fn results(&self) -> Vec<TaskResult<R>> {
        let inner = self.shared.inner.lock();
        inner
            .completed
            .iter()
            .filter_map(|url| {
                let task = &inner.tasks.get(url)?.task;
                Some(TaskResult {
                    url: url.clone(),
                    result: task.result.clone()?,
                    attempts: task.attempts,
                    duration_ms: task.duration_ms,
                })
            })
            .collect()
    }

    /// Terminally failed URLs, in failure order.
    pub fn failures(&self) -> Vec<FailureRecord> {
        let inner = self.shared.inner.lock();
        inner
            .failed
            .iter()
            .filter_map(|url| {
                let task = &inner.tasks.get(url)?.task;
                Some(FailureRecord {
                    url: url.clone(),
                    error: task.error.clone().unwrap_or_default(),
                    attempts: task.attempts,
                })
            })
            .collect()
    }

    pub fn backpressure(&self) -> BackpressureSnapshot {
        self.shared.inner.lock().backpressure.snapshot()
    }

    pub fn stats(&self) -> QueueStats {
        let resources = self.shared.monitor.as_ref().and_then(|m| m.latest());
        let inner = self.shared.inner.lock();

        let total = inner.tasks.len();
        let completed = inner.completed.len();
        let failed = inner.failed.len();
        let pending = inner.pending.len();
        let remaining = pending + inner.in_progress + inner.retrying;
        let avg = inner.durations.value_ms();

        QueueStats {
            total,
            pending,
            in_progress: inner.in_progress,
            retrying: inner.retrying,
            completed,
            failed,
            completion_percent: QueueStats::percent(completed + failed, total),
            avg_duration_ms: avg,
            eta_ms: QueueStats::estimate_eta(remaining, avg, inner.config.max_concurrent),
            elapsed_ms: inner
                .run_started
                .map(|s| s.elapsed().as_millis() as u64)
                .unwrap_or(0),
            resources,
            backpressure: inner.backpressure.snapshot(),
        }
    }

    pub(crate) fn observers(&self) -> Vec<Arc<dyn QueueObserver<R>>> {
        self.shared.observers.read().clone()
    }

    pub(crate) fn emit_error(&self, error: &QueueError) {
        for observer in self.observers() {
            observer.on_queue_error(error);
        }
    }

    pub(crate) fn dispatch(&self, events: Vec<QueueEvent<R>>) {
        if events.is_empty() {
            return;
        }
        let observers = self.observers();
        for event in &events {
            if let QueueEvent::Backpressure(transition, snapshot) = event {
                debug!(
                    "Backpressure {:?} (pressure {:.2}, delay {}ms)",
                    transition, snapshot.pressure, snapshot.delay_ms
                );
            }

            for observer in &observers {
                match event {
                    QueueEvent::Added { url, priority } => observer.on_task_added(url, *priority),
                    QueueEvent::Started { url, attempt } => {
                        observer.on_task_started(url, *attempt)
                    }
                    QueueEvent::Completed {
                        url,
                        result,
                        duration,
                    } => observer.on_task_completed(url, result, *duration),
                    QueueEvent::Retrying {
                        url,
                        error,
                        attempt,
                        delay,
                    } => observer.on_task_retrying(url, error, *attempt, *delay),
                    QueueEvent::Failed {
                        url,
                        error,
                        attempts,
                    } => observer.on_task_failed(url, error, *attempts),
                    QueueEvent::Backpressure(BackpressureTransition::Activated, snapshot) => {
                        observer.on_backpressure_activated(snapshot)
                    }
                    QueueEvent::Backpressure(BackpressureTransition::Deactivated, snapshot) => {
                        observer.on_backpressure_deactivated(snapshot)
                    }
                }
            }
        }
    }

    pub(crate) fn persistence_active(&self) -> bool {
        self.shared.persistence.enabled && self.shared.store.is_some()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;

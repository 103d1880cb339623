//! Worker pool for URL processing.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::QueueError;
use crate::processor::UrlProcessor;
use crate::queue::{TaskLease, TaskQueue};
use crate::stats::QueueStats;
use crate::task::{FailureRecord, QueueResult, TaskResult};

/// Per-worker counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkerStats {
    pub id: usize,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub tasks_abandoned: u64,
}

/// Result of a finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome<R> {
    /// Completed URLs, in completion order.
    pub results: Vec<TaskResult<R>>,
    pub failures: Vec<FailureRecord>,
    pub stats: QueueStats,
    pub workers: Vec<WorkerStats>,
    pub state_id: Option<String>,
    /// Whether the run stopped because of an external shutdown request.
    pub interrupted: bool,
}

struct Worker<R, P> {
    id: usize,
    queue: TaskQueue<R>,
    processor: Arc<P>,
    shutdown: CancellationToken,
    idle_poll: Duration,
    max_idle_polls: u32,
    stats: WorkerStats,
}

impl<R, P> Worker<R, P>
where
    R: QueueResult,
    P: UrlProcessor<Output = R>,
{
    async fn run(mut self) -> WorkerStats {
        debug!("Worker {} started", self.id);
        let mut idle_polls = 0u32;

        loop {
            if self.shutdown.is_cancelled() || self.queue.is_shut_down() {
                break;
            }

            if let Some(lease) = self.queue.get_next_url().await {
                idle_polls = 0;
                self.process(lease).await;
                continue;
            }

            if self.queue.has_outstanding_work() {
                idle_polls = 0;
            } else {
                idle_polls += 1;
                if idle_polls >= self.max_idle_polls {
                    break;
                }
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(self.idle_poll) => {}
            }
        }

        debug!(
            "Worker {} exiting ({} completed, {} failed)",
            self.id, self.stats.tasks_completed, self.stats.tasks_failed
        );
        self.stats
    }

    async fn process(&mut self, lease: TaskLease) {
        let url = lease.url().to_string();
        debug!(
            "Worker {} processing {} (attempt {})",
            self.id,
            url,
            lease.attempt()
        );

        let processor = self.processor.clone();
        let mut handle: JoinHandle<Result<R, String>> = tokio::spawn(async move {
            processor.process(&url).await.map_err(|e| e.to_string())
        });

        tokio::select! {
            biased;
            _ = lease.cancelled() => {
                handle.abort();
                self.stats.tasks_abandoned += 1;
                debug!("Worker {} abandoned {}", self.id, lease.url());
            }
            _ = self.shutdown.cancelled() => {
                handle.abort();
                self.stats.tasks_abandoned += 1;
            }
            joined = &mut handle => {
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_panic() => Err("processor panicked".to_string()),
                    Err(e) => Err(format!("processor task failed: {}", e)),
                };
                match outcome {
                    Ok(result) => {
                        if self.queue.complete_attempt(&lease, result).await {
                            self.stats.tasks_completed += 1;
                        }
                    }
                    Err(e) => {
                        if self.queue.fail_attempt(&lease, e).await {
                            self.stats.tasks_failed += 1;
                        }
                    }
                }
            }
        }
    }
}

/// Runs `max_concurrent` workers against a queue until it drains.
pub struct WorkerPool<R> {
    queue: TaskQueue<R>,
    shutdown: CancellationToken,
}

impl<R: QueueResult> WorkerPool<R> {
    /// Create a pool for `queue`.
    pub fn new(queue: TaskQueue<R>) -> Self {
        Self {
            queue,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn queue(&self) -> &TaskQueue<R> {
        &self.queue
    }

    /// Token that stops the run when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Process the queue until it drains.
    ///
    /// Fails with [`QueueError::GlobalTimeout`] when the run exceeds the
    /// configured global timeout; the queue is shut down in that case.
    pub async fn run<P>(&self, processor: Arc<P>) -> Result<RunOutcome<R>, QueueError>
    where
        P: UrlProcessor<Output = R>,
    {
        let config = self.queue.config();
        let workers = config.max_concurrent.max(1);
        let token = self.shutdown.child_token();

        self.queue.start();
        info!("Worker pool started with {} workers", workers);

        let handles: Vec<JoinHandle<WorkerStats>> = (0..workers)
            .map(|id| {
                let worker = Worker {
                    id,
                    queue: self.queue.clone(),
                    processor: processor.clone(),
                    shutdown: token.clone(),
                    idle_poll: config.idle_poll(),
                    max_idle_polls: config.max_idle_polls.max(1),
                    stats: WorkerStats {
                        id,
                        ..Default::default()
                    },
                };
                tokio::spawn(worker.run())
            })
            .collect();
        let work = async {
            let mut stats = Vec::with_capacity(handles.len());
            for joined in futures::future::join_all(handles).await {
                match joined {
                    Ok(s) => stats.push(s),
                    Err(e) => error!("Worker task failed: {}", e),
                }
            }
            if !token.is_cancelled() && !self.queue.is_shut_down() {
                self.queue.check_drained().await;
                self.queue.wait_drained().await;
            }
            stats
        };

        let worker_stats = match config.global_timeout() {
            Some(limit) => match tokio::time::timeout(limit, work).await {
                Ok(stats) => stats,
                Err(_) => {
                    token.cancel();
                    self.queue.shutdown();
                    error!("Run exceeded global timeout of {:?}", limit);
                    return Err(QueueError::GlobalTimeout(limit));
                }
            },
            None => work.await,
        };

        let interrupted = token.is_cancelled() || self.queue.is_shut_down();
        if interrupted {
            warn!("Worker pool interrupted before the queue drained");
            self.queue.shutdown();
        }

        let outcome = RunOutcome {
            results: self.queue.results(),
            failures: self.queue.failures(),
            stats: self.queue.stats(),
            workers: worker_stats,
            state_id: self.queue.state_id(),
            interrupted,
        };
        info!(
            "Worker pool finished: {} completed, {} failed",
            outcome.results.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;

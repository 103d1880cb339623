//! Run orchestration.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use auditq_checkpoint::{FileStateStore, StateStore};
use auditq_config::Config;
use auditq_monitor::{ReclaimHook, ResourceMonitor};
use auditq_workqueue::{
    LogObserver, QueueObserver, QueueResult, QueueStats, ResumeOptions, TaskQueue, UrlProcessor,
    WorkerPool,
};

use crate::error::PipelineError;
use crate::report::RunReport;

/// Called with queue stats on every progress tick and once at drain.
pub type ProgressCallback = Arc<dyn Fn(&QueueStats) + Send + Sync>;

struct ProgressObserver(ProgressCallback);

impl<R> QueueObserver<R> for ProgressObserver {
    fn on_progress(&self, stats: &QueueStats) {
        (self.0)(stats);
    }

    fn on_queue_empty(&self, stats: &QueueStats) {
        (self.0)(stats);
    }
}

/// Builds a queue from [`Config`], runs it to completion and reports.
pub struct AuditPipeline {
    config: Config,
    store: Option<Arc<dyn StateStore>>,
    progress: Option<ProgressCallback>,
    reclaim: Option<ReclaimHook>,
    shutdown: CancellationToken,
}

impl AuditPipeline {
    /// Create a pipeline. With persistence enabled, a file store is opened
    /// at the configured storage path.
    pub async fn new(config: Config) -> Result<Self, PipelineError> {
        let store: Option<Arc<dyn StateStore>> = if config.persistence.enabled {
            let store = FileStateStore::new(&config.persistence.storage_path).await?;
            Some(Arc::new(store))
        } else {
            None
        };
        Ok(Self {
            config,
            store,
            progress: None,
            reclaim: None,
            shutdown: CancellationToken::new(),
        })
    }

    /// Use `store` for checkpoints instead of the configured file store.
    pub fn with_store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.config.persistence.enabled = true;
        self.store = Some(store);
        self
    }

    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&QueueStats) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    /// Run `hook` on critical memory alerts.
    pub fn with_reclaim_hook(mut self, hook: ReclaimHook) -> Self {
        self.reclaim = Some(hook);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> Option<Arc<dyn StateStore>> {
        self.store.clone()
    }

    /// Cancelling the token stops the current run. With persistence, the
    /// queue is checkpointed so it can be resumed.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Process `urls` with `processor`.
    pub async fn run<P>(
        &self,
        urls: Vec<String>,
        processor: Arc<P>,
    ) -> Result<RunReport<P::Output>, PipelineError>
    where
        P: UrlProcessor,
        P::Output: QueueResult,
    {
        let queue = self.build_queue::<P::Output>()?;
        let offered = urls.len();
        let admitted = queue.add_urls(urls);
        info!("Queued {} URLs ({} offered)", admitted, offered);
        self.execute(queue, processor).await
    }

    /// Continue a checkpointed run, skipping URLs that already completed.
    pub async fn resume<P>(
        &self,
        state_id: &str,
        processor: Arc<P>,
    ) -> Result<RunReport<P::Output>, PipelineError>
    where
        P: UrlProcessor,
        P::Output: QueueResult,
    {
        self.resume_with(state_id, ResumeOptions::default(), processor)
            .await
    }

    pub async fn resume_with<P>(
        &self,
        state_id: &str,
        options: ResumeOptions,
        processor: Arc<P>,
    ) -> Result<RunReport<P::Output>, PipelineError>
    where
        P: UrlProcessor,
        P::Output: QueueResult,
    {
        if self.store.is_none() {
            return Err(PipelineError::PersistenceDisabled);
        }
        let queue = self.build_queue::<P::Output>()?;
        let summary = queue.resume_from_state(state_id, options).await?;
        info!(
            "Resuming {}: {} of {} URLs already done, {} pending",
            summary.state_id,
            summary.restored_completed + summary.restored_failed,
            summary.total,
            summary.pending
        );
        self.execute(queue, processor).await
    }

    fn build_queue<R: QueueResult>(&self) -> Result<TaskQueue<R>, PipelineError> {
        let mut builder = TaskQueue::builder(self.config.queue.clone())
            .backpressure(self.config.backpressure.clone())
            .observer(Arc::new(LogObserver));

        if let Some(callback) = &self.progress {
            builder = builder.observer(Arc::new(ProgressObserver(callback.clone())));
        }
        if self.config.monitor.enabled {
            let mut monitor = ResourceMonitor::new(self.config.monitor.clone())?;
            if let Some(hook) = &self.reclaim {
                monitor = monitor.with_reclaim_hook(hook.clone());
            }
            builder = builder.monitor(Arc::new(monitor));
        }
        if let Some(store) = &self.store {
            builder = builder.persistence(self.config.persistence.clone(), store.clone());
        }
        Ok(builder.build())
    }

    async fn execute<P>(
        &self,
        queue: TaskQueue<P::Output>,
        processor: Arc<P>,
    ) -> Result<RunReport<P::Output>, PipelineError>
    where
        P: UrlProcessor,
        P::Output: QueueResult,
    {
        let started = Instant::now();
        let pool = WorkerPool::new(queue.clone());

        let pool_token = pool.shutdown_token();
        let shutdown = self.shutdown.clone();
        let relay = tokio::spawn(async move {
            shutdown.cancelled().await;
            pool_token.cancel();
        });

        let outcome = pool.run(processor).await;
        relay.abort();
        let mut outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                self.checkpoint(&queue).await;
                return Err(e.into());
            }
        };

        if outcome.interrupted {
            if let Some(id) = self.checkpoint(&queue).await {
                outcome.state_id = Some(id);
            }
        }

        let report = RunReport::from_outcome(outcome, started.elapsed());
        info!(
            "Run finished in {}ms: {} completed, {} failed",
            report.total_duration_ms, report.summary.completed, report.summary.failed
        );
        Ok(report)
    }

    /// Save an unfinished queue so it can be resumed.
    async fn checkpoint<R: QueueResult>(&self, queue: &TaskQueue<R>) -> Option<String> {
        self.store.as_ref()?;
        match queue.save_state().await {
            Ok(id) => {
                info!("Run stopped early; resume with state ID {}", id);
                Some(id)
            }
            Err(e) => {
                warn!("Failed to checkpoint unfinished run: {}", e);
                None
            }
        }
    }
}

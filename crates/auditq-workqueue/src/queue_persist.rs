//! Queue checkpoints: save, resume and delete.

use std::collections::HashSet;

use auditq_checkpoint::{
    CheckpointError, FailedUrl, QueueState, StateOptions, StateStatus, StateStore,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::QueueError;
use crate::queue::TaskQueue;
use crate::task::{QueueResult, Task, TaskStatus};

/// How a saved run is resumed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResumeOptions {
    /// Keep completed and failed URLs from the snapshot instead of
    /// reprocessing every URL.
    pub skip_completed: bool,
}

impl Default for ResumeOptions {
    fn default() -> Self {
        Self {
            skip_completed: true,
        }
    }
}

/// What a resume restored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeSummary {
    pub state_id: String,
    pub total: usize,
    pub restored_completed: usize,
    pub restored_failed: usize,
    pub pending: usize,
}

impl<R: QueueResult> TaskQueue<R> {
    fn store(&self) -> Result<&dyn StateStore, QueueError> {
        self.shared
            .store
            .as_deref()
            .ok_or(QueueError::PersistenceDisabled)
    }

    /// ID of the state this queue saves to, once assigned.
    pub fn state_id(&self) -> Option<String> {
        self.shared.inner.lock().state_id.clone()
    }

    /// Build a snapshot of the current run.
    pub fn snapshot(&self) -> Result<QueueState, QueueError> {
        let mut inner = self.shared.inner.lock();

        let id = inner
            .state_id
            .get_or_insert_with(QueueState::generate_id)
            .clone();
        let started_at = *inner.state_started_at.get_or_insert_with(Utc::now);

        let status = if inner.drain_fired {
            StateStatus::Completed
        } else if inner.paused {
            StateStatus::Paused
        } else {
            StateStatus::Processing
        };

        let mut processed_urls = Vec::with_capacity(inner.completed.len());
        let mut results = Vec::with_capacity(inner.completed.len());
        for url in &inner.completed {
            let Some(result) = inner.tasks.get(url).and_then(|e| e.task.result.as_ref()) else {
                continue;
            };
            let value = serde_json::to_value(result)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
            processed_urls.push(url.clone());
            results.push(value);
        }

        let failed: Vec<FailedUrl> = inner
            .failed
            .iter()
            .filter_map(|url| {
                let task = &inner.tasks.get(url)?.task;
                Some(FailedUrl {
                    url: url.clone(),
                    error: task.error.clone().unwrap_or_default(),
                    attempts: task.attempts,
                })
            })
            .collect();

        let terminal = processed_urls.len() + failed.len();
        inner.cursor = inner.cursor.max(terminal);

        Ok(QueueState {
            id,
            urls: inner.order.clone(),
            processed_urls,
            failed,
            cursor: inner.cursor,
            results,
            started_at,
            updated_at: Utc::now(),
            options: StateOptions {
                max_concurrent: inner.config.max_concurrent,
                max_retries: inner.config.max_retries,
            },
            status,
        })
    }

    /// Save the current run. Returns the state ID.
    ///
    /// Saves are serialized per queue; a save that overlaps another waits
    /// for it and then writes a fresh snapshot.
    pub async fn save_state(&self) -> Result<String, QueueError> {
        let store = self.store()?;
        let _guard = self.shared.save_lock.lock().await;
        self.write_snapshot(store).await
    }

    /// Periodic save. Returns `None` when the run has already drained or
    /// stopped, so a late tick cannot overwrite the final snapshot.
    pub(crate) async fn auto_save(
        &self,
        token: &CancellationToken,
    ) -> Result<Option<String>, QueueError> {
        let store = self.store()?;
        let _guard = self.shared.save_lock.lock().await;
        {
            let inner = self.shared.inner.lock();
            if token.is_cancelled() || inner.drain_fired || inner.shut_down {
                return Ok(None);
            }
        }
        self.write_snapshot(store).await.map(Some)
    }

    /// Save a drained run, then drop the snapshot if the run is not resumable.
    pub(crate) async fn save_final_state(&self) -> Result<String, QueueError> {
        let store = self.store()?;
        let _guard = self.shared.save_lock.lock().await;
        let id = self.write_snapshot(store).await?;
        if !self.shared.persistence.resumable {
            store.delete(&id).await?;
            debug!("Deleted non-resumable state {}", id);
        }
        Ok(id)
    }

    /// Caller holds the save lock.
    async fn write_snapshot(&self, store: &dyn StateStore) -> Result<String, QueueError> {
        let state = self.snapshot()?;
        store.save(&state).await?;
        Ok(state.id)
    }

    /// Delete this queue's saved state, if any.
    pub async fn delete_state(&self) -> Result<(), QueueError> {
        let store = self.store()?;
        let Some(id) = self.state_id() else {
            return Ok(());
        };
        let _guard = self.shared.save_lock.lock().await;
        store.delete(&id).await?;
        info!("Deleted queue state {}", id);
        Ok(())
    }

    /// Load a saved run into this (empty) queue.
    ///
    /// The recorded `max_concurrent` and `max_retries` replace the queue's
    /// own. With `skip_completed`, finished URLs keep their results and only
    /// the rest are admitted as pending; otherwise every URL is admitted again.
    pub async fn resume_from_state(
        &self,
        state_id: &str,
        options: ResumeOptions,
    ) -> Result<ResumeSummary, QueueError> {
        let store = self.store()?;
        let state = store
            .load(state_id)
            .await?
            .ok_or_else(|| CheckpointError::NotFound(state_id.to_string()))?;
        state.validate()?;

        let mut restored = Vec::new();
        if options.skip_completed {
            for (url, value) in state.processed_urls.iter().zip(&state.results) {
                let result: R = serde_json::from_value(value.clone())
                    .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
                let mut task = Task::new(url.clone(), 0);
                task.status = TaskStatus::Completed;
                task.result = Some(result);
                restored.push(task);
            }
            for failed in &state.failed {
                let mut task = Task::new(failed.url.clone(), 0);
                task.status = TaskStatus::Failed;
                task.error = Some(failed.error.clone());
                task.attempts = failed.attempts;
                restored.push(task);
            }
        }

        let summary = {
            let mut inner = self.shared.inner.lock();
            if !inner.tasks.is_empty() {
                return Err(QueueError::InvalidState(
                    "resume requires an empty queue".to_string(),
                ));
            }

            inner.config.max_concurrent = state.options.max_concurrent;
            inner.config.max_retries = state.options.max_retries;
            inner.state_id = Some(state.id.clone());
            inner.state_started_at = Some(state.started_at);

            let restored_completed = restored
                .iter()
                .filter(|t| t.status == TaskStatus::Completed)
                .count();
            let restored_failed = restored.len() - restored_completed;
            // Without skip_completed nothing terminal is restored, so the
            // recorded cursor no longer applies.
            inner.cursor = if options.skip_completed {
                state.cursor
            } else {
                0
            };

            let mut known: HashSet<String> = HashSet::with_capacity(state.urls.len());
            for mut task in restored {
                task.priority = inner.config.priority_for(&task.url);
                known.insert(task.url.clone());
                inner.restore_terminal(task);
            }

            let mut pending = 0;
            for url in &state.urls {
                if !known.insert(url.clone()) {
                    continue;
                }
                let priority = inner.config.priority_for(url);
                inner.admit(url.clone(), priority);
                pending += 1;
            }

            ResumeSummary {
                state_id: state.id.clone(),
                total: inner.tasks.len(),
                restored_completed,
                restored_failed,
                pending,
            }
        };

        info!(
            "Resumed state {}: {} completed, {} failed, {} pending",
            summary.state_id, summary.restored_completed, summary.restored_failed, summary.pending
        );
        Ok(summary)
    }
}

#[cfg(test)]
#[path = "queue_persist_tests.rs"]
mod tests;

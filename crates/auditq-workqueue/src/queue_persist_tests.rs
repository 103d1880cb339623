use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use auditq_checkpoint::{FileStateStore, MemoryStateStore, PersistenceConfig};
use tokio::time::Instant;

use super::*;
use crate::config::QueueConfig;

fn persistence(state_id: &str) -> PersistenceConfig {
    PersistenceConfig {
        enabled: true,
        state_id: Some(state_id.to_string()),
        ..Default::default()
    }
}

fn persistent_queue(
    store: Arc<MemoryStateStore>,
    state_id: &str,
    config: QueueConfig,
) -> TaskQueue<String> {
    TaskQueue::builder(config)
        .persistence(persistence(state_id), store)
        .build()
}

fn urls(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("https://x.test/{}", i)).collect()
}

/// Memory store whose saves of one status take a while.
struct SlowStore {
    inner: MemoryStateStore,
    slow: StateStatus,
    delay: Duration,
}

impl SlowStore {
    fn new(slow: StateStatus, delay: Duration) -> Self {
        Self {
            inner: MemoryStateStore::new(),
            slow,
            delay,
        }
    }
}

#[async_trait]
impl StateStore for SlowStore {
    async fn save(&self, state: &QueueState) -> Result<(), CheckpointError> {
        if state.status == self.slow {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.save(state).await
    }

    async fn load(&self, id: &str) -> Result<Option<QueueState>, CheckpointError> {
        self.inner.load(id).await
    }

    async fn exists(&self, id: &str) -> Result<bool, CheckpointError> {
        self.inner.exists(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), CheckpointError> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> Result<Vec<String>, CheckpointError> {
        self.inner.list().await
    }

    async fn cleanup(&self, max_age: Duration) -> Result<usize, CheckpointError> {
        self.inner.cleanup(max_age).await
    }
}

/// Complete the first `n` claimed URLs, leaving the rest untouched.
async fn complete_first(queue: &TaskQueue<String>, n: usize) {
    for _ in 0..n {
        let lease = queue.get_next_url().await.unwrap();
        let result = format!("result:{}", lease.url());
        queue.complete_attempt(&lease, result).await;
    }
}

#[tokio::test]
async fn test_save_requires_store() {
    let queue: TaskQueue<String> = TaskQueue::new(QueueConfig::default());
    assert!(matches!(
        queue.save_state().await,
        Err(QueueError::PersistenceDisabled)
    ));
}

#[tokio::test]
async fn test_save_snapshot_contents() {
    let store = Arc::new(MemoryStateStore::new());
    let queue = persistent_queue(
        store.clone(),
        "run-1",
        QueueConfig {
            max_retries: 1,
            ..Default::default()
        },
    );
    let all = urls(3);
    queue.add_urls(all.clone());

    let a = queue.get_next_url().await.unwrap();
    let b = queue.get_next_url().await.unwrap();
    queue.complete_attempt(&a, "A".to_string()).await;
    queue.fail_attempt(&b, "boom").await;

    assert_eq!(queue.save_state().await.unwrap(), "run-1");

    let state = store.load("run-1").await.unwrap().unwrap();
    assert_eq!(state.urls, all);
    assert_eq!(state.processed_urls, vec![all[0].clone()]);
    assert_eq!(state.results, vec![serde_json::json!("A")]);
    assert_eq!(state.failed.len(), 1);
    assert_eq!(state.failed[0].url, all[1]);
    assert_eq!(state.failed[0].attempts, 1);
    assert_eq!(state.cursor, 2);
    assert_eq!(state.status, StateStatus::Processing);
    assert_eq!(state.options.max_concurrent, 3);
    assert_eq!(state.options.max_retries, 1);
    state.validate().unwrap();
}

#[tokio::test]
async fn test_generated_state_id_is_stable() {
    let store = Arc::new(MemoryStateStore::new());
    let queue: TaskQueue<String> = TaskQueue::builder(QueueConfig::default())
        .persistence(
            PersistenceConfig {
                enabled: true,
                ..Default::default()
            },
            store.clone(),
        )
        .build();
    queue.add_urls(urls(1));

    let first = queue.save_state().await.unwrap();
    let second = queue.save_state().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(queue.state_id(), Some(first));
}

#[tokio::test]
async fn test_paused_status() {
    let store = Arc::new(MemoryStateStore::new());
    let queue = persistent_queue(store.clone(), "paused", QueueConfig::default());
    queue.add_urls(urls(2));
    queue.pause();

    queue.save_state().await.unwrap();
    let state = store.load("paused").await.unwrap().unwrap();
    assert_eq!(state.status, StateStatus::Paused);
}

#[tokio::test]
async fn test_resume_skips_completed() {
    let store = Arc::new(MemoryStateStore::new());
    let all = urls(5);

    let first = persistent_queue(store.clone(), "run-2", QueueConfig::default());
    first.add_urls(all.clone());
    complete_first(&first, 2).await;
    first.save_state().await.unwrap();
    let before: Vec<_> = first.results().into_iter().map(|r| r.result).collect();
    first.shutdown();

    let second = persistent_queue(store.clone(), "other", QueueConfig::default());
    let summary = second
        .resume_from_state("run-2", ResumeOptions::default())
        .await
        .unwrap();

    assert_eq!(
        summary,
        ResumeSummary {
            state_id: "run-2".to_string(),
            total: 5,
            restored_completed: 2,
            restored_failed: 0,
            pending: 3,
        }
    );
    assert_eq!(second.pending_urls(), all[2..].to_vec());
    assert_eq!(second.state_id().as_deref(), Some("run-2"));

    let restored: Vec<_> = second.results().into_iter().map(|r| r.result).collect();
    assert_eq!(restored, before);

    complete_first(&second, 3).await;
    assert!(second.is_drained());

    let state = store.load("run-2").await.unwrap().unwrap();
    assert_eq!(state.status, StateStatus::Completed);
    assert_eq!(state.processed_urls.len(), 5);
    assert_eq!(
        &state.results[..2],
        &[serde_json::json!(before[0]), serde_json::json!(before[1])]
    );
    assert_eq!(state.cursor, 5);
}

#[tokio::test]
async fn test_resume_restores_failures() {
    let store = Arc::new(MemoryStateStore::new());
    let first = persistent_queue(
        store.clone(),
        "run-3",
        QueueConfig {
            max_retries: 1,
            ..Default::default()
        },
    );
    first.add_urls(urls(2));
    let lease = first.get_next_url().await.unwrap();
    first.fail_attempt(&lease, "gone").await;
    first.save_state().await.unwrap();

    let second = persistent_queue(store, "run-3", QueueConfig::default());
    let summary = second
        .resume_from_state("run-3", ResumeOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.restored_failed, 1);
    assert_eq!(summary.pending, 1);
    let failures = second.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error, "gone");
    assert_eq!(second.stats().failed, 1);
}

#[tokio::test]
async fn test_resume_adopts_recorded_options() {
    let store = Arc::new(MemoryStateStore::new());
    let first = persistent_queue(
        store.clone(),
        "opts",
        QueueConfig {
            max_concurrent: 7,
            max_retries: 5,
            ..Default::default()
        },
    );
    first.add_urls(urls(1));
    first.save_state().await.unwrap();

    let second = persistent_queue(store, "opts", QueueConfig::default());
    second
        .resume_from_state("opts", ResumeOptions::default())
        .await
        .unwrap();

    let config = second.config();
    assert_eq!(config.max_concurrent, 7);
    assert_eq!(config.max_retries, 5);
}

#[tokio::test]
async fn test_resume_without_skip_reprocesses_everything() {
    let store = Arc::new(MemoryStateStore::new());
    let first = persistent_queue(store.clone(), "redo", QueueConfig::default());
    first.add_urls(urls(4));
    complete_first(&first, 2).await;
    first.save_state().await.unwrap();

    let second = persistent_queue(store, "redo", QueueConfig::default());
    let summary = second
        .resume_from_state(
            "redo",
            ResumeOptions {
                skip_completed: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(summary.pending, 4);
    assert_eq!(summary.restored_completed, 0);
    assert!(second.results().is_empty());
    assert_eq!(second.pending_urls(), urls(4));

    assert_eq!(second.snapshot().unwrap().cursor, 0);
    complete_first(&second, 1).await;
    let state = second.snapshot().unwrap();
    assert_eq!(state.cursor, 1);
    assert_eq!(state.cursor, state.processed_urls.len() + state.failed.len());
}

#[tokio::test]
async fn test_resume_missing_state() {
    let store = Arc::new(MemoryStateStore::new());
    let queue = persistent_queue(store, "x", QueueConfig::default());

    let err = queue
        .resume_from_state("missing", ResumeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        QueueError::Persistence(CheckpointError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_resume_requires_empty_queue() {
    let store = Arc::new(MemoryStateStore::new());
    let first = persistent_queue(store.clone(), "busy", QueueConfig::default());
    first.add_urls(urls(1));
    first.save_state().await.unwrap();

    let err = first
        .resume_from_state("busy", ResumeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QueueError::InvalidState(_)));
}

#[tokio::test]
async fn test_non_resumable_state_deleted_at_drain() {
    let store = Arc::new(MemoryStateStore::new());
    let queue: TaskQueue<String> = TaskQueue::builder(QueueConfig::default())
        .persistence(
            PersistenceConfig {
                resumable: false,
                ..persistence("ephemeral")
            },
            store.clone(),
        )
        .build();
    queue.add_urls(urls(1));
    complete_first(&queue, 1).await;

    assert!(queue.is_drained());
    assert!(!store.exists("ephemeral").await.unwrap());
}

#[tokio::test]
async fn test_delete_state() {
    let store = Arc::new(MemoryStateStore::new());
    let queue = persistent_queue(store.clone(), "gone", QueueConfig::default());
    queue.add_urls(urls(1));
    queue.save_state().await.unwrap();
    assert!(store.exists("gone").await.unwrap());

    queue.delete_state().await.unwrap();
    assert!(!store.exists("gone").await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_auto_save() {
    let store = Arc::new(MemoryStateStore::new());
    let queue: TaskQueue<String> = TaskQueue::builder(QueueConfig::default())
        .persistence(
            PersistenceConfig {
                auto_save_interval_ms: 1000,
                ..persistence("auto")
            },
            store.clone(),
        )
        .build();
    queue.add_urls(urls(2));
    queue.start();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(!store.exists("auto").await.unwrap());

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(store.exists("auto").await.unwrap());

    queue.shutdown();
}

#[tokio::test]
async fn test_resume_from_file_store() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = Arc::new(FileStateStore::new(dir.path()).await.unwrap());
        let queue: TaskQueue<String> = TaskQueue::builder(QueueConfig::default())
            .persistence(persistence("disk"), store)
            .build();
        queue.add_urls(urls(3));
        complete_first(&queue, 1).await;
        queue.save_state().await.unwrap();
        queue.shutdown();
    }

    let store = Arc::new(FileStateStore::new(dir.path()).await.unwrap());
    let queue: TaskQueue<String> = TaskQueue::builder(QueueConfig::default())
        .persistence(persistence("disk"), store)
        .build();
    let summary = queue
        .resume_from_state("disk", ResumeOptions::default())
        .await
        .unwrap();

    assert_eq!(summary.restored_completed, 1);
    assert_eq!(summary.pending, 2);
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_auto_save_does_not_outlive_final_save() {
    for resumable in [true, false] {
        let store = Arc::new(SlowStore::new(
            StateStatus::Processing,
            Duration::from_millis(200),
        ));
        let queue: TaskQueue<String> = TaskQueue::builder(QueueConfig::default())
            .persistence(
                PersistenceConfig {
                    auto_save_interval_ms: 1000,
                    resumable,
                    ..persistence("late")
                },
                store.clone(),
            )
            .build();
        queue.add_urls(urls(1));
        queue.start();

        let lease = queue.get_next_url().await.unwrap();
        // The first auto-save is now mid-write.
        tokio::time::sleep(Duration::from_millis(1050)).await;
        queue.complete_attempt(&lease, "done".to_string()).await;
        assert!(queue.is_drained());

        // Let any straggling writes land.
        tokio::time::sleep(Duration::from_secs(3)).await;
        let stored = store.load("late").await.unwrap();
        if resumable {
            assert_eq!(stored.unwrap().status, StateStatus::Completed);
        } else {
            assert!(stored.is_none());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_urls_added_during_final_save_reopen_the_queue() {
    let store = Arc::new(SlowStore::new(
        StateStatus::Completed,
        Duration::from_millis(200),
    ));
    let queue: TaskQueue<String> = TaskQueue::builder(QueueConfig::default())
        .persistence(persistence("reopen"), store.clone())
        .build();
    queue.add_urls(urls(1));

    let lease = queue.get_next_url().await.unwrap();
    let finishing = {
        let queue = queue.clone();
        tokio::spawn(async move { queue.complete_attempt(&lease, "a".to_string()).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    queue.add_urls(["https://x.test/new"]);
    assert!(finishing.await.unwrap());

    assert!(!queue.is_drained());
    assert!(queue.has_outstanding_work());
    assert_eq!(queue.pending_urls(), vec!["https://x.test/new".to_string()]);

    complete_first(&queue, 1).await;
    assert!(queue.is_drained());
    let state = store.load("reopen").await.unwrap().unwrap();
    assert_eq!(state.status, StateStatus::Completed);
    assert_eq!(state.processed_urls.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_save_waits_for_running_save() {
    let store = Arc::new(SlowStore::new(
        StateStatus::Processing,
        Duration::from_millis(200),
    ));
    let queue: TaskQueue<String> = TaskQueue::builder(QueueConfig::default())
        .persistence(persistence("serial"), store)
        .build();
    queue.add_urls(urls(2));

    let start = Instant::now();
    let (first, second) = tokio::join!(queue.save_state(), queue.save_state());
    assert_eq!(first.unwrap(), "serial");
    assert_eq!(second.unwrap(), "serial");
    // One write after the other, never overlapping.
    assert!(start.elapsed() >= Duration::from_millis(400));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_to_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStateStore::new(dir.path()).await.unwrap());
    let queue: TaskQueue<String> = TaskQueue::builder(QueueConfig::default())
        .persistence(persistence("parallel"), store.clone())
        .build();
    queue.add_urls(urls(3));
    complete_first(&queue, 1).await;

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let queue = queue.clone();
            tokio::spawn(async move { queue.save_state().await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "parallel");
    }

    let state = store.load("parallel").await.unwrap().unwrap();
    assert_eq!(state.processed_urls.len(), 1);
    queue.shutdown();
}

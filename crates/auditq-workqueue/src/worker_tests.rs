use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;
use crate::config::QueueConfig;
use crate::processor::processor_fn;

fn urls(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| format!("https://x.test{}", p)).collect()
}

fn fast_config() -> QueueConfig {
    QueueConfig {
        idle_poll_ms: 5,
        max_idle_polls: 2,
        retry_delay_ms: 10,
        global_timeout_ms: 0,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_run_processes_all_urls() {
    let queue: TaskQueue<usize> = TaskQueue::new(fast_config());
    let paths: Vec<String> = (0..10).map(|i| format!("/{}", i)).collect();
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    queue.add_urls(urls(&refs));

    let pool = WorkerPool::new(queue.clone());
    let outcome = pool
        .run(Arc::new(processor_fn(|url: String| async move {
            Ok::<_, String>(url.len())
        })))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 10);
    assert!(outcome.failures.is_empty());
    assert_eq!(outcome.stats.completed, 10);
    assert_eq!(outcome.workers.len(), 3);
    assert_eq!(
        outcome.workers.iter().map(|w| w.tasks_completed).sum::<u64>(),
        10
    );
    assert!(!outcome.interrupted);
    assert!(queue.is_drained());
}

#[tokio::test]
async fn test_run_respects_concurrency_limit() {
    let queue: TaskQueue<()> = TaskQueue::new(QueueConfig {
        max_concurrent: 3,
        ..fast_config()
    });
    let paths: Vec<String> = (0..12).map(|i| format!("/{}", i)).collect();
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    queue.add_urls(urls(&refs));

    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let processor = {
        let current = current.clone();
        let peak = peak.clone();
        processor_fn(move |_url: String| {
            let current = current.clone();
            let peak = peak.clone();
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, String>(())
            }
        })
    };

    let outcome = WorkerPool::new(queue)
        .run(Arc::new(processor))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 12);
    let peak = peak.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= 3, "peak concurrency {}", peak);
}

#[tokio::test]
async fn test_processor_error_affects_only_its_url() {
    let queue: TaskQueue<String> = TaskQueue::new(QueueConfig {
        max_retries: 2,
        ..fast_config()
    });
    queue.add_urls(urls(&["/ok", "/bad", "/fine"]));

    let outcome = WorkerPool::new(queue)
        .run(Arc::new(processor_fn(|url: String| async move {
            if url.ends_with("/bad") {
                Err("status 500".to_string())
            } else {
                Ok(url)
            }
        })))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 2);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].url, "https://x.test/bad");
    assert_eq!(outcome.failures[0].error, "status 500");
    assert_eq!(outcome.failures[0].attempts, 2);
}

#[tokio::test]
async fn test_processor_panic_is_a_failure() {
    let queue: TaskQueue<String> = TaskQueue::new(QueueConfig {
        max_retries: 1,
        ..fast_config()
    });
    queue.add_urls(urls(&["/panic", "/ok"]));

    let outcome = WorkerPool::new(queue)
        .run(Arc::new(processor_fn(|url: String| async move {
            if url.ends_with("/panic") {
                panic!("processor bug");
            }
            Ok::<_, String>(url)
        })))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].error, "processor panicked");
}

#[tokio::test(start_paused = true)]
async fn test_hard_timeout_abandons_attempt() {
    let queue: TaskQueue<String> = TaskQueue::new(QueueConfig {
        max_retries: 1,
        hard_timeout_ms: 1000,
        ..fast_config()
    });
    queue.add_urls(urls(&["/slow", "/quick"]));

    let outcome = WorkerPool::new(queue)
        .run(Arc::new(processor_fn(|url: String| async move {
            if url.ends_with("/slow") {
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
            Ok::<_, String>(url)
        })))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].error, "hard timeout after 1000ms");
    assert_eq!(
        outcome.workers.iter().map(|w| w.tasks_abandoned).sum::<u64>(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_global_timeout_aborts_run() {
    let queue: TaskQueue<()> = TaskQueue::new(QueueConfig {
        hard_timeout_ms: 120_000,
        global_timeout_ms: 5000,
        ..fast_config()
    });
    queue.add_urls(urls(&["/stuck"]));

    let err = WorkerPool::new(queue.clone())
        .run(Arc::new(processor_fn(|_url: String| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, String>(())
        })))
        .await
        .unwrap_err();

    assert!(matches!(err, QueueError::GlobalTimeout(d) if d == Duration::from_secs(5)));
    assert!(queue.is_shut_down());
}

#[tokio::test(start_paused = true)]
async fn test_large_batch_with_default_config_finishes() {
    let queue: TaskQueue<()> = TaskQueue::new(QueueConfig::default());
    let paths: Vec<String> = (0..1000).map(|i| format!("/{}", i)).collect();
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    assert_eq!(queue.add_urls(urls(&refs)), 1000);
    assert_eq!(queue.backpressure().delay_ms, 0);

    let outcome = WorkerPool::new(queue.clone())
        .run(Arc::new(processor_fn(|_url: String| async move {
            Ok::<_, String>(())
        })))
        .await
        .unwrap();

    assert_eq!(outcome.stats.completed, 1000);
    assert!(!queue.backpressure().active);
}

#[tokio::test]
async fn test_empty_queue_drains_immediately() {
    let queue: TaskQueue<()> = TaskQueue::new(fast_config());

    let outcome = WorkerPool::new(queue.clone())
        .run(Arc::new(processor_fn(|_url: String| async move {
            Ok::<_, String>(())
        })))
        .await
        .unwrap();

    assert!(outcome.results.is_empty());
    assert!(outcome.stats.is_finished());
    assert!(queue.is_drained());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_token_interrupts_run() {
    let queue: TaskQueue<()> = TaskQueue::new(fast_config());
    queue.add_urls(urls(&["/a", "/b"]));

    let pool = Arc::new(WorkerPool::new(queue.clone()));
    let token = pool.shutdown_token();
    let run = {
        let pool = pool.clone();
        tokio::spawn(async move {
            pool.run(Arc::new(processor_fn(|_url: String| async move {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, String>(())
            })))
            .await
        })
    };

    tokio::time::sleep(Duration::from_secs(1)).await;
    token.cancel();

    let outcome = run.await.unwrap().unwrap();
    assert!(outcome.interrupted);
    assert!(outcome.results.is_empty());
    assert!(queue.is_shut_down());
}

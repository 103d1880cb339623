//! Task definition and status.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bounds every result payload must satisfy.
///
/// Results are cloned out to observers and serialized into queue state
/// snapshots, so they need to be cheap to copy around threads and JSON
/// round-trippable.
pub trait QueueResult: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> QueueResult for T where T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Waiting to be claimed.
    #[default]
    Pending,
    /// Claimed by a worker.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Exhausted its attempts.
    Failed,
    /// Waiting for its retry delay before returning to pending.
    Retrying,
}

impl TaskStatus {
    /// Whether the status is final.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in-progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Retrying => write!(f, "retrying"),
        }
    }
}

/// A URL tracked by the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task<R> {
    /// The URL, unique within a queue.
    pub url: String,
    /// Priority assigned at insertion.
    pub priority: i32,
    /// Current status.
    pub status: TaskStatus,
    /// Number of times the task was claimed.
    pub attempts: u32,
    /// Result, set once on success.
    pub result: Option<R>,
    /// Last error message.
    pub error: Option<String>,
    /// Start of the latest attempt.
    pub started_at: Option<DateTime<Utc>>,
    /// Time the task reached a terminal status.
    pub completed_at: Option<DateTime<Utc>>,
    /// Duration of the final attempt in milliseconds.
    pub duration_ms: Option<u64>,
}

impl<R> Task<R> {
    /// Create a pending task.
    pub fn new(url: impl Into<String>, priority: i32) -> Self {
        Self {
            url: url.into(),
            priority,
            status: TaskStatus::Pending,
            attempts: 0,
            result: None,
            error: None,
            started_at: None,
            completed_at: None,
            duration_ms: None,
        }
    }
}

/// A completed URL and its result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult<R> {
    pub url: String,
    pub result: R,
    pub attempts: u32,
    pub duration_ms: Option<u64>,
}

/// A URL that failed terminally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub url: String,
    pub error: String,
    pub attempts: u32,
}

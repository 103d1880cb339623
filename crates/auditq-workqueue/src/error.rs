//! Queue errors.

use std::time::Duration;

use auditq_checkpoint::CheckpointError;
use auditq_monitor::MonitorError;
use thiserror::Error;

/// Queue error types.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Completion or failure reported for a URL the queue never admitted.
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    /// Operation not valid in the queue's current state.
    #[error("Invalid queue state: {0}")]
    InvalidState(String),

    /// Persistence requested but no state store is configured.
    #[error("Persistence is not enabled")]
    PersistenceDisabled,

    /// State store failure.
    #[error("Persistence error: {0}")]
    Persistence(#[from] CheckpointError),

    /// Resource monitor failure.
    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    /// The whole run exceeded its time limit.
    #[error("Global timeout of {0:?} exceeded")]
    GlobalTimeout(Duration),
}

//! # auditq Checkpoint
//!
//! Checkpoint and resume support for long-running audit queues.
//!
//! ## Features
//!
//! - Serializable queue snapshots ([`QueueState`])
//! - Pluggable storage adapters (file, memory)
//! - Age-based cleanup of stale snapshots

pub mod config;
pub mod error;
pub mod state;
pub mod store;

pub use config::PersistenceConfig;
pub use error::CheckpointError;
pub use state::{FailedUrl, QueueState, StateOptions, StateStatus};
pub use store::{FileStateStore, MemoryStateStore, StateStore};

//! # auditq Work Queue
//!
//! Priority URL queue and worker pool for long-running audit batches.
//!
//! ## Features
//!
//! - Priority queue with pattern-based priority assignment
//! - Worker pool with bounded concurrency
//! - Automatic retries with per-attempt hard timeouts
//! - Adaptive backpressure driven by load, errors and resource samples
//! - Checkpoint and resume through a pluggable state store
//! - Typed observer hooks for every queue event

pub mod backpressure;
pub mod config;
pub mod error;
pub mod observer;
pub mod processor;
pub mod queue;
mod queue_persist;
mod queue_timers;
pub mod stats;
pub mod task;
pub mod worker;

pub use backpressure::{
    BackpressureConfig, BackpressureController, BackpressureSnapshot, BackpressureTransition,
};
pub use config::{PriorityRule, QueueConfig};
pub use error::QueueError;
pub use observer::{LogObserver, QueueObserver};
pub use processor::{FnProcessor, UrlProcessor, processor_fn};
pub use queue::{TaskLease, TaskQueue, TaskQueueBuilder};
pub use queue_persist::{ResumeOptions, ResumeSummary};
pub use stats::{DurationAverage, QueueStats};
pub use task::{FailureRecord, QueueResult, Task, TaskResult, TaskStatus};
pub use worker::{RunOutcome, WorkerPool, WorkerStats};

//! # auditq Monitor
//!
//! Process resource monitoring for the auditq work queue.
//!
//! ## Features
//!
//! - Periodic memory (RSS) and CPU sampling
//! - Warning / critical threshold alerts
//! - Optional reclaim hook on critical memory pressure

pub mod alerts;
pub mod config;
pub mod error;
pub mod monitor;
pub mod sampler;

pub use alerts::{AlertSeverity, ResourceAlert, ResourceKind};
pub use config::MonitorConfig;
pub use error::MonitorError;
pub use monitor::{ReclaimHook, ResourceListener, ResourceMonitor};
pub use sampler::{ResourceSampler, ResourceUsage, SysinfoSampler};

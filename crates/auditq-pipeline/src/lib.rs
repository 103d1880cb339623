//! # auditq Pipeline
//!
//! Wires the work queue to real inputs and outputs.
//!
//! ## Features
//!
//! - URL collection from sitemaps (including sitemap indexes) and URL lists
//! - HTTP probe processor
//! - Run orchestration with checkpoint/resume
//! - JSON run reports

pub mod error;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod sources;

pub use error::PipelineError;
pub use pipeline::{AuditPipeline, ProgressCallback};
pub use probe::{HttpProbe, ProbeResult};
pub use report::{RunReport, RunSummary};
pub use sources::{UrlCollector, UrlSource, extract_loc_values, is_sitemap_index, validate_url};

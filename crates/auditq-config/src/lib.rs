//! # auditq Config
//!
//! Configuration management for auditq.
//!
//! ## Features
//!
//! - TOML configuration with serde defaults for every field
//! - `${VAR}` environment substitution and `~` path expansion
//! - Cross-field validation with errors and warnings

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};

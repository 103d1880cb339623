//! Persistable queue snapshot.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CheckpointError;

/// Lifecycle tag of a saved run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateStatus {
    /// Run in progress.
    Processing,
    /// Run paused by the caller.
    Paused,
    /// Run drained.
    Completed,
}

impl std::fmt::Display for StateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateStatus::Processing => write!(f, "processing"),
            StateStatus::Paused => write!(f, "paused"),
            StateStatus::Completed => write!(f, "completed"),
        }
    }
}

/// Run options recorded with the snapshot and re-applied on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateOptions {
    /// Maximum concurrent tasks.
    pub max_concurrent: usize,
    /// Maximum attempts per URL.
    pub max_retries: u32,
}

/// A URL that exhausted its retries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUrl {
    /// The URL.
    pub url: String,
    /// Last error message.
    pub error: String,
    /// Attempts made.
    pub attempts: u32,
}

/// Snapshot of a queue run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueState {
    /// State ID (storage key).
    pub id: String,
    /// Every URL ever submitted, in insertion order.
    pub urls: Vec<String>,
    /// URLs that completed, in completion order.
    pub processed_urls: Vec<String>,
    /// URLs that failed terminally.
    pub failed: Vec<FailedUrl>,
    /// Number of URLs that reached a terminal state. Never decreases.
    pub cursor: usize,
    /// Results, index-aligned with `processed_urls`.
    pub results: Vec<serde_json::Value>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Run options.
    pub options: StateOptions,
    /// Lifecycle status.
    pub status: StateStatus,
}

impl QueueState {
    /// Create an empty snapshot.
    pub fn new(id: impl Into<String>, options: StateOptions) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            urls: Vec::new(),
            processed_urls: Vec::new(),
            failed: Vec::new(),
            cursor: 0,
            results: Vec::new(),
            started_at: now,
            updated_at: now,
            options,
            status: StateStatus::Processing,
        }
    }

    /// Generate a fresh state ID.
    pub fn generate_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Check that `id` is usable as a storage key.
    ///
    /// IDs are limited to ASCII letters, digits, `-` and `_` so that every
    /// ID maps to exactly one file name.
    pub fn validate_id(id: &str) -> Result<(), CheckpointError> {
        if id.is_empty() {
            return Err(CheckpointError::InvalidData(
                "state id cannot be empty".to_string(),
            ));
        }
        if let Some(c) = id
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(CheckpointError::InvalidData(format!(
                "state id '{}' contains invalid character {:?}",
                id, c
            )));
        }
        Ok(())
    }

    /// Check the snapshot's internal consistency.
    pub fn validate(&self) -> Result<(), CheckpointError> {
        Self::validate_id(&self.id)?;

        if self.results.len() != self.processed_urls.len() {
            return Err(CheckpointError::InvalidData(format!(
                "{} results for {} processed urls",
                self.results.len(),
                self.processed_urls.len()
            )));
        }

        let known: HashSet<&str> = self.urls.iter().map(String::as_str).collect();
        let terminal = self
            .processed_urls
            .iter()
            .map(String::as_str)
            .chain(self.failed.iter().map(|f| f.url.as_str()));
        for url in terminal {
            if !known.contains(url) {
                return Err(CheckpointError::InvalidData(format!(
                    "terminal url '{}' was never submitted",
                    url
                )));
            }
        }

        Ok(())
    }

    /// URLs that have not reached a terminal state.
    pub fn remaining_urls(&self) -> Vec<String> {
        let done: HashSet<&str> = self
            .processed_urls
            .iter()
            .map(String::as_str)
            .chain(self.failed.iter().map(|f| f.url.as_str()))
            .collect();

        self.urls
            .iter()
            .filter(|u| !done.contains(u.as_str()))
            .cloned()
            .collect()
    }

    /// Fraction of submitted URLs that reached a terminal state, in percent.
    pub fn progress_percent(&self) -> f64 {
        if self.urls.is_empty() {
            return 0.0;
        }
        (self.processed_urls.len() + self.failed.len()) as f64 / self.urls.len() as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> StateOptions {
        StateOptions {
            max_concurrent: 3,
            max_retries: 3,
        }
    }

    fn sample_state() -> QueueState {
        let mut state = QueueState::new("run-1", options());
        state.urls = vec!["/a".into(), "/b".into(), "/c".into(), "/d".into()];
        state.processed_urls = vec!["/b".into()];
        state.results = vec![serde_json::json!({"score": 90})];
        state.failed = vec![FailedUrl {
            url: "/c".into(),
            error: "boom".into(),
            attempts: 3,
        }];
        state.cursor = 2;
        state
    }

    #[test]
    fn test_remaining_urls_keeps_insertion_order() {
        let state = sample_state();
        assert_eq!(state.remaining_urls(), vec!["/a".to_string(), "/d".to_string()]);
    }

    #[test]
    fn test_progress_percent() {
        let state = sample_state();
        assert_eq!(state.progress_percent(), 50.0);
        assert_eq!(QueueState::new("x", options()).progress_percent(), 0.0);
    }

    #[test]
    fn test_validate_misaligned_results() {
        let mut state = sample_state();
        state.results.clear();
        assert!(matches!(
            state.validate(),
            Err(CheckpointError::InvalidData(_))
        ));
    }

    #[test]
    fn test_validate_unknown_terminal_url() {
        let mut state = sample_state();
        state.processed_urls.push("/zzz".into());
        state.results.push(serde_json::Value::Null);
        assert!(state.validate().is_err());
        assert!(sample_state().validate().is_ok());
    }

    #[test]
    fn test_validate_id() {
        assert!(QueueState::validate_id("run-1_a").is_ok());
        assert!(QueueState::validate_id(&QueueState::generate_id()).is_ok());

        for id in ["", "a.b", "../etc/passwd", "run 1", "caf\u{e9}"] {
            assert!(
                matches!(
                    QueueState::validate_id(id),
                    Err(CheckpointError::InvalidData(_))
                ),
                "{:?}",
                id
            );
        }

        let mut state = sample_state();
        state.id = "a.b".into();
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&StateStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
    }
}

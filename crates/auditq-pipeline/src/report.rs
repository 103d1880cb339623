//! Run reports.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use auditq_workqueue::{FailureRecord, RunOutcome, TaskResult, WorkerStats};

use crate::error::PipelineError;

/// Aggregate counts for a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub total_urls: usize,
    pub completed: usize,
    pub failed: usize,
    /// URLs left unprocessed by an interrupted run.
    pub remaining: usize,
    /// Completed share of finished URLs, 0..=100.
    pub success_rate: f64,
    pub average_duration_ms: Option<f64>,
    /// Attempts beyond the first, across all completed and failed URLs.
    pub retries: u64,
    pub interrupted: bool,
}

impl RunSummary {
    fn from_outcome<R>(outcome: &RunOutcome<R>) -> Self {
        let completed = outcome.results.len();
        let failed = outcome.failures.len();
        let finished = completed + failed;
        let success_rate = if finished == 0 {
            0.0
        } else {
            completed as f64 * 100.0 / finished as f64
        };

        let durations: Vec<u64> = outcome
            .results
            .iter()
            .filter_map(|r| r.duration_ms)
            .collect();
        let average_duration_ms = if durations.is_empty() {
            None
        } else {
            Some(durations.iter().sum::<u64>() as f64 / durations.len() as f64)
        };

        let retries = outcome
            .results
            .iter()
            .map(|r| r.attempts)
            .chain(outcome.failures.iter().map(|f| f.attempts))
            .map(|attempts| u64::from(attempts.saturating_sub(1)))
            .sum();

        Self {
            total_urls: outcome.stats.total,
            completed,
            failed,
            remaining: outcome.stats.remaining(),
            success_rate,
            average_duration_ms,
            retries,
            interrupted: outcome.interrupted,
        }
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<R> {
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
    pub summary: RunSummary,
    pub total_duration_ms: u64,
    pub results: Vec<TaskResult<R>>,
    pub failures: Vec<FailureRecord>,
    pub workers: Vec<WorkerStats>,
}

impl<R: Serialize> RunReport<R> {
    pub fn from_outcome(outcome: RunOutcome<R>, total_duration: Duration) -> Self {
        let summary = RunSummary::from_outcome(&outcome);
        Self {
            generated_at: Utc::now(),
            state_id: outcome.state_id,
            summary,
            total_duration_ms: total_duration.as_millis() as u64,
            results: outcome.results,
            failures: outcome.failures,
            workers: outcome.workers,
        }
    }

    /// Every URL finished and none failed.
    pub fn passed(&self) -> bool {
        self.failures.is_empty() && !self.summary.interrupted && self.summary.remaining == 0
    }

    pub fn to_json(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON, creating parent directories.
    pub async fn write_json(&self, path: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }
}

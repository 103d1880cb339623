//! Queue configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Assigns a priority to every URL containing `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityRule {
    /// Substring matched against the URL.
    pub pattern: String,
    /// Priority given on match. Higher dequeues first.
    pub priority: i32,
}

impl PriorityRule {
    /// Create a rule.
    pub fn new(pattern: impl Into<String>, priority: i32) -> Self {
        Self {
            pattern: pattern.into(),
            priority,
        }
    }
}

/// Queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of tasks in progress at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,

    /// Maximum attempts per URL (including the first).
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay before a failed attempt is re-admitted, in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Per-attempt hard timeout in milliseconds.
    #[serde(default = "default_hard_timeout")]
    pub hard_timeout_ms: u64,

    /// Whole-run timeout in milliseconds (0 = disabled).
    #[serde(default = "default_global_timeout")]
    pub global_timeout_ms: u64,

    /// Priority for URLs no rule matches.
    #[serde(default = "default_priority")]
    pub default_priority: i32,

    /// Priority rules, first match wins.
    #[serde(default)]
    pub priority_patterns: Vec<PriorityRule>,

    /// Worker sleep between empty polls, in milliseconds.
    #[serde(default = "default_idle_poll")]
    pub idle_poll_ms: u64,

    /// Consecutive empty polls on a drained queue before a worker exits.
    #[serde(default = "default_max_idle_polls")]
    pub max_idle_polls: u32,

    /// Progress report interval in milliseconds (0 = disabled).
    #[serde(default = "default_progress_interval")]
    pub progress_interval_ms: u64,
}

fn default_max_concurrent() -> usize {
    3
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1000
}

fn default_hard_timeout() -> u64 {
    30_000
}

fn default_global_timeout() -> u64 {
    300_000
}

fn default_priority() -> i32 {
    1
}

fn default_idle_poll() -> u64 {
    100
}

fn default_max_idle_polls() -> u32 {
    10
}

fn default_progress_interval() -> u64 {
    5000
}

impl QueueConfig {
    /// Priority for `url`: the first matching rule, else the default.
    pub fn priority_for(&self, url: &str) -> i32 {
        self.priority_patterns
            .iter()
            .find(|rule| url.contains(&rule.pattern))
            .map(|rule| rule.priority)
            .unwrap_or(self.default_priority)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn hard_timeout(&self) -> Duration {
        Duration::from_millis(self.hard_timeout_ms)
    }

    /// Global timeout, `None` when disabled.
    pub fn global_timeout(&self) -> Option<Duration> {
        (self.global_timeout_ms > 0).then(|| Duration::from_millis(self.global_timeout_ms))
    }

    pub fn idle_poll(&self) -> Duration {
        Duration::from_millis(self.idle_poll_ms)
    }

    /// Progress interval, `None` when disabled.
    pub fn progress_interval(&self) -> Option<Duration> {
        (self.progress_interval_ms > 0).then(|| Duration::from_millis(self.progress_interval_ms))
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            hard_timeout_ms: default_hard_timeout(),
            global_timeout_ms: default_global_timeout(),
            default_priority: default_priority(),
            priority_patterns: Vec::new(),
            idle_poll_ms: default_idle_poll(),
            max_idle_polls: default_max_idle_polls(),
            progress_interval_ms: default_progress_interval(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_first_match_wins() {
        let config = QueueConfig {
            priority_patterns: vec![
                PriorityRule::new("/home", 10),
                PriorityRule::new("/ho", 5),
            ],
            ..Default::default()
        };

        assert_eq!(config.priority_for("https://x.test/home"), 10);
        assert_eq!(config.priority_for("https://x.test/hobbies"), 5);
        assert_eq!(config.priority_for("https://x.test/about"), 1);
    }

    #[test]
    fn test_zero_disables_optional_timers() {
        let config = QueueConfig {
            global_timeout_ms: 0,
            progress_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.global_timeout().is_none());
        assert!(config.progress_interval().is_none());
        assert_eq!(
            QueueConfig::default().global_timeout(),
            Some(Duration::from_secs(300))
        );
    }

    #[test]
    fn test_deserialize_empty_uses_defaults() {
        let config: QueueConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.hard_timeout_ms, 30_000);
        assert!(config.priority_patterns.is_empty());
    }
}

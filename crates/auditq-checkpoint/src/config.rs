//! Persistence configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Whether queue state is persisted.
    #[serde(default)]
    pub enabled: bool,

    /// Storage path for state files.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Auto-save interval in milliseconds.
    #[serde(default = "default_auto_save_interval")]
    pub auto_save_interval_ms: u64,

    /// Whether runs may be resumed from a saved state.
    #[serde(default = "default_resumable")]
    pub resumable: bool,

    /// Fixed state ID (a UUID is generated when unset).
    #[serde(default)]
    pub state_id: Option<String>,
}

fn default_storage_path() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".auditq"))
        .unwrap_or_else(|| PathBuf::from("/tmp/auditq"))
}

fn default_auto_save_interval() -> u64 {
    30_000
}

fn default_resumable() -> bool {
    true
}

impl PersistenceConfig {
    /// Auto-save interval as a [`Duration`].
    pub fn auto_save_interval(&self) -> Duration {
        Duration::from_millis(self.auto_save_interval_ms)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            storage_path: default_storage_path(),
            auto_save_interval_ms: default_auto_save_interval(),
            resumable: default_resumable(),
            state_id: None,
        }
    }
}

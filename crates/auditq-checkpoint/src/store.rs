//! Queue state storage.

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::CheckpointError;
use crate::state::QueueState;

/// Queue state storage trait.
///
/// A plain key-value store keyed by state ID. Every failure is reported as a
/// [`CheckpointError`].
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Save (create or overwrite) a state.
    async fn save(&self, state: &QueueState) -> Result<(), CheckpointError>;

    /// Load a state by ID.
    async fn load(&self, id: &str) -> Result<Option<QueueState>, CheckpointError>;

    /// Check whether a state exists.
    async fn exists(&self, id: &str) -> Result<bool, CheckpointError>;

    /// Delete a state. Deleting a missing state is not an error.
    async fn delete(&self, id: &str) -> Result<(), CheckpointError>;

    /// List all stored state IDs.
    async fn list(&self) -> Result<Vec<String>, CheckpointError>;

    /// Delete states not updated within `max_age`. Returns the number removed.
    async fn cleanup(&self, max_age: Duration) -> Result<usize, CheckpointError>;
}

fn cutoff(max_age: Duration) -> Result<DateTime<Utc>, CheckpointError> {
    let age = chrono::Duration::from_std(max_age)
        .map_err(|e| CheckpointError::InvalidData(format!("max age out of range: {}", e)))?;
    Ok(Utc::now() - age)
}

/// In-memory state store for testing.
pub struct MemoryStateStore {
    states: RwLock<HashMap<String, QueueState>>,
}

impl MemoryStateStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            states: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn save(&self, state: &QueueState) -> Result<(), CheckpointError> {
        QueueState::validate_id(&state.id)?;
        let mut states = self.states.write().await;
        states.insert(state.id.clone(), state.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<QueueState>, CheckpointError> {
        let states = self.states.read().await;
        Ok(states.get(id).cloned())
    }

    async fn exists(&self, id: &str) -> Result<bool, CheckpointError> {
        let states = self.states.read().await;
        Ok(states.contains_key(id))
    }

    async fn delete(&self, id: &str) -> Result<(), CheckpointError> {
        let mut states = self.states.write().await;
        states.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let states = self.states.read().await;
        let mut ids: Vec<String> = states.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn cleanup(&self, max_age: Duration) -> Result<usize, CheckpointError> {
        let cutoff = cutoff(max_age)?;
        let mut states = self.states.write().await;
        let before = states.len();
        states.retain(|_, s| s.updated_at >= cutoff);
        Ok(before - states.len())
    }
}

/// File system based state store.
///
/// Each state is one JSON file:
/// ```text
/// {storage_path}/
/// └── states/
///     ├── {state_id}.json
///     └── ...
/// ```
/// Writes go to a uniquely named temporary file first and are renamed into
/// place, so a crash mid-write never leaves a truncated snapshot behind.
/// State IDs must pass [`QueueState::validate_id`].
pub struct FileStateStore {
    /// Base storage path.
    storage_path: PathBuf,
}

impl FileStateStore {
    /// Create a new file-based state store.
    ///
    /// # Arguments
    /// * `storage_path` - Base directory for storing state files
    pub async fn new(storage_path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let storage_path = storage_path.into();
        fs::create_dir_all(storage_path.join("states")).await?;

        debug!("FileStateStore initialized at {:?}", storage_path);

        Ok(Self { storage_path })
    }

    /// Get the states directory path.
    fn states_dir(&self) -> PathBuf {
        self.storage_path.join("states")
    }

    /// Get the file path for a state. Rejects IDs that are not plain file stems.
    fn state_path(&self, id: &str) -> Result<PathBuf, CheckpointError> {
        QueueState::validate_id(id)?;
        Ok(self.states_dir().join(format!("{}.json", id)))
    }

    /// Unique temporary path next to the state file, so overlapping saves of
    /// one ID never share a temp file.
    fn temp_path(&self, id: &str) -> PathBuf {
        self.states_dir().join(format!("{}.{}.json.tmp", id, Uuid::new_v4()))
    }

    async fn read_state(&self, path: &PathBuf) -> Result<QueueState, CheckpointError> {
        let content = fs::read_to_string(path).await?;
        serde_json::from_str(&content).map_err(|e| {
            CheckpointError::Serialization(format!("Failed to deserialize state: {}", e))
        })
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn save(&self, state: &QueueState) -> Result<(), CheckpointError> {
        let path = self.state_path(&state.id)?;
        let tmp = self.temp_path(&state.id);

        let content = serde_json::to_string_pretty(state).map_err(|e| {
            CheckpointError::Serialization(format!("Failed to serialize state: {}", e))
        })?;

        fs::write(&tmp, content).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(
            "Saved state '{}' ({} urls, cursor {}) to {:?}",
            state.id,
            state.urls.len(),
            state.cursor,
            path
        );
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<QueueState>, CheckpointError> {
        let path = self.state_path(id)?;
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }

        self.read_state(&path).await.map(Some)
    }

    async fn exists(&self, id: &str) -> Result<bool, CheckpointError> {
        Ok(fs::try_exists(self.state_path(id)?).await?)
    }

    async fn delete(&self, id: &str) -> Result<(), CheckpointError> {
        let path = self.state_path(id)?;
        if fs::try_exists(&path).await? {
            fs::remove_file(&path).await?;
            debug!("Deleted state '{}'", id);
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, CheckpointError> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(self.states_dir()).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) if QueueState::validate_id(stem).is_ok() => {
                        ids.push(stem.to_string())
                    }
                    _ => debug!("Ignoring foreign file {:?}", path),
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    async fn cleanup(&self, max_age: Duration) -> Result<usize, CheckpointError> {
        let cutoff = cutoff(max_age)?;
        let mut removed = 0;

        for id in self.list().await? {
            let path = self.state_path(&id)?;
            match self.read_state(&path).await {
                Ok(state) if state.updated_at < cutoff => {
                    fs::remove_file(&path).await?;
                    removed += 1;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Skipping unreadable state file {:?}: {}", path, e);
                }
            }
        }

        if removed > 0 {
            info!("Cleaned up {} stale queue states", removed);
        }
        Ok(removed)
    }
}

//! Checkpoint storage.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use sagaflow_config::{CheckpointBackend, CheckpointConfig, ConfigLoader};

use crate::checkpoint::Checkpoint;
use crate::error::CheckpointError;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;

/// Checkpoint storage trait.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Save a checkpoint.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError>;

    /// Get a checkpoint by ID.
    async fn get(&self, id: &Uuid) -> Result<Option<Checkpoint>, CheckpointError>;

    /// Get the checkpoint with the highest sequence for a run.
    async fn get_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError>;

    /// List all checkpoints for a run, ordered by sequence.
    async fn list(&self, run_id: &str) -> Result<Vec<Checkpoint>, CheckpointError>;

    /// Delete a checkpoint.
    async fn delete(&self, id: &Uuid) -> Result<(), CheckpointError>;

    /// Delete all checkpoints for a run.
    async fn delete_run(&self, run_id: &str) -> Result<(), CheckpointError>;

    /// IDs of every run with at least one checkpoint, sorted.
    async fn list_runs(&self) -> Result<Vec<String>, CheckpointError>;
}

/// Build the store selected by `config`.
pub async fn open_store(config: &CheckpointConfig) -> Result<Arc<dyn CheckpointStore>, CheckpointError> {
    match config.backend {
        CheckpointBackend::Memory => Ok(Arc::new(MemoryCheckpointStore::new())),
        CheckpointBackend::File => {
            let path = ConfigLoader::expand_path(&config.storage_path);
            Ok(Arc::new(FileCheckpointStore::new(path).await?))
        }
    }
}

/// In-memory checkpoint store for testing.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    checkpoints: RwLock<HashMap<Uuid, Checkpoint>>,
}

impl MemoryCheckpointStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let mut store = self.checkpoints.write().await;
        store.insert(checkpoint.id, checkpoint.clone());
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Checkpoint>, CheckpointError> {
        let store = self.checkpoints.read().await;
        Ok(store.get(id).cloned())
    }

    async fn get_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let store = self.checkpoints.read().await;
        let latest = store
            .values()
            .filter(|cp| cp.run_id == run_id)
            .max_by_key(|cp| cp.sequence)
            .cloned();
        Ok(latest)
    }

    async fn list(&self, run_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        let store = self.checkpoints.read().await;
        let mut checkpoints: Vec<_> = store
            .values()
            .filter(|cp| cp.run_id == run_id)
            .cloned()
            .collect();
        checkpoints.sort_by_key(|cp| cp.sequence);
        Ok(checkpoints)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), CheckpointError> {
        let mut store = self.checkpoints.write().await;
        store.remove(id);
        Ok(())
    }

    async fn delete_run(&self, run_id: &str) -> Result<(), CheckpointError> {
        let mut store = self.checkpoints.write().await;
        store.retain(|_, cp| cp.run_id != run_id);
        Ok(())
    }

    async fn list_runs(&self) -> Result<Vec<String>, CheckpointError> {
        let store = self.checkpoints.read().await;
        let mut runs: Vec<_> = store.values().map(|cp| cp.run_id.clone()).collect();
        runs.sort();
        runs.dedup();
        Ok(runs)
    }
}

/// File system based checkpoint store.
///
/// Checkpoints are stored as individual JSON files organized by run:
/// ```text
/// {storage_path}/
/// └── runs/
///     └── {run_id}/
///         ├── {uuid}_seq_{sequence}.json
///         └── ...
/// ```
pub struct FileCheckpointStore {
    /// Base storage path.
    storage_path: PathBuf,
}

impl FileCheckpointStore {
    /// Create a new file-based checkpoint store rooted at `storage_path`.
    pub async fn new(storage_path: impl Into<PathBuf>) -> Result<Self, CheckpointError> {
        let storage_path = storage_path.into();
        fs::create_dir_all(storage_path.join("runs")).await?;

        debug!("FileCheckpointStore initialized at {:?}", storage_path);

        Ok(Self { storage_path })
    }

    fn runs_dir(&self) -> PathBuf {
        self.storage_path.join("runs")
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.runs_dir().join(Self::sanitize_run_id(run_id))
    }

    fn checkpoint_path(&self, run_id: &str, id: &Uuid, sequence: u32) -> PathBuf {
        self.run_dir(run_id)
            .join(format!("{}_seq_{:06}.json", id, sequence))
    }

    /// Sanitize a run ID for use as directory name.
    fn sanitize_run_id(run_id: &str) -> String {
        run_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    }

    /// Parse checkpoint ID and sequence from filename.
    fn parse_filename(filename: &str) -> Option<(Uuid, u32)> {
        // Format: {uuid}_seq_{sequence}.json
        let stem = filename.strip_suffix(".json")?;
        let (id, sequence) = stem.split_once("_seq_")?;
        Some((Uuid::parse_str(id).ok()?, sequence.parse().ok()?))
    }

    /// Read every checkpoint file in one directory, skipping unreadable ones.
    async fn read_dir_checkpoints(dir: &PathBuf) -> Result<Vec<Checkpoint>, CheckpointError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut checkpoints = Vec::new();
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            match fs::read_to_string(&path).await {
                Ok(content) => match serde_json::from_str::<Checkpoint>(&content) {
                    Ok(checkpoint) => checkpoints.push(checkpoint),
                    Err(e) => warn!("Failed to deserialize checkpoint from {:?}: {}", path, e),
                },
                Err(e) => warn!("Failed to read checkpoint file {:?}: {}", path, e),
            }
        }

        Ok(checkpoints)
    }

    /// Find a checkpoint file by ID.
    async fn find_checkpoint_file(&self, id: &Uuid) -> Result<Option<PathBuf>, CheckpointError> {
        let mut runs = fs::read_dir(self.runs_dir()).await?;

        while let Some(run_entry) = runs.next_entry().await? {
            let run_path = run_entry.path();
            if !run_path.is_dir() {
                continue;
            }

            let mut files = fs::read_dir(&run_path).await?;
            while let Some(file_entry) = files.next_entry().await? {
                let file_path = file_entry.path();
                let matches = file_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(Self::parse_filename)
                    .is_some_and(|(file_id, _)| file_id == *id);
                if matches {
                    return Ok(Some(file_path));
                }
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        fs::create_dir_all(self.run_dir(&checkpoint.run_id)).await?;

        let path = self.checkpoint_path(&checkpoint.run_id, &checkpoint.id, checkpoint.sequence);
        let content = serde_json::to_string_pretty(checkpoint).map_err(|e| {
            CheckpointError::Serialization(format!("Failed to serialize checkpoint: {}", e))
        })?;

        fs::write(&path, content).await?;

        debug!(
            "Saved {:?} checkpoint {} of run '{}' to {:?}",
            checkpoint.state, checkpoint.sequence, checkpoint.run_id, path
        );
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<Checkpoint>, CheckpointError> {
        let Some(path) = self.find_checkpoint_file(id).await? else {
            return Ok(None);
        };

        let content = fs::read_to_string(&path).await?;
        let checkpoint = serde_json::from_str(&content).map_err(|e| {
            CheckpointError::Serialization(format!("Failed to deserialize checkpoint: {}", e))
        })?;

        Ok(Some(checkpoint))
    }

    async fn get_latest(&self, run_id: &str) -> Result<Option<Checkpoint>, CheckpointError> {
        let checkpoints = Self::read_dir_checkpoints(&self.run_dir(run_id)).await?;
        Ok(checkpoints.into_iter().max_by_key(|cp| cp.sequence))
    }

    async fn list(&self, run_id: &str) -> Result<Vec<Checkpoint>, CheckpointError> {
        let mut checkpoints = Self::read_dir_checkpoints(&self.run_dir(run_id)).await?;
        checkpoints.sort_by_key(|cp| cp.sequence);
        Ok(checkpoints)
    }

    async fn delete(&self, id: &Uuid) -> Result<(), CheckpointError> {
        if let Some(path) = self.find_checkpoint_file(id).await? {
            fs::remove_file(&path).await?;
            debug!("Deleted checkpoint '{}'", id);
        }
        Ok(())
    }

    async fn delete_run(&self, run_id: &str) -> Result<(), CheckpointError> {
        let run_dir = self.run_dir(run_id);

        if run_dir.exists() {
            fs::remove_dir_all(&run_dir).await?;
            debug!("Deleted all checkpoints for run '{}'", run_id);
        }

        Ok(())
    }

    async fn list_runs(&self) -> Result<Vec<String>, CheckpointError> {
        let mut runs = Vec::new();
        let mut entries = fs::read_dir(self.runs_dir()).await?;

        // Directory names are sanitized, so read the real ID from a checkpoint.
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(cp) = Self::read_dir_checkpoints(&path).await?.into_iter().next() {
                runs.push(cp.run_id);
            }
        }

        runs.sort();
        Ok(runs)
    }
}

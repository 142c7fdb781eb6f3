//! Durable snapshot persistence.
//!
//! The snapshot file is the only durable state the bot keeps. Writes go
//! through a temp file and a rename so a crash mid-save can lose at most the
//! last unsaved mutation, never leave a torn file.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::models::Snapshot;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Reads and writes the snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load the persisted snapshot, or a default empty one if the file does
    /// not exist yet.
    pub fn load(&self) -> Result<Snapshot, StorageError> {
        if !self.path.exists() {
            debug!("No snapshot at {:?}, starting empty", self.path);
            return Ok(Snapshot::default());
        }

        let contents = fs::read_to_string(&self.path)?;
        let snapshot = serde_json::from_str(&contents)?;
        Ok(snapshot)
    }

    /// Persist the snapshot atomically (write temp, then rename).
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(snapshot)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;

        debug!("Saved snapshot to {:?}", self.path);
        Ok(())
    }
}

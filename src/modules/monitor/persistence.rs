/// Best-effort session persistence for the monitor store
///
/// The store writes a full snapshot after each mutation and reads one back
/// at startup. Corruption or absence falls back to an empty store; a save
/// failure is logged and swallowed, never surfaced to the caller.
use crate::modules::monitor::domain::{Job, MonitorConfig, Notification};
use crate::shared::errors::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything worth carrying across dashboard sessions. Connection status
/// is deliberately absent: reachability is re-observed on the first tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    #[serde(default)]
    pub active: Vec<Job>,
    #[serde(default)]
    pub completed: Vec<Job>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    pub config: Option<MonitorConfig>,
}

/// Pluggable snapshot capability, injected into the store so tests and the
/// browser shell can supply their own backing blob.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns `Ok(None)` when no prior session exists.
    async fn load(&self) -> AppResult<Option<StoreSnapshot>>;
    async fn save(&self, snapshot: &StoreSnapshot) -> AppResult<()>;
}

/// JSON file on disk, the desktop-shell equivalent of the browser's local
/// key-value blob.
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> AppResult<Option<StoreSnapshot>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(AppError::PersistenceError(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    err
                )))
            }
        };

        let snapshot = serde_json::from_str(&raw).map_err(|err| {
            AppError::PersistenceError(format!(
                "Corrupt snapshot at {}: {}",
                self.path.display(),
                err
            ))
        })?;
        Ok(Some(snapshot))
    }

    async fn save(&self, snapshot: &StoreSnapshot) -> AppResult<()> {
        let raw = serde_json::to_string(snapshot)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

/// No-op store for tests and for running with persistence disabled
#[derive(Default)]
pub struct NullSnapshotStore;

#[async_trait]
impl SnapshotStore for NullSnapshotStore {
    async fn load(&self) -> AppResult<Option<StoreSnapshot>> {
        Ok(None)
    }

    async fn save(&self, _snapshot: &StoreSnapshot) -> AppResult<()> {
        Ok(())
    }
}

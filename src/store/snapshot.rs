//! Persisted timer snapshot.
//!
//! The whole [`TimerState`] is stored as one JSON object under a fixed key and
//! overwritten in place after every mutation. Writes go to a sibling temporary
//! file first and are renamed over the target, so a crash mid-write leaves the
//! previous snapshot intact.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::TimerState;

use super::error::StoreError;

/// Key the snapshot is stored under.
pub const STORAGE_KEY: &str = "pomodoro-storage";

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    #[serde(rename = "pomodoro-storage")]
    state: &'a TimerState,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "pomodoro-storage")]
    state: TimerState,
}

/// File-backed snapshot store.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Creates a store writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the snapshot file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| STORAGE_KEY.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Loads the snapshot.
    ///
    /// Returns `Ok(None)` when no snapshot has been written yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CorruptSnapshot`] if the file exists but cannot be
    /// parsed, or [`StoreError::Io`] if it cannot be read.
    pub fn load(&self) -> Result<Option<TimerState>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };

        let envelope: Envelope =
            serde_json::from_str(&contents).map_err(|source| StoreError::CorruptSnapshot {
                path: self.path.clone(),
                source,
            })?;
        Ok(Some(envelope.state))
    }

    /// Loads the snapshot, falling back to the default state.
    ///
    /// A corrupt snapshot is removed so the next save starts clean.
    pub fn load_or_default(&self) -> TimerState {
        match self.load() {
            Ok(Some(state)) => {
                debug!("スナップショットを読み込みました: {}", self.path.display());
                state
            }
            Ok(None) => TimerState::default(),
            Err(e) => {
                warn!("{} ({})", e, e.suggestion());
                if e.is_corrupt_snapshot() {
                    if let Err(e) = self.discard() {
                        warn!("破損したスナップショットを削除できませんでした: {}", e);
                    }
                }
                TimerState::default()
            }
        }
    }

    /// Writes `state` atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, temporary file or rename fails.
    pub fn save(&self, state: &TimerState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
            }
        }

        let json = serde_json::to_string(&EnvelopeRef { state })?;
        let temp = self.temp_path();
        fs::write(&temp, json).map_err(|e| StoreError::io(&temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }

    /// Removes the snapshot file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn discard(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }
}

//! Persistent storage for the Pomodoro Timer.
//!
//! - [`SnapshotStore`]: the single persisted timer snapshot
//! - [`SessionLog`]: history of completed sessions and aggregates

mod error;
pub mod sessions;
pub mod snapshot;

pub use error::StoreError;
pub use sessions::{SessionLog, RETENTION_DAYS};
pub use snapshot::{SnapshotStore, STORAGE_KEY};

use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "POMODORO_KEEPER_DIR";

/// Directory name under the home directory.
const DATA_DIR_NAME: &str = ".pomodoro-keeper";

/// Returns `~/.pomodoro-keeper`, or `$POMODORO_KEEPER_DIR` when set.
///
/// # Errors
///
/// Returns [`StoreError::NoHomeDir`] if no override is set and the home
/// directory cannot be determined.
pub fn default_data_dir() -> Result<PathBuf, StoreError> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(DATA_DIR_NAME))
        .ok_or(StoreError::NoHomeDir)
}

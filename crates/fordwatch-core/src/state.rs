// Durable last-observed state.
//
// One small JSON file: the last normalized status plus the time of the
// last notification. Written via a temp file in the same directory and
// an atomic rename, so a crash mid-write never leaves a truncated file.
// A missing or unreadable file means fresh-start, never a fatal error.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use fordwatch_api::VehicleStatus;

use crate::error::CoreError;

/// The record persisted across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    pub last_known: VehicleStatus,
    #[serde(default)]
    pub last_notified_at: Option<DateTime<Utc>>,
}

/// Loads and saves [`PersistedState`] at a fixed path.
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Where the state file lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previous state, if any.
    ///
    /// Returns `None` both when no file exists (first run) and when the
    /// file cannot be parsed -- a corrupt state file downgrades to
    /// fresh-start behavior with a warning, not an error.
    pub fn load(&self) -> Option<PersistedState> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no previous state");
                return None;
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read state file");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(state) => Some(state),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "state file unreadable -- starting fresh");
                None
            }
        }
    }

    /// Write the state atomically.
    pub fn save(&self, state: &PersistedState) -> Result<(), CoreError> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).map_err(|e| CoreError::Persistence {
            message: format!("creating {}: {e}", parent.display()),
        })?;

        let json = serde_json::to_string_pretty(state).map_err(|e| CoreError::Persistence {
            message: format!("serializing state: {e}"),
        })?;

        // Temp file in the target directory so the rename stays on one
        // filesystem and is atomic.
        let tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| CoreError::Persistence {
            message: format!("creating temp file in {}: {e}", parent.display()),
        })?;
        std::fs::write(tmp.path(), json).map_err(|e| CoreError::Persistence {
            message: format!("writing state: {e}"),
        })?;
        tmp.persist(&self.path).map_err(|e| CoreError::Persistence {
            message: format!("replacing {}: {e}", self.path.display()),
        })?;

        debug!(path = %self.path.display(), "state saved");
        Ok(())
    }
}

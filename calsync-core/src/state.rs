//! Persisted sync state.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SyncState {
    pub last_sync: Option<DateTime<Utc>>,
}

pub fn state_path(data_dir: &Path) -> PathBuf {
    data_dir.join("state.json")
}

/// Missing file reads as the default state.
pub fn load_state(data_dir: &Path) -> SyncResult<SyncState> {
    let path = state_path(data_dir);
    if !path.exists() {
        return Ok(SyncState::default());
    }

    let contents = std::fs::read_to_string(&path)?;
    let state = serde_json::from_str(&contents).map_err(|e| {
        SyncError::Serialization(format!("sync state at {}: {e}", path.display()))
    })?;

    Ok(state)
}

/// Atomic write via temp file + rename.
pub fn save_state(data_dir: &Path, state: &SyncState) -> SyncResult<()> {
    std::fs::create_dir_all(data_dir)?;

    let path = state_path(data_dir);
    let temp_path = data_dir.join("state.json.tmp");

    let contents = serde_json::to_string_pretty(state)
        .map_err(|e| SyncError::Serialization(e.to_string()))?;

    std::fs::write(&temp_path, contents)?;
    std::fs::rename(&temp_path, &path)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_missing_state_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = load_state(dir.path()).unwrap();
        assert!(state.last_sync.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let at = Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();

        save_state(dir.path(), &SyncState { last_sync: Some(at) }).unwrap();
        let state = load_state(dir.path()).unwrap();
        assert_eq!(state.last_sync, Some(at));
    }

    #[test]
    fn test_save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        save_state(dir.path(), &SyncState::default()).unwrap();
        assert!(state_path(dir.path()).exists());
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[test]
    fn test_save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        save_state(&nested, &SyncState::default()).unwrap();
        assert!(state_path(&nested).exists());
    }
}

//! Advisory single-flight lock.
//!
//! Concurrent sync contexts (the watch daemon, an ad-hoc `calsync sync`,
//! another machine sharing the data directory) coordinate through a lock
//! file. The lock is advisory: skipping a run is an optimization, and the
//! UID merge keeps concurrent uploads convergent even if two contexts
//! race past it.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

const LOCK_FILE: &str = "sync.lock";

/// Lock records older than this are treated as abandoned by a crashed or
/// killed context and reclaimed.
pub const LOCK_STALE_SECS: i64 = 180;

#[derive(Debug, Serialize, Deserialize)]
pub struct LockRecord {
    pub timestamp: DateTime<Utc>,
    pub owner: String,
}

pub struct SyncLock {
    path: PathBuf,
}

/// Removes the lock file when dropped, on every exit path.
pub struct LockGuard {
    path: PathBuf,
}

impl SyncLock {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(LOCK_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Try to take the lock. `None` means another context holds a fresh
    /// lock. Stale or unreadable records are reclaimed; losing the
    /// re-creation race counts as the lock being held.
    pub fn try_acquire(&self) -> SyncResult<Option<LockGuard>> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        if let Some(guard) = self.try_create()? {
            return Ok(Some(guard));
        }

        if self.holder_is_fresh() {
            return Ok(None);
        }

        tracing::warn!(path = %self.path.display(), "reclaiming stale sync lock");
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.try_create()
    }

    // Atomic create-if-absent; `None` when the file already exists.
    fn try_create(&self) -> SyncResult<Option<LockGuard>> {
        let record = LockRecord {
            timestamp: Utc::now(),
            owner: Uuid::new_v4().simple().to_string(),
        };
        let contents = serde_json::to_string(&record)
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(mut file) => {
                file.write_all(contents.as_bytes())?;
                Ok(Some(LockGuard {
                    path: self.path.clone(),
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn holder_is_fresh(&self) -> bool {
        let Ok(contents) = std::fs::read_to_string(&self.path) else {
            return false;
        };
        let Ok(record) = serde_json::from_str::<LockRecord>(&contents) else {
            return false;
        };
        let age = Utc::now().signed_duration_since(record.timestamp);
        age.num_seconds() <= LOCK_STALE_SECS
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

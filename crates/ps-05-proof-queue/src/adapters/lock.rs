//! # Queue Directory Locking
//!
//! One process per queue directory. Two writers rewriting the same store
//! file would silently drop each other's state transitions.
//!
//! Uses `fs2` (flock on Unix, LockFile on Windows).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from directory locking.
#[derive(Debug, Error)]
pub enum LockError {
    /// Lock file could not be created.
    #[error("failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),

    /// Another process holds the lock.
    #[error("queue directory {} already in use{}", path.display(), pid.map(|p| format!(" by process {}", p)).unwrap_or_default())]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },

    /// PID could not be written.
    #[error("failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

/// Exclusive lock on a queue directory, released on drop.
pub struct DirectoryLock {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl DirectoryLock {
    const LOCK_FILE: &'static str = "LOCK";

    /// Acquire the lock without blocking.
    ///
    /// # Errors
    /// * `LockError::AlreadyLocked` - another process holds it
    pub fn acquire(dir: &Path) -> Result<Self, LockError> {
        std::fs::create_dir_all(dir).map_err(LockError::CreateFailed)?;
        let lock_path = dir.join(Self::LOCK_FILE);

        // No truncate before the lock is ours, or the holder's PID is lost
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(LockError::CreateFailed)?;

        if file.try_lock_exclusive().is_err() {
            return Err(LockError::AlreadyLocked {
                pid: Self::read_existing_pid(&lock_path),
                path: lock_path,
            });
        }

        let pid = std::process::id();
        file.set_len(0).map_err(LockError::WriteFailed)?;
        writeln!(file, "{}", pid).map_err(LockError::WriteFailed)?;
        file.sync_all().map_err(LockError::WriteFailed)?;

        Ok(Self {
            file,
            path: lock_path,
            pid,
        })
    }

    /// PID recorded in the lock file.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Lock file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for DirectoryLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}

//! core::lock
//!
//! Host-local exclusive lock for runs against one database.
//!
//! # Architecture
//!
//! A branch's working set is shared by every session on it, so two
//! overlapping runs against one database would commit each other's writes.
//! The lifecycle controller does not coordinate concurrent runs itself; the
//! CLI takes this lock around the whole bracket instead.
//!
//! The lock only serializes runs started from the same host. Runs from
//! other machines are not seen.
//!
//! # Storage
//!
//! - `<lock_dir>/<digest>.lock` - Lock file with OS-level exclusive lock,
//!   where `<digest>` is derived from `host:port/database`
//!
//! # Invariants
//!
//! - Lock is held for the entire pre-run / pipeline / post-run bracket
//! - Lock is automatically released on drop
//! - Lock acquisition is non-blocking (fails fast if locked)

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("another run against {key} is in progress on this host")]
    AlreadyLocked { key: String },

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// Lock file name for a database key.
///
/// The key is hashed so arbitrary host names map onto safe file names.
pub fn lock_file_name(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{}.lock", &hex::encode(digest)[..16])
}

/// An exclusive lock on one database, scoped to this host.
#[derive(Debug)]
pub struct RunLock {
    key: String,
    path: PathBuf,
    /// When this is Some, we hold the lock.
    file: Option<File>,
}

impl RunLock {
    /// Attempt to acquire the lock for `key` in `dir`.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another process holds the lock
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(dir: &Path, key: &str) -> Result<Self, LockError> {
        fs::create_dir_all(dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", dir.display(), e))
        })?;

        let path = dir.join(lock_file_name(key));

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(LockError::AlreadyLocked {
                    key: key.to_string(),
                })
            }
            Err(e) => return Err(LockError::AcquireFailed(e.to_string())),
        }

        // Holder details are informational only
        let _ = file
            .set_len(0)
            .and_then(|_| writeln!(&file, "{}\npid {}", key, std::process::id()));

        tracing::debug!(key, path = %path.display(), "run lock acquired");

        Ok(Self {
            key: key.to_string(),
            path,
            file: Some(file),
        })
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock explicitly.
    ///
    /// This is called automatically on drop.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
            tracing::debug!(key = %self.key, "run lock released");
        }
        Ok(())
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const KEY: &str = "localhost:3306/analytics";

    #[test]
    fn lock_acquire_succeeds() {
        let temp = TempDir::new().unwrap();
        let lock = RunLock::acquire(temp.path(), KEY).expect("acquire lock");
        assert!(lock.is_held());
        assert!(lock.path().exists());
        assert_eq!(lock.key(), KEY);
    }

    #[test]
    fn lock_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested/locks");
        assert!(!dir.exists());

        let _lock = RunLock::acquire(&dir, KEY).expect("acquire lock");
        assert!(dir.exists());
    }

    #[test]
    fn lock_prevents_second_acquire() {
        let temp = TempDir::new().unwrap();
        let _lock = RunLock::acquire(temp.path(), KEY).expect("first acquire");

        let result = RunLock::acquire(temp.path(), KEY);
        assert!(matches!(result, Err(LockError::AlreadyLocked { .. })));
    }

    #[test]
    fn different_databases_do_not_conflict() {
        let temp = TempDir::new().unwrap();
        let _a = RunLock::acquire(temp.path(), KEY).expect("first");
        let b = RunLock::acquire(temp.path(), "localhost:3306/other").expect("second");
        assert!(b.is_held());
    }

    #[test]
    fn lock_released_on_drop() {
        let temp = TempDir::new().unwrap();
        {
            let lock = RunLock::acquire(temp.path(), KEY).expect("first acquire");
            assert!(lock.is_held());
        }

        let lock2 = RunLock::acquire(temp.path(), KEY).expect("second acquire");
        assert!(lock2.is_held());
    }

    #[test]
    fn multiple_release_calls_are_safe() {
        let temp = TempDir::new().unwrap();
        let mut lock = RunLock::acquire(temp.path(), KEY).expect("acquire");

        lock.release().expect("first release");
        lock.release().expect("second release should be ok");
        assert!(!lock.is_held());

        assert!(RunLock::acquire(temp.path(), KEY).is_ok());
    }

    #[test]
    fn lock_file_records_holder() {
        let temp = TempDir::new().unwrap();
        let lock = RunLock::acquire(temp.path(), KEY).expect("acquire");
        let contents = fs::read_to_string(lock.path()).unwrap();
        assert!(contents.starts_with(KEY));
    }

    #[test]
    fn file_name_is_stable_and_safe() {
        let name = lock_file_name(KEY);
        assert_eq!(name, lock_file_name(KEY));
        assert_ne!(name, lock_file_name("localhost:3306/other"));
        assert_eq!(name.len(), 16 + ".lock".len());
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.'));
    }

    #[test]
    fn error_display_formatting() {
        let err = LockError::AlreadyLocked { key: KEY.into() };
        assert!(err.to_string().contains(KEY));

        let err = LockError::CreateFailed("test".into());
        assert!(err.to_string().contains("create"));
    }
}

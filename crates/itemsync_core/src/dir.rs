//! Store directory layout and locking.
//!
//! ```text
//! <store_path>/
//! ├─ LOCK          # Advisory lock held while the store is open
//! └─ journal.isj   # Commit journal
//! ```
//!
//! A writable store holds the lock exclusively. Read-only handles share it,
//! so any number of them may inspect a store nobody is writing to.

use crate::error::{SyncError, SyncResult};
use crate::store::JOURNAL_FILE;
use fs2::FileExt;
use itemsync_storage::StorageError;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Lock file name inside a store directory.
pub const LOCK_FILE: &str = "LOCK";

/// How a [`StoreDir`] holds the directory lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    /// One writer, nobody else.
    Exclusive,
    /// Any number of readers, no writer.
    Shared,
}

/// A locked store directory.
///
/// The lock is released when the value is dropped.
#[derive(Debug)]
pub struct StoreDir {
    path: PathBuf,
    mode: LockMode,
    _lock_file: File,
}

impl StoreDir {
    /// Opens and locks the store directory at `path`.
    ///
    /// Without `create_if_missing` nothing is created: a directory that holds
    /// no journal is reported as [`SyncError::StoreNotFound`].
    ///
    /// # Errors
    ///
    /// - [`SyncError::StoreNotFound`] if there is no journal and
    ///   `create_if_missing` is off
    /// - [`SyncError::StoreLocked`] if another handle holds a conflicting lock
    /// - a storage error on I/O failure
    pub fn open(path: &Path, create_if_missing: bool, mode: LockMode) -> SyncResult<Self> {
        if !path.join(JOURNAL_FILE).exists() {
            if !create_if_missing {
                return Err(SyncError::StoreNotFound(path.to_path_buf()));
            }
            fs::create_dir_all(path).map_err(StorageError::from)?;
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))
            .map_err(StorageError::from)?;

        let locked = match mode {
            LockMode::Exclusive => FileExt::try_lock_exclusive(&lock_file),
            LockMode::Shared => FileExt::try_lock_shared(&lock_file),
        };
        if locked.is_err() {
            tracing::debug!(path = %path.display(), ?mode, "store directory is locked");
            return Err(SyncError::StoreLocked(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            mode,
            _lock_file: lock_file,
        })
    }

    /// The directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The lock this handle holds.
    #[must_use]
    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Path of the commit journal.
    #[must_use]
    pub fn journal_path(&self) -> PathBuf {
        self.path.join(JOURNAL_FILE)
    }
}

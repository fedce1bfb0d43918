//! Store configuration.

use std::time::Duration;

/// Configuration for opening a [`crate::SyncStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Create the store directory and journal when they do not exist.
    pub create_if_missing: bool,

    /// fsync the journal on every commit. With this off a commit is only
    /// flushed to the OS and may be lost on power failure (never torn).
    pub sync_on_commit: bool,

    /// Open without writing anything. The directory lock is shared with
    /// other read-only handles, a torn tail is left in place and every
    /// mutation fails with [`crate::SyncError::ReadOnly`].
    pub read_only: bool,

    /// How long a mutation waits for the single write lock before giving up
    /// with a retryable error.
    pub lock_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            sync_on_commit: true,
            read_only: false,
            lock_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether a missing store is created.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether every commit is fsynced.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets whether the store is opened read-only.
    #[must_use]
    pub const fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    /// Sets the write-lock wait limit.
    #[must_use]
    pub const fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }
}

//! Storage errors.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a [`crate::StorageBackend`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The operating system reported an I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read reached past the end of the store.
    #[error("read past end of storage: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// Requested offset.
        offset: u64,
        /// Requested length.
        len: usize,
        /// Store size at the time of the read.
        size: u64,
    },

    /// A truncate asked to grow the store.
    #[error("cannot truncate to {requested} bytes, store is only {size} bytes")]
    TruncatePastEnd {
        /// Requested size.
        requested: u64,
        /// Current size.
        size: u64,
    },
}

impl StorageError {
    /// True for failures that may go away if the operation is attempted again.
    ///
    /// Range errors are programming errors and never transient.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Io(_))
    }
}

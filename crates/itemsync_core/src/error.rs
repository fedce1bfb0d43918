//! Error types for the sync core.
//!
//! `NotFound`, `Conflict` and `AlreadyExists` are not errors here: they are
//! ordinary outcomes of a mutation (see [`crate::CreateOutcome`] and
//! friends). `SyncError` only covers requests that could not be answered.

use crate::types::MutationId;
use itemsync_storage::StorageError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for core operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// How a caller should react to a [`SyncError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transient. Resending the identical request (same mutation id) is safe.
    Retryable,
    /// The request itself is malformed; resending it will fail again.
    InvalidRequest,
    /// Programming, configuration or on-disk corruption problem.
    Fatal,
}

/// Failures of the sync core.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A journal payload could not be encoded or decoded.
    #[error("journal codec error: {0}")]
    Codec(String),

    /// The journal holds a complete but invalid frame.
    #[error("journal corrupted at offset {offset}: {message}")]
    JournalCorruption {
        /// Offset of the offending frame.
        offset: u64,
        /// What was wrong with it.
        message: String,
    },

    /// No store exists at the path and `create_if_missing` is off.
    #[error("no store found at {}", .0.display())]
    StoreNotFound(PathBuf),

    /// Another handle already has the store directory open.
    ///
    /// A directory is held exclusively by one writable store, or shared by
    /// any number of read-only ones. The error clears once the holder closes
    /// the store.
    #[error("store at {} is locked by another handle", .0.display())]
    StoreLocked(PathBuf),

    /// A mutation was attempted on a store opened read-only.
    #[error("store is read-only")]
    ReadOnly,

    /// Another writer held the write lock for too long.
    #[error("timed out after {0:?} waiting for the write lock")]
    LockTimeout(Duration),

    /// The request deadline passed before the mutation committed.
    #[error("request deadline exceeded before commit")]
    DeadlineExceeded,

    /// The request is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The mutation id was already applied to a different item, owner or
    /// mutation type.
    #[error("mutation id {mutation_id} was already used for a different mutation")]
    MutationIdReused {
        /// The reused token.
        mutation_id: MutationId,
    },

    /// The version counter cannot be incremented any further.
    #[error("version counter exhausted")]
    VersionOverflow,

    /// An internal invariant does not hold.
    #[error("invariant violated: {0}")]
    Invariant(String),
}

impl SyncError {
    /// Creates an invalid request error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Creates a journal corruption error.
    pub fn corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::JournalCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates an invariant violation error.
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant(message.into())
    }

    /// Classifies the error for the caller.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Storage(err) if err.is_transient() => ErrorKind::Retryable,
            SyncError::LockTimeout(_)
            | SyncError::DeadlineExceeded
            | SyncError::StoreLocked(_) => ErrorKind::Retryable,
            SyncError::InvalidRequest(_) | SyncError::MutationIdReused { .. } => {
                ErrorKind::InvalidRequest
            }
            SyncError::Storage(_)
            | SyncError::Codec(_)
            | SyncError::JournalCorruption { .. }
            | SyncError::StoreNotFound(_)
            | SyncError::ReadOnly
            | SyncError::VersionOverflow
            | SyncError::Invariant(_) => ErrorKind::Fatal,
        }
    }

    /// True when resending the identical request is the right reaction.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Retryable
    }
}

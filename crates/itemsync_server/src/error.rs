//! Error types for the request boundary.

use crate::messages::ErrorCode;
use itemsync_core::{ErrorKind, SyncError};
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while serving a request.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The request is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No authenticated owner came with the request.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// No request slot became free before the timeout.
    #[error("server overloaded")]
    Overloaded,

    /// The sync core failed.
    #[error(transparent)]
    Core(#[from] SyncError),

    /// The blocking worker running the request died.
    #[error("request worker failed: {0}")]
    Worker(String),
}

impl ServerError {
    /// Wire code for this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            ServerError::InvalidRequest(_) | ServerError::Codec(_) => ErrorCode::InvalidRequest,
            ServerError::Unauthorized(_) => ErrorCode::Unauthorized,
            ServerError::Overloaded => ErrorCode::Unavailable,
            ServerError::Core(SyncError::MutationIdReused { .. }) => ErrorCode::MutationIdReused,
            ServerError::Core(err) => match err.kind() {
                ErrorKind::Retryable => ErrorCode::Unavailable,
                ErrorKind::InvalidRequest => ErrorCode::InvalidRequest,
                ErrorKind::Fatal => ErrorCode::Internal,
            },
            ServerError::Worker(_) => ErrorCode::Internal,
        }
    }

    /// True when the client may resend the identical request.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self.code(), ErrorCode::Unavailable)
    }

    /// Returns true if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.code(),
            ErrorCode::InvalidRequest | ErrorCode::Unauthorized | ErrorCode::MutationIdReused
        )
    }
}

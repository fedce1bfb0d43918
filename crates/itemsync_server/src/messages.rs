//! Wire messages.
//!
//! Requests and responses are plain serde types carried as CBOR. The
//! transport maps [`SyncResponse::status_code`] onto its own status line.

use crate::error::{ServerError, ServerResult};
use itemsync_core::{CreateItem, DeleteItem, Item, UpdateItem, Version};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A request as received from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Owner established by the authentication layer.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Idempotency token; required for mutations.
    #[serde(default)]
    pub mutation_id: Option<String>,
    /// The operation.
    pub request: SyncRequest,
}

/// Operations a client can ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncRequest {
    /// Create an item.
    Create(CreateItem),
    /// Update an item.
    Update(UpdateItem),
    /// Tombstone an item.
    Delete(DeleteItem),
    /// Read one item.
    Get {
        /// Item id.
        id: String,
    },
    /// List live items, most recently updated first.
    List,
    /// Pull the change feed.
    Changes {
        /// Last version the client has seen.
        since_version: Version,
    },
}

impl SyncRequest {
    /// Whether the request changes state and so needs a mutation id.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Create(_) | Self::Update(_) | Self::Delete(_))
    }

    /// Short operation name for logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::Get { .. } => "get",
            Self::List => "list",
            Self::Changes { .. } => "changes",
        }
    }
}

/// Machine-readable error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed request.
    InvalidRequest,
    /// Missing or invalid owner.
    Unauthorized,
    /// Mutation id already used for another mutation.
    MutationIdReused,
    /// Transient failure; resend the identical request.
    Unavailable,
    /// Server-side failure.
    Internal,
}

/// Answer to a [`SyncRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncResponse {
    /// The item after a successful mutation or read.
    Item {
        /// Current item state.
        item: Item,
        /// True when a retried mutation was answered from the ledger.
        replayed: bool,
        /// Version the mutation was applied at. Equals `item.version`
        /// unless the item changed after a replayed mutation.
        applied_version: Version,
    },
    /// Live items of the owner.
    Items {
        /// Most recently updated first.
        items: Vec<Item>,
    },
    /// Change-feed page.
    Changes {
        /// Cursor for the next pull.
        latest_version: Version,
        /// Ascending by version, tombstones included.
        items: Vec<Item>,
    },
    /// The base version was stale.
    Conflict {
        /// Authoritative current state.
        server_item: Item,
    },
    /// No such item.
    NotFound,
    /// Create hit an existing id.
    AlreadyExists {
        /// The item already stored under that id.
        server_item: Item,
    },
    /// The request could not be answered.
    Error {
        /// Category.
        code: ErrorCode,
        /// Human-readable detail.
        message: String,
        /// Whether resending the identical request may succeed.
        retryable: bool,
    },
}

impl SyncResponse {
    /// A fresh mutation or read result.
    #[must_use]
    pub fn item(item: Item) -> Self {
        let applied_version = item.version;
        Self::Item {
            item,
            replayed: false,
            applied_version,
        }
    }

    /// Folds an error into a response.
    #[must_use]
    pub fn error(err: &ServerError) -> Self {
        Self::Error {
            code: err.code(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }

    /// HTTP-style status code.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Item { .. } | Self::Items { .. } | Self::Changes { .. } => 200,
            Self::NotFound => 404,
            Self::Conflict { .. } | Self::AlreadyExists { .. } => 409,
            Self::Error { code, .. } => match code {
                ErrorCode::InvalidRequest | ErrorCode::MutationIdReused => 400,
                ErrorCode::Unauthorized => 401,
                ErrorCode::Unavailable => 503,
                ErrorCode::Internal => 500,
            },
        }
    }

    /// True for 2xx responses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code() == 200
    }
}

/// Encodes a message as CBOR.
pub trait CborEncode {
    /// Encodes self to CBOR bytes.
    ///
    /// # Errors
    ///
    /// [`ServerError::Codec`] if serialization fails.
    fn encode_cbor(&self) -> ServerResult<Vec<u8>>;
}

/// Decodes a message from CBOR.
pub trait CborDecode: Sized {
    /// Decodes self from CBOR bytes.
    ///
    /// # Errors
    ///
    /// [`ServerError::Codec`] if the bytes are not a valid message.
    fn decode_cbor(bytes: &[u8]) -> ServerResult<Self>;
}

impl<T: Serialize> CborEncode for T {
    fn encode_cbor(&self) -> ServerResult<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| ServerError::Codec(e.to_string()))?;
        Ok(buf)
    }
}

impl<T: DeserializeOwned> CborDecode for T {
    fn decode_cbor(bytes: &[u8]) -> ServerResult<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| ServerError::Codec(e.to_string()))
    }
}

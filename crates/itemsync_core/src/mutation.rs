//! Mutation requests, caller context and outcomes.
//!
//! `NotFound`, `Conflict` and `AlreadyExists` are variants of the outcome
//! enums rather than errors: each one calls for a different recovery on the
//! client (recreate, refetch and merge, pick another id), so callers are
//! made to branch on them explicitly.

use crate::error::{SyncError, SyncResult};
use crate::item_store::ItemFields;
use crate::types::{Item, MutationId, Version};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Create a new item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateItem {
    /// Client-chosen id, unique per owner.
    pub id: String,
    /// Record category.
    pub kind: String,
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
}

/// Replace an item's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItem {
    /// Item to update.
    pub id: String,
    /// New record category.
    pub kind: String,
    /// New title.
    pub title: String,
    /// New body.
    pub content: String,
    /// Version the client last saw.
    pub base_version: Version,
}

/// Tombstone an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteItem {
    /// Item to delete.
    pub id: String,
    /// Version the client last saw.
    pub base_version: Version,
}

impl CreateItem {
    pub(crate) fn fields(&self) -> ItemFields {
        ItemFields {
            kind: self.kind.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }
}

impl UpdateItem {
    pub(crate) fn fields(&self) -> ItemFields {
        ItemFields {
            kind: self.kind.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
        }
    }
}

/// Who is mutating, under which idempotency token, and until when.
///
/// `owner_id` comes from the (external) authentication layer and is trusted.
#[derive(Debug, Clone)]
pub struct MutationContext {
    /// Authenticated owner.
    pub owner_id: String,
    /// Client idempotency token.
    pub mutation_id: MutationId,
    /// The mutation rolls back instead of committing after this instant.
    pub deadline: Option<Instant>,
}

impl MutationContext {
    /// Context without a deadline.
    pub fn new(owner_id: impl Into<String>, mutation_id: impl Into<MutationId>) -> Self {
        Self {
            owner_id: owner_id.into(),
            mutation_id: mutation_id.into(),
            deadline: None,
        }
    }

    /// Sets an absolute deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline `timeout` from now.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub(crate) fn validate(&self, item_id: &str) -> SyncResult<()> {
        if self.owner_id.is_empty() {
            return Err(SyncError::invalid_request("owner_id must not be empty"));
        }
        if self.mutation_id.as_str().is_empty() {
            return Err(SyncError::invalid_request("mutation_id must not be empty"));
        }
        if item_id.is_empty() {
            return Err(SyncError::invalid_request("item id must not be empty"));
        }
        Ok(())
    }
}

/// Answer to a retried mutation, rebuilt from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replay {
    /// Current state of the item the mutation touched.
    pub item: Item,
    /// Version the mutation was applied at the first time.
    pub applied_version: Version,
}

/// Result of [`crate::SyncStore::create`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The item was created.
    Created(Item),
    /// The mutation id was already applied.
    Replayed(Replay),
    /// The owner already has an item (possibly a tombstone) with that id.
    AlreadyExists(Item),
}

/// Result of [`crate::SyncStore::update`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The item was updated.
    Updated(Item),
    /// The mutation id was already applied.
    Replayed(Replay),
    /// The base version is stale; carries the current item.
    Conflict(Item),
    /// No live item with that id.
    NotFound,
}

/// Result of [`crate::SyncStore::delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The item was tombstoned.
    Deleted(Item),
    /// The mutation id was already applied.
    Replayed(Replay),
    /// The base version is stale; carries the current item.
    Conflict(Item),
    /// No live item with that id.
    NotFound,
}

impl CreateOutcome {
    /// The item carried by the outcome.
    #[must_use]
    pub fn item(&self) -> &Item {
        match self {
            Self::Created(item) | Self::AlreadyExists(item) => item,
            Self::Replayed(replay) => &replay.item,
        }
    }
}

impl UpdateOutcome {
    /// The item carried by the outcome, if any.
    #[must_use]
    pub fn item(&self) -> Option<&Item> {
        match self {
            Self::Updated(item) | Self::Conflict(item) => Some(item),
            Self::Replayed(replay) => Some(&replay.item),
            Self::NotFound => None,
        }
    }
}

impl DeleteOutcome {
    /// The item carried by the outcome, if any.
    #[must_use]
    pub fn item(&self) -> Option<&Item> {
        match self {
            Self::Deleted(item) | Self::Conflict(item) => Some(item),
            Self::Replayed(replay) => Some(&replay.item),
            Self::NotFound => None,
        }
    }
}

//! # itemsync core
//!
//! The synchronization core of the itemsync backend.
//!
//! This crate provides:
//! - A durable, checksummed commit journal
//! - Single-writer write transactions
//! - Version sequencing (one store-wide, monotonic counter)
//! - An idempotency ledger keyed by client mutation ids
//! - Optimistic concurrency checks on `base_version`
//! - An item store with tombstones
//! - A resumable per-owner change feed
//!
//! ## Key Invariants
//!
//! - Every committed mutation has a unique version, strictly greater than
//!   every version committed before it
//! - A mutation id is applied at most once; retries are answered from the
//!   ledger and allocate nothing
//! - Counter, item row and ledger entry change together in one journal
//!   frame, or not at all
//! - Deleted items are tombstoned, never removed, so deletions reach every
//!   device through the change feed
//!
//! ```rust
//! use itemsync_core::{CreateItem, MutationContext, SyncStore, UpdateItem, UpdateOutcome, Version};
//!
//! let store = SyncStore::open_in_memory().unwrap();
//! let create = CreateItem {
//!     id: "note-1".into(),
//!     kind: "note".into(),
//!     title: "groceries".into(),
//!     content: "milk".into(),
//! };
//! store.create(&MutationContext::new("alice", "m-1"), create).unwrap();
//!
//! let stale = UpdateItem {
//!     id: "note-1".into(),
//!     kind: "note".into(),
//!     title: "groceries".into(),
//!     content: "milk, eggs".into(),
//!     base_version: Version::ZERO,
//! };
//! let outcome = store.update(&MutationContext::new("alice", "m-2"), stale).unwrap();
//! assert!(matches!(outcome, UpdateOutcome::Conflict(current) if current.version == Version::new(1)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod change_feed;
mod config;
mod conflict;
mod dir;
mod error;
mod item_store;
pub mod journal;
mod ledger;
mod mutation;
mod recovery;
mod sequencer;
mod state;
mod store;
mod transaction;
mod types;

pub use change_feed::{ChangeFeed, ChangeSet};
pub use config::StoreConfig;
pub use conflict::{ConflictCheck, ConflictDetector};
pub use dir::{LockMode, StoreDir, LOCK_FILE};
pub use error::{ErrorKind, SyncError, SyncResult};
pub use item_store::{ItemFields, ItemStore};
pub use ledger::MutationLedger;
pub use mutation::{
    CreateItem, CreateOutcome, DeleteItem, DeleteOutcome, MutationContext, Replay, UpdateItem,
    UpdateOutcome,
};
pub use recovery::{verify_journal, RecoveryReport};
pub use sequencer::VersionSequencer;
pub use store::{StoreStats, SyncStore, JOURNAL_FILE};
pub use transaction::WriteTransaction;
pub use types::{Item, ItemKey, MutationId, MutationLogEntry, MutationType, Timestamp, Version};

/// Crate version, as recorded by `itemsync version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

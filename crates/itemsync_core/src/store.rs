//! The sync store.
//!
//! `SyncStore` composes the sequencer, ledger, conflict detector and item
//! store into the per-request mutation flow:
//!
//! ```text
//! validate -> lock -> ledger check -+-> replay
//!                                   +-> load item -+-> conflict / not found / already exists
//!                                                  +-> allocate -> apply -> record -> commit
//! ```
//!
//! Every step after the lock runs inside one [`WriteTransaction`]; leaving the
//! flow early at any point drops the transaction and nothing is written.

use crate::change_feed::{ChangeFeed, ChangeSet};
use crate::config::StoreConfig;
use crate::conflict::{ConflictCheck, ConflictDetector};
use crate::dir::{LockMode, StoreDir};
use crate::error::{SyncError, SyncResult};
use crate::item_store::ItemStore;
use crate::journal::Journal;
use crate::ledger::MutationLedger;
use crate::mutation::{
    CreateItem, CreateOutcome, DeleteItem, DeleteOutcome, MutationContext, Replay, UpdateItem,
    UpdateOutcome,
};
use crate::recovery::{self, RecoveryReport};
use crate::sequencer::VersionSequencer;
use crate::state::Tables;
use crate::transaction::WriteTransaction;
use crate::types::{
    Item, ItemKey, MutationId, MutationLogEntry, MutationType, Timestamp, Version,
};
use itemsync_storage::{FileBackend, InMemoryBackend, StorageBackend};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

/// Journal file name inside a store directory.
pub const JOURNAL_FILE: &str = "journal.isj";

/// Counters describing a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Highest committed version.
    pub latest_version: Version,
    /// Items that are not tombstoned.
    pub live_items: usize,
    /// Tombstoned items.
    pub tombstones: usize,
    /// Distinct owners with at least one item.
    pub owners: usize,
    /// Applied mutation ids.
    pub ledger_entries: usize,
    /// Journal length in bytes.
    pub journal_bytes: u64,
}

/// An offline-first sync store.
///
/// Thread-safe: share it behind an `Arc`. Mutations are serialized by a
/// single write lock; reads only take a shared lock on committed state and
/// never wait for a mutation to finish its journal append.
///
/// A file-backed store locks its directory for as long as it is open, so a
/// second writable handle on the same directory is refused with
/// [`SyncError::StoreLocked`].
///
/// # Example
///
/// ```rust
/// use itemsync_core::{CreateItem, CreateOutcome, MutationContext, SyncStore};
///
/// let store = SyncStore::open_in_memory().unwrap();
/// let ctx = MutationContext::new("alice", "3f1c9a52-5d0e-4d1b-9a57-0e2a6f4c8b11");
/// let outcome = store
///     .create(
///         &ctx,
///         CreateItem {
///             id: "note-1".into(),
///             kind: "note".into(),
///             title: "groceries".into(),
///             content: "milk".into(),
///         },
///     )
///     .unwrap();
/// assert!(matches!(outcome, CreateOutcome::Created(item) if item.version.as_u64() == 1));
/// ```
pub struct SyncStore {
    tables: RwLock<Tables>,
    writer: Mutex<Journal>,
    config: StoreConfig,
    // Dropped last: the lock outlives the journal handle.
    dir: Option<StoreDir>,
}

impl SyncStore {
    /// Opens the store kept in directory `dir`.
    ///
    /// The directory lock is taken before the journal is touched and held
    /// until the store is dropped: exclusively for a writable store, shared
    /// for a read-only one.
    ///
    /// # Errors
    ///
    /// - [`SyncError::StoreNotFound`] if there is no journal and
    ///   `create_if_missing` is off (always the case when read-only)
    /// - [`SyncError::StoreLocked`] if another handle has the directory open
    ///   in a conflicting mode
    /// - [`SyncError::JournalCorruption`] if the journal is damaged
    /// - a storage error if the journal cannot be opened
    pub fn open(dir: &Path, config: StoreConfig) -> SyncResult<Self> {
        let (create, mode) = if config.read_only {
            (false, LockMode::Shared)
        } else {
            (config.create_if_missing, LockMode::Exclusive)
        };
        let store_dir = StoreDir::open(dir, create, mode)?;

        let path = store_dir.journal_path();
        let backend = if path.exists() {
            FileBackend::open_existing(&path)?
        } else {
            FileBackend::open(&path)?
        };

        let mut store = Self::with_backend(Box::new(backend), config)?;
        store.dir = Some(store_dir);
        tracing::info!(
            path = %dir.display(),
            read_only = store.config.read_only,
            latest_version = store.latest_version().as_u64(),
            "store opened"
        );
        Ok(store)
    }

    /// Opens a store that lives only in memory.
    ///
    /// # Errors
    ///
    /// Only fails if the init frame cannot be encoded.
    pub fn open_in_memory() -> SyncResult<Self> {
        Self::with_backend(Box::new(InMemoryBackend::new()), StoreConfig::default())
    }

    /// Opens a store on an arbitrary backend.
    ///
    /// # Errors
    ///
    /// Fails if the journal on `backend` is corrupt or cannot be read.
    pub fn with_backend(backend: Box<dyn StorageBackend>, config: StoreConfig) -> SyncResult<Self> {
        let mut journal = Journal::new(backend, config.sync_on_commit);
        let tables = if config.read_only {
            let (tables, report) = recovery::load(&journal)?;
            if let Some(offset) = report.torn_tail_at {
                tracing::warn!(offset, "read-only store ignores a torn journal tail");
            }
            tables
        } else {
            let (tables, report) = recovery::recover(&mut journal)?;
            if let Some(offset) = report.torn_tail_at {
                tracing::warn!(offset, "store recovered from a torn journal tail");
            }
            tables
        };
        Ok(Self {
            tables: RwLock::new(tables),
            writer: Mutex::new(journal),
            config,
            dir: None,
        })
    }

    /// Opens a write transaction, waiting for the write lock.
    ///
    /// The mutation methods use this internally; it is public for callers
    /// composing their own flows from the components.
    ///
    /// # Errors
    ///
    /// [`SyncError::LockTimeout`] or [`SyncError::DeadlineExceeded`] when the
    /// lock cannot be had in time, [`SyncError::ReadOnly`] on a read-only
    /// store.
    pub fn begin_write(&self, deadline: Option<Instant>) -> SyncResult<WriteTransaction<'_>> {
        if self.config.read_only {
            return Err(SyncError::ReadOnly);
        }
        WriteTransaction::begin(&self.writer, &self.tables, self.config.lock_timeout, deadline)
    }

    /// Creates an item.
    ///
    /// # Errors
    ///
    /// See [`SyncError`]; `AlreadyExists` is an outcome, not an error.
    pub fn create(&self, ctx: &MutationContext, request: CreateItem) -> SyncResult<CreateOutcome> {
        ctx.validate(&request.id)?;
        let span = tracing::debug_span!(
            "create",
            owner_id = %ctx.owner_id,
            mutation_id = %ctx.mutation_id,
            item_id = %request.id
        );
        let _enter = span.enter();

        let mut tx = self.begin_write(ctx.deadline)?;
        let key = ItemKey::new(ctx.owner_id.as_str(), request.id.as_str());

        if let Some(replay) = replay(&tx, ctx, &key, MutationType::Create)? {
            return Ok(CreateOutcome::Replayed(replay));
        }

        if let Some(existing) = ItemStore::get_by_id(&tx, &key) {
            tracing::debug!(
                version = existing.version.as_u64(),
                deleted = existing.deleted,
                "create collides with existing item"
            );
            return Ok(CreateOutcome::AlreadyExists(existing));
        }

        let version = allocate(&mut tx, ctx, MutationType::Create)?;
        let now = Timestamp::now();
        let item = ItemStore::insert(&mut tx, key, request.fields(), version, now)?;
        MutationLedger::record(&mut tx, ledger_entry(ctx, &item, MutationType::Create, now))?;
        commit(tx)?;

        Ok(CreateOutcome::Created(item))
    }

    /// Replaces an item's payload if `base_version` is current.
    ///
    /// # Errors
    ///
    /// See [`SyncError`]; conflicts and missing items are outcomes.
    pub fn update(&self, ctx: &MutationContext, request: UpdateItem) -> SyncResult<UpdateOutcome> {
        ctx.validate(&request.id)?;
        let span = tracing::debug_span!(
            "update",
            owner_id = %ctx.owner_id,
            mutation_id = %ctx.mutation_id,
            item_id = %request.id,
            base_version = request.base_version.as_u64()
        );
        let _enter = span.enter();

        let mut tx = self.begin_write(ctx.deadline)?;
        let key = ItemKey::new(ctx.owner_id.as_str(), request.id.as_str());

        if let Some(replay) = replay(&tx, ctx, &key, MutationType::Update)? {
            return Ok(UpdateOutcome::Replayed(replay));
        }

        let Some(stored) = ItemStore::get_by_id(&tx, &key) else {
            tracing::debug!("update of unknown item");
            return Ok(UpdateOutcome::NotFound);
        };
        if let ConflictCheck::Conflict(current) =
            ConflictDetector::check(&stored, request.base_version)
        {
            tracing::debug!(current_version = current.version.as_u64(), "update conflict");
            return Ok(UpdateOutcome::Conflict(current));
        }
        if stored.deleted {
            tracing::debug!("update of tombstoned item");
            return Ok(UpdateOutcome::NotFound);
        }

        let version = allocate(&mut tx, ctx, MutationType::Update)?;
        let now = Timestamp::now();
        let item = ItemStore::update(&mut tx, &stored, request.fields(), version, now)?;
        MutationLedger::record(&mut tx, ledger_entry(ctx, &item, MutationType::Update, now))?;
        commit(tx)?;

        Ok(UpdateOutcome::Updated(item))
    }

    /// Tombstones an item if `base_version` is current.
    ///
    /// # Errors
    ///
    /// See [`SyncError`]; conflicts and missing items are outcomes.
    pub fn delete(&self, ctx: &MutationContext, request: DeleteItem) -> SyncResult<DeleteOutcome> {
        ctx.validate(&request.id)?;
        let span = tracing::debug_span!(
            "delete",
            owner_id = %ctx.owner_id,
            mutation_id = %ctx.mutation_id,
            item_id = %request.id,
            base_version = request.base_version.as_u64()
        );
        let _enter = span.enter();

        let mut tx = self.begin_write(ctx.deadline)?;
        let key = ItemKey::new(ctx.owner_id.as_str(), request.id.as_str());

        if let Some(replay) = replay(&tx, ctx, &key, MutationType::Delete)? {
            return Ok(DeleteOutcome::Replayed(replay));
        }

        let Some(stored) = ItemStore::get_by_id(&tx, &key) else {
            tracing::debug!("delete of unknown item");
            return Ok(DeleteOutcome::NotFound);
        };
        if let ConflictCheck::Conflict(current) =
            ConflictDetector::check(&stored, request.base_version)
        {
            tracing::debug!(current_version = current.version.as_u64(), "delete conflict");
            return Ok(DeleteOutcome::Conflict(current));
        }
        if stored.deleted {
            tracing::debug!("delete of tombstoned item");
            return Ok(DeleteOutcome::NotFound);
        }

        let version = allocate(&mut tx, ctx, MutationType::Delete)?;
        let now = Timestamp::now();
        let item = ItemStore::soft_delete(&mut tx, &stored, version, now)?;
        MutationLedger::record(&mut tx, ledger_entry(ctx, &item, MutationType::Delete, now))?;
        commit(tx)?;

        Ok(DeleteOutcome::Deleted(item))
    }

    /// Reads one item, tombstones included. `None` means not found.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidRequest`] for an empty owner or id.
    pub fn get(&self, owner_id: &str, id: &str) -> SyncResult<Option<Item>> {
        require_owner(owner_id)?;
        if id.is_empty() {
            return Err(SyncError::invalid_request("item id must not be empty"));
        }
        Ok(ItemStore::get(&self.tables.read(), &ItemKey::new(owner_id, id)))
    }

    /// Live items of `owner_id`, most recently updated first.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidRequest`] for an empty owner.
    pub fn list(&self, owner_id: &str) -> SyncResult<Vec<Item>> {
        require_owner(owner_id)?;
        Ok(ItemStore::list_by_owner(&self.tables.read(), owner_id))
    }

    /// Items of `owner_id` changed after version `since`, tombstones
    /// included, ascending by version.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidRequest`] for an empty owner.
    pub fn changes(&self, owner_id: &str, since: Version) -> SyncResult<ChangeSet> {
        require_owner(owner_id)?;
        Ok(ChangeFeed::changes_since(&self.tables.read(), owner_id, since))
    }

    /// Highest committed version.
    #[must_use]
    pub fn latest_version(&self) -> Version {
        self.tables.read().latest_version
    }

    /// The ledger entry for a mutation id, if it was applied.
    #[must_use]
    pub fn mutation(&self, mutation_id: &MutationId) -> Option<MutationLogEntry> {
        self.tables.read().mutation(mutation_id).cloned()
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let tables = self.tables.read();
        let tombstones = tables.items.values().filter(|item| item.deleted).count();
        let mut owners = 0;
        let mut last_owner: Option<&str> = None;
        for key in tables.items.keys() {
            if last_owner != Some(key.owner_id.as_str()) {
                owners += 1;
                last_owner = Some(key.owner_id.as_str());
            }
        }
        StoreStats {
            latest_version: tables.latest_version,
            live_items: tables.items.len() - tombstones,
            tombstones,
            owners,
            ledger_entries: tables.ledger.len(),
            journal_bytes: tables.journal_bytes,
        }
    }

    /// Replays the journal again and reports what it holds.
    ///
    /// Waits for the write lock so no commit lands mid-scan.
    ///
    /// # Errors
    ///
    /// Fails if the journal has become unreadable or corrupt.
    pub fn verify(&self) -> SyncResult<RecoveryReport> {
        let journal = self.writer.lock();
        recovery::verify_journal(&journal)
    }

    /// The configuration the store was opened with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Directory of a file-backed store.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }
}

impl std::fmt::Debug for SyncStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncStore")
            .field("path", &self.path())
            .field("read_only", &self.config.read_only)
            .field("latest_version", &self.latest_version())
            .finish_non_exhaustive()
    }
}

fn require_owner(owner_id: &str) -> SyncResult<()> {
    if owner_id.is_empty() {
        return Err(SyncError::invalid_request("owner_id must not be empty"));
    }
    Ok(())
}

/// Answers a mutation id that was already applied.
///
/// The token must have been used for the same owner, item and kind of
/// mutation; anything else is a client bug and is refused.
fn replay(
    tx: &WriteTransaction<'_>,
    ctx: &MutationContext,
    key: &ItemKey,
    mutation_type: MutationType,
) -> SyncResult<Option<Replay>> {
    let Some(entry) = MutationLedger::lookup(tx, &ctx.mutation_id) else {
        return Ok(None);
    };

    if entry.owner_id != ctx.owner_id || entry.item_id != key.id || entry.mutation_type != mutation_type
    {
        tracing::warn!(
            recorded_item = %entry.item_id,
            recorded_type = %entry.mutation_type,
            "mutation id reused for a different mutation"
        );
        return Err(SyncError::MutationIdReused {
            mutation_id: ctx.mutation_id.clone(),
        });
    }

    let item = ItemStore::get_by_id(tx, &entry.item_key()).ok_or_else(|| {
        SyncError::invariant(format!(
            "ledger entry {} points at missing item {}",
            entry.mutation_id,
            entry.item_key()
        ))
    })?;
    tracing::debug!(
        applied_version = entry.applied_version.as_u64(),
        "replaying applied mutation"
    );
    Ok(Some(Replay {
        item,
        applied_version: entry.applied_version,
    }))
}

fn allocate(
    tx: &mut WriteTransaction<'_>,
    ctx: &MutationContext,
    mutation_type: MutationType,
) -> SyncResult<Version> {
    let version = VersionSequencer::allocate(tx)?;
    tracing::info!(
        version = version.as_u64(),
        mutation_type = %mutation_type,
        owner_id = %ctx.owner_id,
        mutation_id = %ctx.mutation_id,
        "version allocated"
    );
    Ok(version)
}

fn commit(tx: WriteTransaction<'_>) -> SyncResult<Version> {
    tx.commit().inspect_err(|err| {
        tracing::warn!(error = %err, retryable = err.is_retryable(), "mutation rolled back");
    })
}

fn ledger_entry(
    ctx: &MutationContext,
    item: &Item,
    mutation_type: MutationType,
    now: Timestamp,
) -> MutationLogEntry {
    MutationLogEntry {
        mutation_id: ctx.mutation_id.clone(),
        owner_id: item.owner_id.clone(),
        item_id: item.id.clone(),
        mutation_type,
        applied_version: item.version,
        applied_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_req(id: &str) -> CreateItem {
        CreateItem {
            id: id.into(),
            kind: "note".into(),
            title: format!("title {id}"),
            content: "body".into(),
        }
    }

    fn update_req(id: &str, base: u64, title: &str) -> UpdateItem {
        UpdateItem {
            id: id.into(),
            kind: "note".into(),
            title: title.into(),
            content: "body".into(),
            base_version: Version::new(base),
        }
    }

    fn delete_req(id: &str, base: u64) -> DeleteItem {
        DeleteItem {
            id: id.into(),
            base_version: Version::new(base),
        }
    }

    fn ctx(token: &str) -> MutationContext {
        MutationContext::new("alice", token)
    }

    #[test]
    fn create_update_conflict_delete_changes() {
        let store = SyncStore::open_in_memory().unwrap();

        let created = store.create(&ctx("m1"), create_req("a")).unwrap();
        assert_eq!(created.item().version, Version::new(1));

        let updated = store.update(&ctx("m2"), update_req("a", 1, "second")).unwrap();
        assert!(matches!(&updated, UpdateOutcome::Updated(item) if item.version == Version::new(2)));

        let stale = store.update(&ctx("m3"), update_req("a", 1, "stale")).unwrap();
        match stale {
            UpdateOutcome::Conflict(current) => {
                assert_eq!(current.version, Version::new(2));
                assert_eq!(current.title, "second");
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        let deleted = store.delete(&ctx("m4"), delete_req("a", 2)).unwrap();
        assert!(matches!(&deleted, DeleteOutcome::Deleted(item) if item.deleted && item.version == Version::new(3)));

        let changes = store.changes("alice", Version::ZERO).unwrap();
        assert_eq!(changes.latest_version, Version::new(3));
        assert_eq!(changes.items.len(), 1);
        assert!(changes.items[0].deleted);
        assert!(store.list("alice").unwrap().is_empty());
    }

    #[test]
    fn retried_create_allocates_nothing() {
        let store = SyncStore::open_in_memory().unwrap();
        let first = store.create(&ctx("t1"), create_req("b")).unwrap();
        let again = store.create(&ctx("t1"), create_req("b")).unwrap();

        match again {
            CreateOutcome::Replayed(replay) => {
                assert_eq!(replay.applied_version, first.item().version);
                assert_eq!(&replay.item, first.item());
            }
            other => panic!("expected replay, got {other:?}"),
        }
        assert_eq!(store.latest_version(), Version::new(1));
    }

    #[test]
    fn replay_reports_current_state() {
        let store = SyncStore::open_in_memory().unwrap();
        store.create(&ctx("m1"), create_req("a")).unwrap();
        store.update(&ctx("m2"), update_req("a", 1, "newer")).unwrap();

        let replay = store.create(&ctx("m1"), create_req("a")).unwrap();
        match replay {
            CreateOutcome::Replayed(replay) => {
                assert_eq!(replay.applied_version, Version::new(1));
                assert_eq!(replay.item.version, Version::new(2));
            }
            other => panic!("expected replay, got {other:?}"),
        }
    }

    #[test]
    fn reused_token_for_other_item_is_refused() {
        let store = SyncStore::open_in_memory().unwrap();
        store.create(&ctx("m1"), create_req("a")).unwrap();

        let err = store.create(&ctx("m1"), create_req("b")).unwrap_err();
        assert!(matches!(err, SyncError::MutationIdReused { .. }));

        let err = store.update(&ctx("m1"), update_req("a", 1, "x")).unwrap_err();
        assert!(matches!(err, SyncError::MutationIdReused { .. }));

        let err = store
            .create(&MutationContext::new("bob", "m1"), create_req("a"))
            .unwrap_err();
        assert!(matches!(err, SyncError::MutationIdReused { .. }));
        assert_eq!(store.latest_version(), Version::new(1));
    }

    #[test]
    fn duplicate_create_is_already_exists() {
        let store = SyncStore::open_in_memory().unwrap();
        store.create(&ctx("m1"), create_req("a")).unwrap();
        let outcome = store.create(&ctx("m2"), create_req("a")).unwrap();
        assert!(matches!(outcome, CreateOutcome::AlreadyExists(item) if item.version == Version::new(1)));

        // Ids are scoped per owner.
        let bob = store
            .create(&MutationContext::new("bob", "m3"), create_req("a"))
            .unwrap();
        assert!(matches!(bob, CreateOutcome::Created(_)));
    }

    #[test]
    fn create_over_tombstone_is_already_exists() {
        let store = SyncStore::open_in_memory().unwrap();
        store.create(&ctx("m1"), create_req("a")).unwrap();
        store.delete(&ctx("m2"), delete_req("a", 1)).unwrap();

        let outcome = store.create(&ctx("m3"), create_req("a")).unwrap();
        assert!(matches!(outcome, CreateOutcome::AlreadyExists(item) if item.deleted));
    }

    #[test]
    fn missing_items_are_not_found() {
        let store = SyncStore::open_in_memory().unwrap();
        assert_eq!(
            store.update(&ctx("m1"), update_req("nope", 0, "x")).unwrap(),
            UpdateOutcome::NotFound
        );
        assert_eq!(
            store.delete(&ctx("m2"), delete_req("nope", 0)).unwrap(),
            DeleteOutcome::NotFound
        );
        assert_eq!(store.get("alice", "nope").unwrap(), None);
        assert_eq!(store.latest_version(), Version::ZERO);
    }

    #[test]
    fn tombstones_are_not_found_or_conflict() {
        let store = SyncStore::open_in_memory().unwrap();
        store.create(&ctx("m1"), create_req("a")).unwrap();
        store.delete(&ctx("m2"), delete_req("a", 1)).unwrap();

        assert_eq!(
            store.delete(&ctx("m3"), delete_req("a", 2)).unwrap(),
            DeleteOutcome::NotFound
        );
        assert_eq!(
            store.update(&ctx("m4"), update_req("a", 2, "x")).unwrap(),
            UpdateOutcome::NotFound
        );
        // A concurrent deleter holding the old version sees the tombstone.
        match store.delete(&ctx("m5"), delete_req("a", 1)).unwrap() {
            DeleteOutcome::Conflict(current) => {
                assert!(current.deleted);
                assert_eq!(current.version, Version::new(2));
            }
            other => panic!("expected conflict, got {other:?}"),
        }
        assert_eq!(store.latest_version(), Version::new(2));
    }

    #[test]
    fn invalid_input_touches_nothing() {
        let store = SyncStore::open_in_memory().unwrap();
        assert!(matches!(
            store.create(&ctx("m1"), create_req("")),
            Err(SyncError::InvalidRequest(_))
        ));
        assert!(store.create(&MutationContext::new("", "m1"), create_req("a")).is_err());
        assert!(store.list("").is_err());
        assert!(store.changes("", Version::ZERO).is_err());
        assert!(store.mutation(&MutationId::new("m1")).is_none());
        assert_eq!(store.latest_version(), Version::ZERO);
    }

    #[test]
    fn expired_deadline_rolls_back() {
        let store = SyncStore::open_in_memory().unwrap();
        let expired = ctx("m1").with_deadline(Instant::now() - Duration::from_millis(1));
        let err = store.create(&expired, create_req("a")).unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.latest_version(), Version::ZERO);

        // The retry with the same token goes through.
        let outcome = store.create(&ctx("m1"), create_req("a")).unwrap();
        assert!(matches!(outcome, CreateOutcome::Created(_)));
    }

    #[test]
    fn list_orders_by_recency() {
        let store = SyncStore::open_in_memory().unwrap();
        store.create(&ctx("m1"), create_req("a")).unwrap();
        store.create(&ctx("m2"), create_req("b")).unwrap();
        store.create(&ctx("m3"), create_req("c")).unwrap();
        store.update(&ctx("m4"), update_req("a", 1, "touched")).unwrap();

        let ids: Vec<_> = store.list("alice").unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn stats_count_everything() {
        let store = SyncStore::open_in_memory().unwrap();
        store.create(&ctx("m1"), create_req("a")).unwrap();
        store.create(&ctx("m2"), create_req("b")).unwrap();
        store.delete(&ctx("m3"), delete_req("b", 2)).unwrap();
        store
            .create(&MutationContext::new("bob", "m4"), create_req("a"))
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats.latest_version, Version::new(4));
        assert_eq!(stats.live_items, 2);
        assert_eq!(stats.tombstones, 1);
        assert_eq!(stats.owners, 2);
        assert_eq!(stats.ledger_entries, 4);
        assert!(stats.journal_bytes > 0);

        let report = store.verify().unwrap();
        assert_eq!(report.commits, 4);
        assert_eq!(report.valid_len, stats.journal_bytes);
    }

    #[test]
    fn read_only_store_refuses_mutations() {
        let config = StoreConfig::new().read_only(true);
        let store = SyncStore::with_backend(Box::new(InMemoryBackend::new()), config).unwrap();
        assert_eq!(store.latest_version(), Version::ZERO);

        let err = store.create(&ctx("m1"), create_req("a")).unwrap_err();
        assert!(matches!(err, SyncError::ReadOnly));
        assert!(store.begin_write(None).is_err());
        assert!(store.list("alice").unwrap().is_empty());
        assert_eq!(store.stats().journal_bytes, 0);
    }

    #[test]
    fn ledger_is_queryable() {
        let store = SyncStore::open_in_memory().unwrap();
        store.create(&ctx("m1"), create_req("a")).unwrap();
        let entry = store.mutation(&MutationId::new("m1")).unwrap();
        assert_eq!(entry.mutation_type, MutationType::Create);
        assert_eq!(entry.applied_version, Version::new(1));
        assert_eq!(entry.item_id, "a");
    }
}

//! Committed in-memory tables.
//!
//! Rebuilt from the journal on open and changed only by applying a commit
//! record, so the tables always equal a replay of the journal's valid prefix.

use crate::error::{SyncError, SyncResult};
use crate::journal::{CommitRecord, InitRecord};
use crate::types::{Item, ItemKey, MutationId, MutationLogEntry, Timestamp, Version};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) latest_version: Version,
    pub(crate) created_at: Option<Timestamp>,
    pub(crate) items: BTreeMap<ItemKey, Item>,
    /// (owner, version) -> item id. Each item appears once, under its
    /// current version; this is the change-feed index.
    pub(crate) by_owner_version: BTreeMap<(String, Version), String>,
    pub(crate) ledger: HashMap<MutationId, MutationLogEntry>,
    pub(crate) journal_bytes: u64,
}

impl Tables {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn apply_init(&mut self, init: &InitRecord) -> SyncResult<()> {
        if self.created_at.is_some() {
            return Err(SyncError::invariant("store initialized twice"));
        }
        self.latest_version = init.latest_version;
        self.created_at = Some(init.created_at);
        Ok(())
    }

    /// Checks that a commit record fits on top of the current tables.
    ///
    /// During recovery a record that fails here means the journal is corrupt.
    pub(crate) fn check_commit(&self, commit: &CommitRecord) -> SyncResult<()> {
        let version = commit.version;
        if self.created_at.is_none() {
            return Err(SyncError::invariant("commit before store initialization"));
        }
        if version <= self.latest_version {
            return Err(SyncError::invariant(format!(
                "commit version {version} does not advance counter at {}",
                self.latest_version
            )));
        }
        if commit.item.version != version || commit.mutation.applied_version != version {
            return Err(SyncError::invariant(format!(
                "commit {version} carries mismatched item or ledger version"
            )));
        }
        if commit.mutation.item_key() != commit.item.key() {
            return Err(SyncError::invariant(format!(
                "commit {version} ledger entry points at a different item"
            )));
        }
        if self.ledger.contains_key(&commit.mutation.mutation_id) {
            return Err(SyncError::invariant(format!(
                "mutation id {} applied twice",
                commit.mutation.mutation_id
            )));
        }
        Ok(())
    }

    /// Applies one committed mutation.
    pub(crate) fn apply_commit(&mut self, commit: &CommitRecord) -> SyncResult<()> {
        self.check_commit(commit)?;
        let version = commit.version;
        let key = commit.item.key();
        if let Some(previous) = self.items.get(&key) {
            self.by_owner_version
                .remove(&(previous.owner_id.clone(), previous.version));
        }
        self.by_owner_version
            .insert((key.owner_id.clone(), version), key.id.clone());
        self.items.insert(key, commit.item.clone());
        self.ledger
            .insert(commit.mutation.mutation_id.clone(), commit.mutation.clone());
        self.latest_version = version;
        Ok(())
    }

    pub(crate) fn item(&self, key: &ItemKey) -> Option<&Item> {
        self.items.get(key)
    }

    pub(crate) fn mutation(&self, id: &MutationId) -> Option<&MutationLogEntry> {
        self.ledger.get(id)
    }

    /// Items owned by `owner_id`, tombstones included, in key order.
    pub(crate) fn owned_by<'a>(&'a self, owner_id: &'a str) -> impl Iterator<Item = &'a Item> {
        let start = ItemKey::new(owner_id, "");
        self.items
            .range(start..)
            .take_while(move |(key, _)| key.owner_id == owner_id)
            .map(|(_, item)| item)
    }

    /// Items owned by `owner_id` whose current version is above `since`,
    /// ascending by version.
    pub(crate) fn owned_since<'a>(
        &'a self,
        owner_id: &'a str,
        since: Version,
    ) -> impl Iterator<Item = &'a Item> {
        let start = (owner_id.to_string(), Version::new(since.as_u64().saturating_add(1)));
        let skip_all = since == Version::MAX;
        self.by_owner_version
            .range(start..)
            .take_while(move |((owner, _), _)| !skip_all && owner == owner_id)
            .filter_map(move |((owner, _), id)| self.items.get(&ItemKey::new(owner.clone(), id.clone())))
    }
}

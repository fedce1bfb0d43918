//! Item store.
//!
//! Items are keyed by `(owner_id, id)` and never physically removed: a delete
//! sets the tombstone flag, bumps the version and keeps the row so the change
//! feed can carry the deletion to other devices.

use crate::error::{SyncError, SyncResult};
use crate::state::Tables;
use crate::transaction::WriteTransaction;
use crate::types::{Item, ItemKey, Timestamp, Version};

/// Payload fields a client may set on an item.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemFields {
    /// Record category.
    pub kind: String,
    /// Title.
    pub title: String,
    /// Body.
    pub content: String,
}

/// Reads and writes item rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemStore;

impl ItemStore {
    /// Reads an item inside a transaction, tombstones included.
    #[must_use]
    pub fn get_by_id(tx: &WriteTransaction<'_>, key: &ItemKey) -> Option<Item> {
        tx.item(key)
    }

    /// Stages a new item at `version`.
    ///
    /// # Errors
    ///
    /// [`SyncError::Invariant`] if a row already exists under the key.
    pub fn insert(
        tx: &mut WriteTransaction<'_>,
        key: ItemKey,
        fields: ItemFields,
        version: Version,
        now: Timestamp,
    ) -> SyncResult<Item> {
        if tx.item(&key).is_some() {
            return Err(SyncError::invariant(format!("item {key} already exists")));
        }
        let item = Item {
            id: key.id,
            owner_id: key.owner_id,
            kind: fields.kind,
            title: fields.title,
            content: fields.content,
            version,
            deleted: false,
            created_at: now,
            updated_at: now,
        };
        tx.stage_item(item.clone())?;
        Ok(item)
    }

    /// Stages a payload replacement of `current` at `version`.
    ///
    /// # Errors
    ///
    /// [`SyncError::Invariant`] if `current` is a tombstone or `version`
    /// does not advance it.
    pub fn update(
        tx: &mut WriteTransaction<'_>,
        current: &Item,
        fields: ItemFields,
        version: Version,
        now: Timestamp,
    ) -> SyncResult<Item> {
        Self::ensure_writable(current, version)?;
        let item = Item {
            kind: fields.kind,
            title: fields.title,
            content: fields.content,
            version,
            updated_at: now,
            ..current.clone()
        };
        tx.stage_item(item.clone())?;
        Ok(item)
    }

    /// Stages a tombstone for `current` at `version`. Payload is kept.
    ///
    /// # Errors
    ///
    /// [`SyncError::Invariant`] if `current` is already a tombstone or
    /// `version` does not advance it.
    pub fn soft_delete(
        tx: &mut WriteTransaction<'_>,
        current: &Item,
        version: Version,
        now: Timestamp,
    ) -> SyncResult<Item> {
        Self::ensure_writable(current, version)?;
        let item = Item {
            version,
            deleted: true,
            updated_at: now,
            ..current.clone()
        };
        tx.stage_item(item.clone())?;
        Ok(item)
    }

    fn ensure_writable(current: &Item, version: Version) -> SyncResult<()> {
        if current.deleted {
            return Err(SyncError::invariant(format!(
                "item {} is a tombstone",
                current.key()
            )));
        }
        if version <= current.version {
            return Err(SyncError::invariant(format!(
                "version {version} does not advance item {} at {}",
                current.key(),
                current.version
            )));
        }
        Ok(())
    }

    /// Reads a committed item, tombstones included.
    pub(crate) fn get(tables: &Tables, key: &ItemKey) -> Option<Item> {
        tables.item(key).cloned()
    }

    /// Live items of one owner, most recently updated first.
    ///
    /// Ties on `updated_at` are broken by version, newest first, so the
    /// order is total.
    pub(crate) fn list_by_owner(tables: &Tables, owner_id: &str) -> Vec<Item> {
        let mut items: Vec<Item> = tables
            .owned_by(owner_id)
            .filter(|item| !item.deleted)
            .cloned()
            .collect();
        items.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| b.version.cmp(&a.version))
        });
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing::{commit, tables_with};
    use crate::SyncStore;

    fn fields(title: &str) -> ItemFields {
        ItemFields {
            kind: "note".into(),
            title: title.into(),
            content: String::new(),
        }
    }

    #[test]
    fn staged_rows_are_read_back_in_the_transaction() {
        let store = SyncStore::open_in_memory().unwrap();
        let mut tx = store.begin_write(None).unwrap();
        let key = ItemKey::new("alice", "n1");
        let now = Timestamp::from_millis(10);

        let item =
            ItemStore::insert(&mut tx, key.clone(), fields("one"), Version::new(1), now).unwrap();
        assert_eq!(ItemStore::get_by_id(&tx, &key), Some(item.clone()));
        assert_eq!(item.created_at, item.updated_at);
        assert!(!item.deleted);
    }

    #[test]
    fn update_keeps_identity_and_creation_time() {
        let current = commit("alice", "n1", 1, "m1").item;
        let store = SyncStore::open_in_memory().unwrap();
        let mut tx = store.begin_write(None).unwrap();

        let later = Timestamp::from_millis(99);
        let updated =
            ItemStore::update(&mut tx, &current, fields("two"), Version::new(2), later).unwrap();
        assert_eq!(updated.id, current.id);
        assert_eq!(updated.created_at, current.created_at);
        assert_eq!(updated.updated_at, later);
        assert_eq!(updated.title, "two");
    }

    #[test]
    fn soft_delete_keeps_the_payload() {
        let current = commit("alice", "n1", 1, "m1").item;
        let store = SyncStore::open_in_memory().unwrap();
        let mut tx = store.begin_write(None).unwrap();

        let gone =
            ItemStore::soft_delete(&mut tx, &current, Version::new(2), Timestamp::from_millis(5))
                .unwrap();
        assert!(gone.deleted);
        assert_eq!(gone.title, current.title);
        assert_eq!(gone.version, Version::new(2));
    }

    #[test]
    fn tombstones_and_stale_versions_are_not_writable() {
        let mut current = commit("alice", "n1", 3, "m1").item;
        let store = SyncStore::open_in_memory().unwrap();
        let mut tx = store.begin_write(None).unwrap();
        let now = Timestamp::from_millis(5);

        assert!(ItemStore::update(&mut tx, &current, fields("x"), Version::new(3), now).is_err());
        current.deleted = true;
        assert!(ItemStore::soft_delete(&mut tx, &current, Version::new(4), now).is_err());
    }

    #[test]
    fn list_is_live_items_most_recent_first() {
        let mut gone = commit("alice", "c", 3, "m3");
        gone.item.deleted = true;
        let tables = tables_with(&[
            commit("alice", "a", 1, "m1"),
            commit("alice", "b", 2, "m2"),
            gone,
            commit("bob", "z", 4, "m4"),
        ]);

        let ids: Vec<_> = ItemStore::list_by_owner(&tables, "alice")
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(ItemStore::get(&tables, &ItemKey::new("alice", "c")).unwrap().deleted);
    }
}

//! Change feed.
//!
//! Clients pull everything that changed since the last version they saw.
//! Because versions are store-wide, an owner's feed skips numbers used by
//! other owners; clients must treat `latest_version` as an opaque cursor and
//! never assume contiguity.

use crate::state::Tables;
use crate::types::{Item, Version};
use serde::{Deserialize, Serialize};

/// Items changed after a cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Cursor for the next pull: the highest version in `items`, or the
    /// requested cursor when nothing changed.
    pub latest_version: Version,
    /// Changed items, tombstones included, ascending by version.
    pub items: Vec<Item>,
}

impl ChangeSet {
    /// True when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Builds change sets from the committed tables.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeFeed;

impl ChangeFeed {
    /// Every item of `owner_id` whose current version is above `since`.
    ///
    /// An item changed several times since the cursor appears once, in its
    /// current state.
    pub(crate) fn changes_since(tables: &Tables, owner_id: &str, since: Version) -> ChangeSet {
        let items: Vec<Item> = tables.owned_since(owner_id, since).cloned().collect();
        let latest_version = items.last().map_or(since, |item| item.version);
        ChangeSet {
            latest_version,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::CommitRecord;
    use crate::state::testing::{commit, tables_with};
    use crate::types::MutationType;

    fn tombstone(owner: &str, id: &str, version: u64, mutation: &str) -> CommitRecord {
        let mut record = commit(owner, id, version, mutation);
        record.item.deleted = true;
        record.mutation.mutation_type = MutationType::Delete;
        record
    }

    #[test]
    fn ascending_with_tombstones_and_other_owners_skipped() {
        let tables = tables_with(&[
            commit("alice", "a", 1, "m1"),
            commit("bob", "b", 2, "m2"),
            commit("alice", "c", 3, "m3"),
            tombstone("alice", "a", 4, "m4"),
        ]);

        let changes = ChangeFeed::changes_since(&tables, "alice", Version::ZERO);
        let seen: Vec<_> = changes
            .items
            .iter()
            .map(|item| (item.id.as_str(), item.version.as_u64(), item.deleted))
            .collect();
        assert_eq!(seen, vec![("c", 3, false), ("a", 4, true)]);
        assert_eq!(changes.latest_version, Version::new(4));
    }

    #[test]
    fn empty_result_keeps_the_cursor() {
        let tables = tables_with(&[commit("alice", "a", 1, "m1"), commit("bob", "b", 2, "m2")]);

        let changes = ChangeFeed::changes_since(&tables, "alice", Version::new(1));
        assert!(changes.is_empty());
        assert_eq!(changes.latest_version, Version::new(1));

        let ahead = ChangeFeed::changes_since(&tables, "alice", Version::new(50));
        assert_eq!(ahead.latest_version, Version::new(50));
    }

    #[test]
    fn unknown_owner_is_empty() {
        let tables = tables_with(&[commit("alice", "a", 1, "m1")]);
        assert!(ChangeFeed::changes_since(&tables, "carol", Version::ZERO).is_empty());
    }
}

//! Store fixtures and request helpers.
//!
//! Provides convenience functions for setting up test stores and building
//! the requests most tests send.

use itemsync_core::{
    CreateItem, DeleteItem, MutationContext, StoreConfig, SyncStore, UpdateItem, Version,
};
use std::path::Path;
use tempfile::TempDir;
use uuid::Uuid;

/// A test store with automatic cleanup.
pub struct TestStore {
    store: SyncStore,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestStore {
    /// Creates a new in-memory test store.
    pub fn memory() -> Self {
        Self {
            store: SyncStore::open_in_memory().expect("Failed to open in-memory store"),
            temp_dir: None,
        }
    }

    /// Creates a new file-backed test store in a temporary directory.
    ///
    /// Commits are not fsynced; the tests never cut power.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = SyncStore::open(temp_dir.path(), Self::file_config())
            .expect("Failed to open file store");
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }

    /// Closes the store and opens it again from its journal, running recovery.
    ///
    /// # Panics
    ///
    /// Panics for in-memory stores, which have nothing to reopen.
    pub fn reopen(self) -> Self {
        let temp_dir = self
            .temp_dir
            .expect("Only file-backed stores can be reopened");
        drop(self.store);
        let store = SyncStore::open(temp_dir.path(), Self::file_config())
            .expect("Failed to reopen file store");
        Self {
            store,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store directory if file-backed, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Unwraps the store. The temporary directory is removed when the
    /// returned guard drops.
    pub fn into_parts(self) -> (SyncStore, Option<TempDir>) {
        (self.store, self.temp_dir)
    }

    fn file_config() -> StoreConfig {
        StoreConfig::new().sync_on_commit(false)
    }
}

impl std::ops::Deref for TestStore {
    type Target = SyncStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Runs a test with a temporary in-memory store.
pub fn with_temp_store<F, R>(f: F) -> R
where
    F: FnOnce(&SyncStore) -> R,
{
    let test_store = TestStore::memory();
    f(&test_store)
}

/// A mutation context for `owner` with a fresh UUID mutation id.
pub fn ctx(owner: &str) -> MutationContext {
    MutationContext::new(owner, Uuid::new_v4().to_string())
}

/// A create request for a note.
pub fn note(id: &str, title: &str) -> CreateItem {
    CreateItem {
        id: id.to_string(),
        kind: "note".to_string(),
        title: title.to_string(),
        content: String::new(),
    }
}

/// An update request that retitles a note seen at `base_version`.
pub fn retitle(id: &str, title: &str, base_version: Version) -> UpdateItem {
    UpdateItem {
        id: id.to_string(),
        kind: "note".to_string(),
        title: title.to_string(),
        content: String::new(),
        base_version,
    }
}

/// A delete request for an item seen at `base_version`.
pub fn remove(id: &str, base_version: Version) -> DeleteItem {
    DeleteItem {
        id: id.to_string(),
        base_version,
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use itemsync_core::Item;

    /// Creates `count` notes for `owner`, returning them in creation order.
    pub fn populated(store: &SyncStore, owner: &str, count: usize) -> Vec<Item> {
        (0..count)
            .map(|i| {
                store
                    .create(&ctx(owner), note(&format!("note-{i}"), &format!("Note {i}")))
                    .expect("Failed to create note")
                    .item()
                    .clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemsync_core::CreateOutcome;

    #[test]
    fn memory_store_works() {
        with_temp_store(|store| {
            let outcome = store.create(&ctx("alice"), note("n1", "hello")).unwrap();
            assert!(matches!(outcome, CreateOutcome::Created(_)));
        });
    }

    #[test]
    fn file_store_survives_reopen() {
        let store = TestStore::file();
        assert!(store.path().is_some());
        scenarios::populated(&store, "alice", 3);

        let store = store.reopen();
        assert_eq!(store.latest_version(), Version::new(3));
        assert_eq!(store.list("alice").unwrap().len(), 3);
    }

    #[test]
    fn fresh_contexts_use_distinct_tokens() {
        assert_ne!(ctx("alice").mutation_id, ctx("alice").mutation_id);
    }
}

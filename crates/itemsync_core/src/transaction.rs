//! Write transactions.
//!
//! Each mutation runs inside one [`WriteTransaction`]. The transaction holds
//! the store's single write lock for its whole lifetime, sees its own staged
//! writes on top of the committed tables, and commits all of them (new
//! counter value, item row, ledger entry) as one journal frame. Dropping an
//! uncommitted transaction discards everything it staged.

use crate::error::{SyncError, SyncResult};
use crate::journal::{CommitRecord, Journal, JournalRecord};
use crate::state::Tables;
use crate::types::{Item, ItemKey, MutationId, MutationLogEntry, Version};
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

/// An open write transaction.
///
/// Obtained from [`crate::SyncStore::begin_write`]. Components stage their
/// writes through it; nothing is visible to readers until [`commit`].
///
/// [`commit`]: WriteTransaction::commit
pub struct WriteTransaction<'a> {
    journal: MutexGuard<'a, Journal>,
    tables: &'a RwLock<Tables>,
    deadline: Option<Instant>,
    base_version: Version,
    staged_version: Option<Version>,
    staged_item: Option<Item>,
    staged_mutation: Option<MutationLogEntry>,
    committed: bool,
}

impl<'a> WriteTransaction<'a> {
    /// Waits for the write lock and opens a transaction.
    ///
    /// The wait is bounded by `lock_timeout` and by the deadline, whichever
    /// is sooner.
    pub(crate) fn begin(
        journal: &'a Mutex<Journal>,
        tables: &'a RwLock<Tables>,
        lock_timeout: Duration,
        deadline: Option<Instant>,
    ) -> SyncResult<Self> {
        let (wait, limited_by_deadline) = match deadline {
            Some(deadline) => {
                let left = deadline.saturating_duration_since(Instant::now());
                if left.is_zero() {
                    return Err(SyncError::DeadlineExceeded);
                }
                if left < lock_timeout {
                    (left, true)
                } else {
                    (lock_timeout, false)
                }
            }
            None => (lock_timeout, false),
        };

        let Some(guard) = journal.try_lock_for(wait) else {
            return Err(if limited_by_deadline {
                SyncError::DeadlineExceeded
            } else {
                SyncError::LockTimeout(lock_timeout)
            });
        };

        let base_version = tables.read().latest_version;
        Ok(Self {
            journal: guard,
            tables,
            deadline,
            base_version,
            staged_version: None,
            staged_item: None,
            staged_mutation: None,
            committed: false,
        })
    }

    /// Counter value as seen by this transaction.
    #[must_use]
    pub fn latest_version(&self) -> Version {
        self.staged_version.unwrap_or(self.base_version)
    }

    /// Reads an item, staged write first.
    #[must_use]
    pub fn item(&self, key: &ItemKey) -> Option<Item> {
        if let Some(staged) = &self.staged_item {
            if staged.owner_id == key.owner_id && staged.id == key.id {
                return Some(staged.clone());
            }
        }
        self.tables.read().item(key).cloned()
    }

    /// Reads a ledger entry, staged write first.
    #[must_use]
    pub fn mutation(&self, id: &MutationId) -> Option<MutationLogEntry> {
        if let Some(staged) = &self.staged_mutation {
            if &staged.mutation_id == id {
                return Some(staged.clone());
            }
        }
        self.tables.read().mutation(id).cloned()
    }

    /// Whether the transaction's deadline has passed.
    #[must_use]
    pub fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    pub(crate) fn stage_version(&mut self, version: Version) -> SyncResult<()> {
        if self.staged_version.is_some() {
            return Err(SyncError::invariant(
                "a transaction may allocate only one version",
            ));
        }
        self.staged_version = Some(version);
        Ok(())
    }

    pub(crate) fn stage_item(&mut self, item: Item) -> SyncResult<()> {
        if self.staged_item.is_some() {
            return Err(SyncError::invariant(
                "a transaction may write only one item",
            ));
        }
        self.staged_item = Some(item);
        Ok(())
    }

    pub(crate) fn stage_mutation(&mut self, entry: MutationLogEntry) -> SyncResult<()> {
        if self.staged_mutation.is_some() {
            return Err(SyncError::invariant(
                "a transaction may record only one mutation",
            ));
        }
        self.staged_mutation = Some(entry);
        Ok(())
    }

    /// Makes the staged writes durable and visible.
    ///
    /// # Errors
    ///
    /// - [`SyncError::DeadlineExceeded`] if the deadline passed first;
    ///   nothing is written
    /// - [`SyncError::Invariant`] if the staged writes are incomplete
    /// - a storage error if the journal append fails; the journal is rolled
    ///   back and nothing becomes visible
    pub fn commit(mut self) -> SyncResult<Version> {
        if self.deadline_passed() {
            return Err(SyncError::DeadlineExceeded);
        }

        let (Some(version), Some(item), Some(mutation)) = (
            self.staged_version.take(),
            self.staged_item.take(),
            self.staged_mutation.take(),
        ) else {
            return Err(SyncError::invariant(
                "commit needs a version, an item and a ledger entry",
            ));
        };

        let record = CommitRecord {
            version,
            item,
            mutation,
        };
        self.tables.read().check_commit(&record)?;
        let appended = self.journal.append(&JournalRecord::Commit(record.clone()))?;

        {
            let mut tables = self.tables.write();
            tables.apply_commit(&record)?;
            tables.journal_bytes = appended.offset + appended.len;
        }

        self.committed = true;
        tracing::debug!(
            version = version.as_u64(),
            offset = appended.offset,
            bytes = appended.len,
            "transaction committed"
        );
        Ok(version)
    }
}

impl Drop for WriteTransaction<'_> {
    fn drop(&mut self) {
        if !self.committed && self.staged_version.is_some() {
            tracing::debug!(
                staged_version = self.latest_version().as_u64(),
                "write transaction rolled back"
            );
        }
    }
}

impl std::fmt::Debug for WriteTransaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteTransaction")
            .field("base_version", &self.base_version)
            .field("staged_version", &self.staged_version)
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::InitRecord;
    use crate::types::{MutationType, Timestamp};
    use itemsync_storage::InMemoryBackend;

    fn fixture() -> (Mutex<Journal>, RwLock<Tables>) {
        let mut tables = Tables::new();
        tables
            .apply_init(&InitRecord {
                latest_version: Version::ZERO,
                created_at: Timestamp::from_millis(1),
            })
            .unwrap();
        (
            Mutex::new(Journal::new(Box::new(InMemoryBackend::new()), false)),
            RwLock::new(tables),
        )
    }

    fn item(version: u64) -> Item {
        Item {
            id: "x".into(),
            owner_id: "a".into(),
            kind: "note".into(),
            title: "t".into(),
            content: "c".into(),
            version: Version::new(version),
            deleted: false,
            created_at: Timestamp::from_millis(1),
            updated_at: Timestamp::from_millis(1),
        }
    }

    fn entry(version: u64) -> MutationLogEntry {
        MutationLogEntry {
            mutation_id: MutationId::new("m1"),
            owner_id: "a".into(),
            item_id: "x".into(),
            mutation_type: MutationType::Create,
            applied_version: Version::new(version),
            applied_at: Timestamp::from_millis(1),
        }
    }

    #[test]
    fn staged_writes_are_private_until_commit() {
        let (journal, tables) = fixture();
        let key = ItemKey::new("a", "x");

        let mut tx = WriteTransaction::begin(&journal, &tables, Duration::from_secs(1), None).unwrap();
        tx.stage_version(Version::new(1)).unwrap();
        tx.stage_item(item(1)).unwrap();
        tx.stage_mutation(entry(1)).unwrap();

        assert!(tx.item(&key).is_some());
        assert!(tables.read().item(&key).is_none());

        assert_eq!(tx.commit().unwrap(), Version::new(1));
        assert_eq!(tables.read().latest_version, Version::new(1));
        assert!(tables.read().item(&key).is_some());
        assert!(tables.read().journal_bytes > 0);
    }

    #[test]
    fn drop_discards_staged_writes() {
        let (journal, tables) = fixture();
        {
            let mut tx =
                WriteTransaction::begin(&journal, &tables, Duration::from_secs(1), None).unwrap();
            tx.stage_version(Version::new(1)).unwrap();
            tx.stage_item(item(1)).unwrap();
        }
        assert_eq!(tables.read().latest_version, Version::ZERO);
        assert_eq!(journal.lock().size().unwrap(), 0);
    }

    #[test]
    fn incomplete_commit_is_an_invariant_error() {
        let (journal, tables) = fixture();
        let mut tx = WriteTransaction::begin(&journal, &tables, Duration::from_secs(1), None).unwrap();
        tx.stage_version(Version::new(1)).unwrap();
        assert!(matches!(tx.commit(), Err(SyncError::Invariant(_))));
    }

    #[test]
    fn second_version_in_one_transaction_is_rejected() {
        let (journal, tables) = fixture();
        let mut tx = WriteTransaction::begin(&journal, &tables, Duration::from_secs(1), None).unwrap();
        tx.stage_version(Version::new(1)).unwrap();
        assert!(tx.stage_version(Version::new(2)).is_err());
    }

    #[test]
    fn busy_lock_times_out() {
        let (journal, tables) = fixture();
        let _held = journal.lock();
        let err = WriteTransaction::begin(&journal, &tables, Duration::from_millis(20), None)
            .unwrap_err();
        assert!(matches!(err, SyncError::LockTimeout(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn expired_deadline_fails_fast() {
        let (journal, tables) = fixture();
        let deadline = Instant::now() - Duration::from_millis(1);
        let err = WriteTransaction::begin(&journal, &tables, Duration::from_secs(1), Some(deadline))
            .unwrap_err();
        assert!(matches!(err, SyncError::DeadlineExceeded));
    }

    #[test]
    fn deadline_bounds_lock_wait() {
        let (journal, tables) = fixture();
        let _held = journal.lock();
        let deadline = Instant::now() + Duration::from_millis(20);
        let err = WriteTransaction::begin(&journal, &tables, Duration::from_secs(5), Some(deadline))
            .unwrap_err();
        assert!(matches!(err, SyncError::DeadlineExceeded));
    }
}

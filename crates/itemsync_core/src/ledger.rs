//! Mutation ledger.

use crate::error::{SyncError, SyncResult};
use crate::transaction::WriteTransaction;
use crate::types::{MutationId, MutationLogEntry};

/// Remembers every applied mutation id.
///
/// An entry is written in the same commit as the mutation it describes and
/// is never changed afterwards, so a retried request can always be answered
/// from the ledger instead of being applied a second time.
#[derive(Debug, Clone, Copy, Default)]
pub struct MutationLedger;

impl MutationLedger {
    /// Looks up a mutation id.
    #[must_use]
    pub fn lookup(tx: &WriteTransaction<'_>, mutation_id: &MutationId) -> Option<MutationLogEntry> {
        tx.mutation(mutation_id)
    }

    /// Stages a ledger entry in `tx`.
    ///
    /// # Errors
    ///
    /// [`SyncError::Invariant`] if the id is already recorded or `tx`
    /// already staged an entry.
    pub fn record(tx: &mut WriteTransaction<'_>, entry: MutationLogEntry) -> SyncResult<()> {
        if tx.mutation(&entry.mutation_id).is_some() {
            return Err(SyncError::invariant(format!(
                "mutation id {} is already recorded",
                entry.mutation_id
            )));
        }
        tx.stage_mutation(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MutationType, Timestamp, Version};
    use crate::SyncStore;

    fn entry(id: &str) -> MutationLogEntry {
        MutationLogEntry {
            mutation_id: MutationId::new(id),
            owner_id: "alice".into(),
            item_id: "n1".into(),
            mutation_type: MutationType::Create,
            applied_version: Version::new(1),
            applied_at: Timestamp::from_millis(5),
        }
    }

    #[test]
    fn staged_entries_are_visible_to_their_transaction() {
        let store = SyncStore::open_in_memory().unwrap();
        let mut tx = store.begin_write(None).unwrap();
        let id = MutationId::new("m1");

        assert!(MutationLedger::lookup(&tx, &id).is_none());
        MutationLedger::record(&mut tx, entry("m1")).unwrap();
        assert_eq!(MutationLedger::lookup(&tx, &id), Some(entry("m1")));

        drop(tx);
        assert!(store.mutation(&id).is_none());
    }

    #[test]
    fn an_id_is_recorded_once() {
        let store = SyncStore::open_in_memory().unwrap();
        let mut tx = store.begin_write(None).unwrap();
        MutationLedger::record(&mut tx, entry("m1")).unwrap();
        assert!(matches!(
            MutationLedger::record(&mut tx, entry("m1")),
            Err(SyncError::Invariant(_))
        ));
    }
}

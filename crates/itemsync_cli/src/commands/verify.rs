//! Verify command implementation.

use super::{open_store, CliResult};
use itemsync_core::RecoveryReport;
use std::path::Path;

/// Replays the journal at `path` without modifying it.
pub fn verify(path: &Path) -> CliResult<RecoveryReport> {
    let store = open_store(path)?;
    Ok(store.verify()?)
}

/// Runs the verify command.
pub fn run(path: &Path) -> CliResult<()> {
    println!("Verifying store at {}", path.display());
    println!();

    match verify(path) {
        Ok(report) => {
            println!("  Frames:          {}", report.frames);
            println!("  Commits:         {}", report.commits);
            println!("  Latest version:  {}", report.latest_version);
            println!("  Valid bytes:     {}", report.valid_len);
            if let Some(offset) = report.torn_tail_at {
                println!(
                    "  Torn tail at offset {offset}; it will be discarded on next open"
                );
            }
            println!();
            println!("✓ Store verification passed");
            Ok(())
        }
        Err(err) => {
            println!("  {err}");
            println!();
            println!("✗ Store verification failed");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itemsync_core::{
        CreateItem, MutationContext, StoreConfig, SyncError, SyncStore, Version, JOURNAL_FILE,
    };
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::tempdir;

    fn seeded_store(path: &Path) {
        let store = SyncStore::open(path, StoreConfig::default()).unwrap();
        store
            .create(
                &MutationContext::new("alice", "m1"),
                CreateItem {
                    id: "a".into(),
                    kind: "note".into(),
                    title: "t".into(),
                    content: String::new(),
                },
            )
            .unwrap();
    }

    #[test]
    fn clean_store_passes() {
        let dir = tempdir().unwrap();
        seeded_store(dir.path());
        let report = verify(dir.path()).unwrap();
        assert_eq!(report.commits, 1);
        assert_eq!(report.latest_version, Version::new(1));
    }

    #[test]
    fn torn_tail_is_reported_not_repaired() {
        let dir = tempdir().unwrap();
        seeded_store(dir.path());
        let journal = dir.path().join(JOURNAL_FILE);
        OpenOptions::new()
            .append(true)
            .open(&journal)
            .unwrap()
            .write_all(b"ISJ")
            .unwrap();
        let len_before = std::fs::metadata(&journal).unwrap().len();

        let report = verify(dir.path()).unwrap();
        assert!(report.torn_tail_at.is_some());
        assert_eq!(std::fs::metadata(&journal).unwrap().len(), len_before);
    }

    #[test]
    fn corruption_fails() {
        let dir = tempdir().unwrap();
        seeded_store(dir.path());
        let journal = dir.path().join(JOURNAL_FILE);
        let mut bytes = std::fs::read(&journal).unwrap();
        let at = bytes.len() - 6;
        bytes[at] ^= 0x01;
        std::fs::write(&journal, bytes).unwrap();

        assert!(verify(dir.path()).is_err());
    }

    #[test]
    fn refuses_a_store_held_by_a_writer() {
        let dir = tempdir().unwrap();
        let writer = SyncStore::open(dir.path(), StoreConfig::default()).unwrap();

        let err = verify(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SyncError>(),
            Some(SyncError::StoreLocked(_))
        ));

        drop(writer);
        assert!(verify(dir.path()).is_ok());
    }
}

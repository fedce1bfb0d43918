//! Journal replay.
//!
//! Opening a store replays the journal into fresh tables. A writable open
//! repairs the journal first; a read-only open and `itemsync verify` replay
//! it as it is.

use crate::error::{SyncError, SyncResult};
use crate::journal::{InitRecord, Journal, JournalRecord, JournalScan};
use crate::state::Tables;
use crate::types::{Timestamp, Version};
use serde::Serialize;

/// What a replay found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    /// Complete frames replayed, the init frame included.
    pub frames: usize,
    /// Commit frames replayed.
    pub commits: usize,
    /// Counter value after replay.
    pub latest_version: Version,
    /// Bytes of valid journal.
    pub valid_len: u64,
    /// Offset of a torn trailing frame, if there was one.
    pub torn_tail_at: Option<u64>,
}

/// Replays a journal without changing it.
///
/// # Errors
///
/// [`SyncError::JournalCorruption`] if any complete frame is invalid or does
/// not follow from the frames before it.
pub fn verify_journal(journal: &Journal) -> SyncResult<RecoveryReport> {
    let scan = journal.scan()?;
    let (_, report) = replay(&scan)?;
    Ok(report)
}

/// Rebuilds the tables from `journal`, repairing a torn tail and writing the
/// init frame into an empty journal.
pub(crate) fn recover(journal: &mut Journal) -> SyncResult<(Tables, RecoveryReport)> {
    let mut scan = journal.scan()?;

    if let Some(torn_at) = scan.torn_tail {
        let size = journal.size()?;
        tracing::warn!(
            offset = torn_at,
            discarded_bytes = size - scan.valid_len,
            "discarding torn journal tail"
        );
        journal.truncate(scan.valid_len)?;
    }

    if scan.frames.is_empty() {
        let init = JournalRecord::Init(InitRecord {
            latest_version: Version::ZERO,
            created_at: Timestamp::now(),
        });
        journal.append(&init)?;
        tracing::info!("initialized new store");
        scan = journal.scan()?;
    }

    tables_from(&scan)
}

/// Rebuilds the tables from `journal` without writing to it. A torn tail is
/// reported and left in place.
pub(crate) fn load(journal: &Journal) -> SyncResult<(Tables, RecoveryReport)> {
    let scan = journal.scan()?;
    tables_from(&scan)
}

fn tables_from(scan: &JournalScan) -> SyncResult<(Tables, RecoveryReport)> {
    let (mut tables, report) = replay(scan)?;
    tables.journal_bytes = scan.valid_len;
    tracing::debug!(
        frames = report.frames,
        commits = report.commits,
        latest_version = report.latest_version.as_u64(),
        "journal replayed"
    );
    Ok((tables, report))
}

fn replay(scan: &JournalScan) -> SyncResult<(Tables, RecoveryReport)> {
    let mut tables = Tables::new();
    let mut commits = 0;

    for (index, frame) in scan.frames.iter().enumerate() {
        match &frame.record {
            JournalRecord::Init(init) => {
                if index != 0 {
                    return Err(SyncError::corruption(frame.offset, "init frame after start"));
                }
                tables
                    .apply_init(init)
                    .map_err(|err| SyncError::corruption(frame.offset, err.to_string()))?;
            }
            JournalRecord::Commit(commit) => {
                if index == 0 {
                    return Err(SyncError::corruption(
                        frame.offset,
                        "journal does not start with an init frame",
                    ));
                }
                tables
                    .apply_commit(commit)
                    .map_err(|err| SyncError::corruption(frame.offset, err.to_string()))?;
                commits += 1;
            }
        }
    }

    let report = RecoveryReport {
        frames: scan.frames.len(),
        commits,
        latest_version: tables.latest_version,
        valid_len: scan.valid_len,
        torn_tail_at: scan.torn_tail,
    };
    Ok((tables, report))
}

//! Version sequencer.

use crate::error::{SyncError, SyncResult};
use crate::transaction::WriteTransaction;
use crate::types::Version;

/// Hands out store-wide versions.
///
/// The counter lives in the committed tables and advances only when the
/// allocating transaction commits. A rolled-back transaction gives its
/// version back, so committed versions have no gaps store-wide.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionSequencer;

impl VersionSequencer {
    /// Allocates the next version inside `tx`.
    ///
    /// The write lock held by `tx` serializes allocation, so two
    /// transactions never receive the same number.
    ///
    /// # Errors
    ///
    /// - [`SyncError::VersionOverflow`] once the counter is at its maximum
    /// - [`SyncError::Invariant`] if `tx` already allocated a version
    pub fn allocate(tx: &mut WriteTransaction<'_>) -> SyncResult<Version> {
        let next = tx
            .latest_version()
            .checked_next()
            .ok_or(SyncError::VersionOverflow)?;
        tx.stage_version(next)?;
        Ok(next)
    }

    /// Highest committed version as seen by `tx`.
    #[must_use]
    pub fn current(tx: &WriteTransaction<'_>) -> Version {
        tx.latest_version()
    }
}

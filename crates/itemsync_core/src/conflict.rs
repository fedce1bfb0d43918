//! Optimistic concurrency check.

use crate::types::{Item, Version};

/// Result of comparing a client's base version with the stored item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictCheck {
    /// The client edited the current version; the write may proceed.
    Clear,
    /// The item moved on since the client last saw it. Carries the current
    /// server state so the client can merge.
    Conflict(Item),
}

impl ConflictCheck {
    /// True for [`ConflictCheck::Conflict`].
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// Compares base versions against stored versions.
///
/// Exact equality is required: a base version newer than the stored one is
/// as much a conflict as an older one, because it cannot have come from
/// this store.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector;

impl ConflictDetector {
    /// Checks `base_version` against `stored`.
    #[must_use]
    pub fn check(stored: &Item, base_version: Version) -> ConflictCheck {
        if stored.version == base_version {
            ConflictCheck::Clear
        } else {
            ConflictCheck::Conflict(stored.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn stored(version: u64) -> Item {
        Item {
            id: "x".into(),
            owner_id: "a".into(),
            kind: "note".into(),
            title: String::new(),
            content: String::new(),
            version: Version::new(version),
            deleted: false,
            created_at: Timestamp::from_millis(0),
            updated_at: Timestamp::from_millis(0),
        }
    }

    #[test]
    fn matching_base_is_clear() {
        assert_eq!(ConflictDetector::check(&stored(4), Version::new(4)), ConflictCheck::Clear);
    }

    #[test]
    fn stale_base_conflicts_with_current_state() {
        let check = ConflictDetector::check(&stored(4), Version::new(3));
        assert_eq!(check, ConflictCheck::Conflict(stored(4)));
    }

    #[test]
    fn future_base_conflicts() {
        assert!(ConflictDetector::check(&stored(4), Version::new(9)).is_conflict());
    }
}

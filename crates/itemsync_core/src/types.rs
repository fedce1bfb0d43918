//! Data model shared by every component of the store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A store-wide version number.
///
/// One counter serves every owner and every item, so versions form a single
/// total order across the store. That order doubles as the change-feed
/// cursor. Versions are unique and increasing but not contiguous for any
/// single owner.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// The counter value of a freshly initialized store. No item ever carries it.
    pub const ZERO: Version = Version(0);

    /// Largest representable version.
    pub const MAX: Version = Version(u64::MAX);

    /// Wraps a raw version number.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw version number.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// The version after this one, or `None` once the counter is exhausted.
    #[must_use]
    pub fn checked_next(self) -> Option<Version> {
        self.0.checked_add(1).map(Version)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Wall-clock time in milliseconds since the Unix epoch.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The current time. A clock set before 1970 reads as the epoch.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Builds a timestamp from raw milliseconds.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Raw milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// What a mutation did to its item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationType {
    /// The item was created.
    Create,
    /// The item's payload was replaced.
    Update,
    /// The item was tombstoned.
    Delete,
}

impl MutationType {
    /// Lowercase name, as written to logs and the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MutationType::Create => "create",
            MutationType::Update => "update",
            MutationType::Delete => "delete",
        }
    }
}

impl fmt::Display for MutationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client-generated idempotency token for one logical mutation.
///
/// Clients are expected to send a UUID; the core only requires a non-empty
/// string and leaves format checks to the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MutationId(String);

impl MutationId {
    /// Wraps a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token as sent by the client.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MutationId {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for MutationId {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Primary key of an item: ids are only unique per owner.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    /// Owning user.
    pub owner_id: String,
    /// Client-chosen id.
    pub id: String,
}

impl ItemKey {
    /// Builds a key.
    pub fn new(owner_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner_id, self.id)
    }
}

/// The authoritative state of one user-owned record.
///
/// Deleted items stay in the store with `deleted` set so the change feed can
/// carry the deletion to other devices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Client-chosen id, unique per owner.
    pub id: String,
    /// Owning user.
    pub owner_id: String,
    /// Free-form record category.
    pub kind: String,
    /// Title payload.
    pub title: String,
    /// Body payload.
    pub content: String,
    /// Version of the mutation that produced this state.
    pub version: Version,
    /// Tombstone flag.
    pub deleted: bool,
    /// When the item was created.
    pub created_at: Timestamp,
    /// When the item last changed, deletion included.
    pub updated_at: Timestamp,
}

impl Item {
    /// The item's primary key.
    #[must_use]
    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.owner_id.clone(), self.id.clone())
    }
}

/// Ledger row recording that a mutation id has been applied.
///
/// Written once, in the same commit as the mutation itself, and never
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationLogEntry {
    /// The client's idempotency token.
    pub mutation_id: MutationId,
    /// Owner the mutation was applied for.
    pub owner_id: String,
    /// Item the mutation touched.
    pub item_id: String,
    /// What the mutation did.
    pub mutation_type: MutationType,
    /// Version allocated to the mutation.
    pub applied_version: Version,
    /// Commit time.
    pub applied_at: Timestamp,
}

impl MutationLogEntry {
    /// Key of the item this entry points at.
    #[must_use]
    pub fn item_key(&self) -> ItemKey {
        ItemKey::new(self.owner_id.clone(), self.item_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_ordering_and_next() {
        assert!(Version::new(2) > Version::new(1));
        assert_eq!(Version::ZERO.checked_next(), Some(Version::new(1)));
        assert_eq!(Version::MAX.checked_next(), None);
        assert_eq!(Version::new(42).to_string(), "42");
    }

    #[test]
    fn mutation_type_names() {
        assert_eq!(MutationType::Create.to_string(), "create");
        assert_eq!(MutationType::Update.as_str(), "update");
        assert_eq!(MutationType::Delete.as_str(), "delete");
    }

    #[test]
    fn item_key_scopes_ids_by_owner() {
        let alice = ItemKey::new("alice", "note-1");
        let bob = ItemKey::new("bob", "note-1");
        assert_ne!(alice, bob);
        assert_eq!(alice.to_string(), "alice/note-1");
    }

    #[test]
    fn timestamps_move_forward() {
        let earlier = Timestamp::from_millis(1_000);
        assert!(Timestamp::now() > earlier);
    }
}

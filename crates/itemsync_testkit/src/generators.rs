//! Property-based test generators using proptest.
//!
//! Provides strategies for ids, payloads and whole client sessions.

use itemsync_core::{CreateItem, Version};
use proptest::prelude::*;

/// Strategy for owner ids drawn from a small pool, so owners collide.
pub fn owner_id_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["alice", "bob", "carol"]).prop_map(str::to_string)
}

/// Strategy for item ids drawn from a small pool, so items get revisited.
pub fn item_id_strategy() -> impl Strategy<Value = String> {
    (0u8..6).prop_map(|n| format!("item-{n}"))
}

/// Strategy for item kinds.
pub fn kind_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["note", "task", "bookmark"]).prop_map(str::to_string)
}

/// Strategy for title and content text, including the empty string.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 ]{0,24}").expect("Invalid regex")
}

/// Strategy for create requests.
pub fn create_item_strategy() -> impl Strategy<Value = CreateItem> {
    (item_id_strategy(), kind_strategy(), text_strategy(), text_strategy()).prop_map(
        |(id, kind, title, content)| CreateItem {
            id,
            kind,
            title,
            content,
        },
    )
}

/// One step a client can take against a store.
#[derive(Debug, Clone)]
pub enum ClientOp {
    /// Create an item.
    Create {
        /// Owner.
        owner: String,
        /// Request.
        request: CreateItem,
    },
    /// Retitle an item, basing the edit on its current version or, when
    /// `stale` is set, on an older one.
    Update {
        /// Owner.
        owner: String,
        /// Item id.
        id: String,
        /// New title.
        title: String,
        /// Base the edit on an outdated version.
        stale: bool,
    },
    /// Delete an item at its current version.
    Delete {
        /// Owner.
        owner: String,
        /// Item id.
        id: String,
    },
    /// Resend the n-th earlier mutation with its original token.
    Retry(prop::sample::Index),
}

/// Strategy for a single client step.
pub fn client_op_strategy() -> impl Strategy<Value = ClientOp> {
    prop_oneof![
        3 => (owner_id_strategy(), create_item_strategy())
            .prop_map(|(owner, request)| ClientOp::Create { owner, request }),
        3 => (owner_id_strategy(), item_id_strategy(), text_strategy(), any::<bool>())
            .prop_map(|(owner, id, title, stale)| ClientOp::Update { owner, id, title, stale }),
        1 => (owner_id_strategy(), item_id_strategy())
            .prop_map(|(owner, id)| ClientOp::Delete { owner, id }),
        2 => any::<prop::sample::Index>().prop_map(ClientOp::Retry),
    ]
}

/// Strategy for a client session of up to `max_len` steps.
pub fn client_session_strategy(max_len: usize) -> impl Strategy<Value = Vec<ClientOp>> {
    prop::collection::vec(client_op_strategy(), 1..max_len)
}

/// Strategy for change-feed cursors up to `max`.
pub fn cursor_strategy(max: u64) -> impl Strategy<Value = Version> {
    (0..=max).prop_map(Version::new)
}

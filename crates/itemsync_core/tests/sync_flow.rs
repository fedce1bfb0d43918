//! End-to-end mutation flows through the public API.

use itemsync_core::{
    CreateItem, CreateOutcome, DeleteItem, DeleteOutcome, MutationContext, MutationId,
    MutationType, SyncStore, UpdateItem, UpdateOutcome, Version,
};
use std::sync::Arc;
use std::thread;

fn note(id: &str, title: &str) -> CreateItem {
    CreateItem {
        id: id.to_string(),
        kind: "note".to_string(),
        title: title.to_string(),
        content: String::new(),
    }
}

fn edit(id: &str, title: &str, base: Version) -> UpdateItem {
    UpdateItem {
        id: id.to_string(),
        kind: "note".to_string(),
        title: title.to_string(),
        content: String::new(),
        base_version: base,
    }
}

#[test]
fn two_devices_edit_the_same_item() {
    let store = SyncStore::open_in_memory().unwrap();
    let alice = |token: &str| MutationContext::new("alice", token);

    let CreateOutcome::Created(created) = store.create(&alice("phone-1"), note("A", "draft")).unwrap()
    else {
        panic!("create failed");
    };
    assert_eq!(created.version, Version::new(1));

    // Both devices saw version 1. The laptop writes first.
    let laptop = store.update(&alice("laptop-1"), edit("A", "laptop", Version::new(1))).unwrap();
    let UpdateOutcome::Updated(after_laptop) = laptop else {
        panic!("laptop update failed");
    };
    assert_eq!(after_laptop.version, Version::new(2));

    let phone = store.update(&alice("phone-2"), edit("A", "phone", Version::new(1))).unwrap();
    let UpdateOutcome::Conflict(server) = phone else {
        panic!("phone update should conflict");
    };
    assert_eq!(server, after_laptop);

    // The phone merges and retries against the version it was shown.
    let merged = store
        .update(&alice("phone-3"), edit("A", "laptop + phone", server.version))
        .unwrap();
    assert!(matches!(merged, UpdateOutcome::Updated(ref item) if item.version == Version::new(3)));

    let deleted = store
        .delete(
            &alice("phone-4"),
            DeleteItem {
                id: "A".into(),
                base_version: Version::new(3),
            },
        )
        .unwrap();
    assert!(matches!(deleted, DeleteOutcome::Deleted(ref item) if item.deleted));

    let feed = store.changes("alice", Version::ZERO).unwrap();
    assert_eq!(feed.latest_version, Version::new(4));
    assert_eq!(feed.items.len(), 1);
    assert!(feed.items[0].deleted);
    assert!(store.list("alice").unwrap().is_empty());
    assert!(store.get("alice", "A").unwrap().is_some_and(|item| item.deleted));
}

#[test]
fn retried_mutations_are_answered_from_the_ledger() {
    let store = SyncStore::open_in_memory().unwrap();
    let ctx = MutationContext::new("alice", "T1");

    let first = store.create(&ctx, note("B", "once")).unwrap();
    for _ in 0..5 {
        let retry = store.create(&ctx, note("B", "once")).unwrap();
        let CreateOutcome::Replayed(replay) = retry else {
            panic!("retry was applied again");
        };
        assert_eq!(replay.applied_version, first.item().version);
        assert_eq!(&replay.item, first.item());
    }
    assert_eq!(store.latest_version(), Version::new(1));

    let entry = store.mutation(&MutationId::new("T1")).unwrap();
    assert_eq!(entry.mutation_type, MutationType::Create);
    assert_eq!(entry.item_id, "B");
}

#[test]
fn change_feed_resumes_from_cursor() {
    let store = SyncStore::open_in_memory().unwrap();
    let alice = |token: &str| MutationContext::new("alice", token);
    let bob = |token: &str| MutationContext::new("bob", token);

    store.create(&alice("a1"), note("one", "1")).unwrap();
    store.create(&bob("b1"), note("one", "1")).unwrap();
    store.create(&alice("a2"), note("two", "2")).unwrap();

    let first_pull = store.changes("alice", Version::ZERO).unwrap();
    let versions: Vec<_> = first_pull.items.iter().map(|i| i.version.as_u64()).collect();
    // Bob's write used version 2; alice's feed skips it.
    assert_eq!(versions, vec![1, 3]);
    assert_eq!(first_pull.latest_version, Version::new(3));

    // Pulling again from the same cursor before any write is identical.
    assert_eq!(store.changes("alice", Version::ZERO).unwrap(), first_pull);

    let nothing_new = store.changes("alice", first_pull.latest_version).unwrap();
    assert!(nothing_new.is_empty());
    assert_eq!(nothing_new.latest_version, first_pull.latest_version);

    store
        .update(&alice("a3"), edit("one", "1b", Version::new(1)))
        .unwrap();
    let second_pull = store.changes("alice", first_pull.latest_version).unwrap();
    assert_eq!(second_pull.items.len(), 1);
    assert_eq!(second_pull.items[0].id, "one");
    assert_eq!(second_pull.latest_version, Version::new(4));

    let bob_feed = store.changes("bob", Version::ZERO).unwrap();
    assert_eq!(bob_feed.items.len(), 1);
    assert_eq!(bob_feed.latest_version, Version::new(2));
}

#[test]
fn concurrent_creates_get_distinct_versions() {
    let store = Arc::new(SyncStore::open_in_memory().unwrap());
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                (0..25)
                    .map(|n| {
                        let ctx = MutationContext::new(format!("owner-{}", worker % 3), format!("w{worker}-{n}"));
                        store
                            .create(&ctx, note(&format!("w{worker}-{n}"), "x"))
                            .unwrap()
                            .item()
                            .version
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut versions: Vec<Version> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();
    versions.sort();
    let expected: Vec<Version> = (1..=200).map(Version::new).collect();
    assert_eq!(versions, expected);
    assert_eq!(store.latest_version(), Version::new(200));
}

//! Concurrency helpers.
//!
//! These race many clients against one store and report what each saw, so
//! tests can assert on ordering and conflict behavior.

use crate::fixtures::{ctx, note, retitle};
use itemsync_core::{Item, SyncError, SyncStore, UpdateOutcome, Version};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of a batch of concurrent creates.
#[derive(Debug, Clone)]
pub struct CreateRace {
    /// Version of every created item, in no particular order.
    pub versions: Vec<Version>,
    /// Mutations that failed outright.
    pub errors: Vec<String>,
    /// Wall-clock time of the whole batch.
    pub duration: Duration,
}

impl CreateRace {
    /// Operations per second over the batch.
    pub fn ops_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.versions.len() as f64 / secs
        } else {
            0.0
        }
    }
}

/// Outcome of many clients editing the same item version at once.
#[derive(Debug, Clone)]
pub struct UpdateRace {
    /// Items returned to the clients whose update was applied.
    pub winners: Vec<Item>,
    /// Server state returned to the clients that lost.
    pub conflicts: Vec<Item>,
    /// Mutations that failed outright.
    pub errors: Vec<String>,
}

/// Runs `threads` clients that each create `per_thread` items for their own
/// owner.
pub fn concurrent_creates(store: &Arc<SyncStore>, threads: usize, per_thread: usize) -> CreateRace {
    let barrier = Arc::new(Barrier::new(threads));
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = Arc::clone(store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let owner = format!("owner-{t}");
                barrier.wait();
                (0..per_thread)
                    .map(|i| {
                        store
                            .create(&ctx(&owner), note(&format!("n{i}"), "stress"))
                            .map(|outcome| outcome.item().version)
                    })
                    .collect::<Vec<Result<Version, SyncError>>>()
            })
        })
        .collect();

    let mut versions = Vec::new();
    let mut errors = Vec::new();
    for handle in handles {
        for result in handle.join().expect("create thread panicked") {
            match result {
                Ok(version) => versions.push(version),
                Err(err) => errors.push(err.to_string()),
            }
        }
    }

    CreateRace {
        versions,
        errors,
        duration: start.elapsed(),
    }
}

/// Creates `owner/id` and then lets `threads` clients update it from the
/// same base version at once.
///
/// # Panics
///
/// Panics if the item cannot be created first.
pub fn concurrent_updates(
    store: &Arc<SyncStore>,
    owner: &str,
    id: &str,
    threads: usize,
) -> UpdateRace {
    let base = store
        .create(&ctx(owner), note(id, "original"))
        .expect("Failed to create contested item")
        .item()
        .version;

    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let store = Arc::clone(store);
            let barrier = Arc::clone(&barrier);
            let owner = owner.to_string();
            let id = id.to_string();
            thread::spawn(move || {
                barrier.wait();
                store.update(&ctx(&owner), retitle(&id, &format!("edit {t}"), base))
            })
        })
        .collect();

    let mut race = UpdateRace {
        winners: Vec::new(),
        conflicts: Vec::new(),
        errors: Vec::new(),
    };
    for handle in handles {
        match handle.join().expect("update thread panicked") {
            Ok(UpdateOutcome::Updated(item)) => race.winners.push(item),
            Ok(UpdateOutcome::Conflict(item)) => race.conflicts.push(item),
            Ok(other) => race.errors.push(format!("unexpected outcome: {other:?}")),
            Err(err) => race.errors.push(err.to_string()),
        }
    }
    race
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_update_race() {
        let store = Arc::new(SyncStore::open_in_memory().unwrap());
        let race = concurrent_updates(&store, "alice", "doc", 4);
        assert!(race.errors.is_empty(), "{:?}", race.errors);
        assert_eq!(race.winners.len(), 1);
        assert_eq!(race.conflicts.len(), 3);
    }
}

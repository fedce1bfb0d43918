//! Init command implementation.

use super::CliResult;
use itemsync_core::{StoreConfig, SyncStore, JOURNAL_FILE};
use std::path::Path;

/// Runs the init command.
pub fn run(path: &Path) -> CliResult<()> {
    if path.join(JOURNAL_FILE).exists() {
        return Err(format!("A store already exists at {}", path.display()).into());
    }

    let store = SyncStore::open(path, StoreConfig::default())?;
    println!(
        "Initialized store at {} ({} bytes)",
        path.display(),
        store.stats().journal_bytes
    );
    Ok(())
}

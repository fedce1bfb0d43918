//! CLI command implementations.

pub mod dump_journal;
pub mod init;
pub mod inspect;
pub mod items;
pub mod verify;

use clap::ValueEnum;
use itemsync_core::{StoreConfig, SyncStore};
use std::path::Path;

/// Result type shared by the commands.
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// How command output is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Opens an existing store read-only.
///
/// Never creates or repairs anything, and fails while a writer has the store
/// open.
pub fn open_store(path: &Path) -> CliResult<SyncStore> {
    tracing::debug!(path = %path.display(), "opening store read-only");
    let config = StoreConfig::new().create_if_missing(false).read_only(true);
    Ok(SyncStore::open(path, config)?)
}

//! Inspect command implementation.

use super::{open_store, CliResult, OutputFormat};
use itemsync_core::StoreStats;
use serde::Serialize;
use std::path::Path;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store directory.
    pub path: String,
    /// Store counters.
    #[serde(flatten)]
    pub stats: StoreStats,
}

/// Collects the inspection result.
pub fn inspect(path: &Path) -> CliResult<InspectResult> {
    let store = open_store(path)?;
    Ok(InspectResult {
        path: path.display().to_string(),
        stats: store.stats(),
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: OutputFormat) -> CliResult<()> {
    let result = inspect(path)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => print_text_output(&result),
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    let stats = &result.stats;
    println!("Store: {}", result.path);
    println!();
    println!("  Latest version:  {}", stats.latest_version);
    println!("  Live items:      {}", stats.live_items);
    println!("  Tombstones:      {}", stats.tombstones);
    println!("  Owners:          {}", stats.owners);
    println!("  Ledger entries:  {}", stats.ledger_entries);
    println!("  Journal size:    {} bytes", stats.journal_bytes);
}

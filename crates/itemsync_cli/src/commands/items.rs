//! Read-only item commands: `list` and `changes`.

use super::{open_store, CliResult, OutputFormat};
use itemsync_core::{ChangeSet, Item, Version};
use std::path::Path;

/// Runs the list command.
pub fn list(path: &Path, owner: &str, format: OutputFormat) -> CliResult<()> {
    let store = open_store(path)?;
    let items = store.list(owner)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&items)?),
        OutputFormat::Text => {
            print_items(&items);
            println!();
            println!("Total: {} items", items.len());
        }
    }
    Ok(())
}

/// Runs the changes command.
pub fn changes(path: &Path, owner: &str, since: u64, format: OutputFormat) -> CliResult<()> {
    let store = open_store(path)?;
    let changes = store.changes(owner, Version::new(since))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&changes)?),
        OutputFormat::Text => print_changes(&changes, since),
    }
    Ok(())
}

fn print_changes(changes: &ChangeSet, since: u64) {
    if changes.is_empty() {
        println!("No changes after version {since}");
        return;
    }
    print_items(&changes.items);
    println!();
    println!(
        "{} changes, resume from version {}",
        changes.items.len(),
        changes.latest_version
    );
}

fn print_items(items: &[Item]) {
    println!(
        "{:>8}  {:<24}  {:<12}  {:<7}  {}",
        "VERSION", "ID", "KIND", "STATE", "TITLE"
    );
    for item in items {
        let state = if item.deleted { "deleted" } else { "live" };
        println!(
            "{:>8}  {:<24}  {:<12}  {:<7}  {}",
            item.version, item.id, item.kind, state, item.title
        );
    }
}

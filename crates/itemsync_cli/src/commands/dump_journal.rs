//! Dump journal command implementation.

use super::{CliResult, OutputFormat};
use itemsync_core::journal::{JournalReader, JournalRecord};
use itemsync_core::{LockMode, StoreDir};
use itemsync_storage::{FileBackend, StorageBackend};
use serde::Serialize;
use std::path::Path;

/// Journal frame representation for output.
#[derive(Debug, Serialize)]
pub struct FrameInfo {
    /// Offset in the journal file.
    pub offset: u64,
    /// Frame length in bytes.
    pub len: u64,
    /// Record type.
    pub record_type: &'static str,
    /// Version written by the frame.
    pub version: u64,
    /// Owner of the touched item (commit frames only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    /// Touched item id (commit frames only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Mutation type (commit frames only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutation_type: Option<&'static str>,
    /// Idempotency token (commit frames only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mutation_id: Option<String>,
}

/// Output of a dump, frames plus where reading stopped.
#[derive(Debug, Serialize)]
pub struct JournalDump {
    /// Decoded frames, in journal order.
    pub frames: Vec<FrameInfo>,
    /// Offset of an incomplete trailing frame, if reading reached one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torn_tail_at: Option<u64>,
}

/// Runs the dump-journal command.
pub fn run(path: &Path, limit: Option<usize>, format: OutputFormat) -> CliResult<()> {
    let dir = StoreDir::open(path, false, LockMode::Shared)?;
    let backend = FileBackend::open_existing(&dir.journal_path())?;
    let dump = read_frames(&backend, limit)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&dump)?),
        OutputFormat::Text => print_text_output(&dump),
    }
    Ok(())
}

/// Decodes up to `limit` frames from the start of `backend`.
pub fn read_frames(backend: &dyn StorageBackend, limit: Option<usize>) -> CliResult<JournalDump> {
    let max_frames = limit.unwrap_or(usize::MAX);
    let mut reader = JournalReader::new(backend)?;
    let mut frames = Vec::new();

    while frames.len() < max_frames {
        let Some(frame) = reader.next_frame()? else {
            break;
        };
        let info = match &frame.record {
            JournalRecord::Init(init) => FrameInfo {
                offset: frame.offset,
                len: frame.len,
                record_type: "init",
                version: init.latest_version.as_u64(),
                owner_id: None,
                item_id: None,
                mutation_type: None,
                mutation_id: None,
            },
            JournalRecord::Commit(commit) => FrameInfo {
                offset: frame.offset,
                len: frame.len,
                record_type: "commit",
                version: commit.version.as_u64(),
                owner_id: Some(commit.item.owner_id.clone()),
                item_id: Some(commit.item.id.clone()),
                mutation_type: Some(commit.mutation.mutation_type.as_str()),
                mutation_id: Some(commit.mutation.mutation_id.as_str().to_string()),
            },
        };
        frames.push(info);
    }

    Ok(JournalDump {
        frames,
        torn_tail_at: reader.torn_tail(),
    })
}

fn print_text_output(dump: &JournalDump) {
    println!(
        "{:>10}  {:>6}  {:<8}  {:>8}  {:<7}  {}",
        "OFFSET", "LEN", "TYPE", "VERSION", "OP", "ITEM"
    );
    for frame in &dump.frames {
        let item = match (&frame.owner_id, &frame.item_id) {
            (Some(owner), Some(id)) => format!("{owner}/{id}"),
            _ => "-".to_string(),
        };
        println!(
            "{:>10}  {:>6}  {:<8}  {:>8}  {:<7}  {}",
            frame.offset,
            frame.len,
            frame.record_type,
            frame.version,
            frame.mutation_type.unwrap_or("-"),
            item
        );
    }
    if let Some(offset) = dump.torn_tail_at {
        println!();
        println!("Torn tail at offset {offset}");
    }
    println!();
    println!("Total: {} frames", dump.frames.len());
}

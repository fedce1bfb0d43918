//! Commit journal.
//!
//! Every mutation is committed as a single self-checking frame appended to a
//! storage backend. The in-memory tables are rebuilt from the journal when a
//! store opens, so the journal is the only thing that has to be durable.
//!
//! ## Frame Format
//!
//! ```text
//! | magic "ISJ1" (4) | format version (2) | type (1) | length (4) | CBOR payload (N) | crc32 (4) |
//! ```
//!
//! All integers are little-endian. The CRC covers every byte before it.
//!
//! ## Recovery Policy
//!
//! A frame cut short at the end of the journal (incomplete header or payload)
//! is a crash during append: the tail is reported as torn and discarded.
//! A complete frame with a bad checksum, bad magic, unknown type or
//! undecodable payload is corruption and the store refuses to open.

mod reader;
mod record;
mod writer;

pub use reader::{Frame, JournalReader, JournalScan};
pub use record::{
    CommitRecord, InitRecord, JournalRecord, RecordType, CRC_LEN, HEADER_LEN,
    JOURNAL_FORMAT_VERSION, JOURNAL_MAGIC,
};
pub use writer::{AppendedFrame, Journal};

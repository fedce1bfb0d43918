//! Journal record types and frame encoding.

use crate::error::{SyncError, SyncResult};
use crate::types::{Item, MutationLogEntry, Timestamp, Version};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Magic bytes opening every frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"ISJ1";

/// Frame format version.
pub const JOURNAL_FORMAT_VERSION: u16 = 1;

/// magic (4) + format version (2) + record type (1) + payload length (4)
pub const HEADER_LEN: usize = 11;

/// Trailing CRC32.
pub const CRC_LEN: usize = 4;

/// Kind of journal record, stored as one byte in the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Store initialization; creates the version counter.
    Init = 1,
    /// One committed mutation.
    Commit = 2,
}

impl RecordType {
    /// Parses a header byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Init),
            2 => Some(Self::Commit),
            _ => None,
        }
    }

    /// Header byte for this type.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Short name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Commit => "commit",
        }
    }
}

/// Written once, as the first frame of a new journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitRecord {
    /// Starting value of the version counter; always zero for new stores.
    pub latest_version: Version,
    /// When the store was created.
    pub created_at: Timestamp,
}

/// Everything one mutation changed, committed as a single frame.
///
/// The counter value, the new item row and the ledger entry travel together,
/// so recovery sees either all three or none of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Version allocated by the sequencer; the counter's new value.
    pub version: Version,
    /// Full item row after the mutation.
    pub item: Item,
    /// Idempotency ledger entry for the mutation.
    pub mutation: MutationLogEntry,
}

/// A decoded journal record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalRecord {
    /// Store initialization.
    Init(InitRecord),
    /// A committed mutation.
    Commit(CommitRecord),
}

impl JournalRecord {
    /// The record's type tag.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        match self {
            Self::Init(_) => RecordType::Init,
            Self::Commit(_) => RecordType::Commit,
        }
    }

    /// Encodes the record as a complete frame, checksum included.
    ///
    /// # Errors
    ///
    /// Fails if the payload cannot be serialized or exceeds 4 GiB.
    pub fn encode_frame(&self) -> SyncResult<Vec<u8>> {
        let payload = match self {
            Self::Init(init) => to_cbor(init)?,
            Self::Commit(commit) => to_cbor(commit)?,
        };
        let len = u32::try_from(payload.len())
            .map_err(|_| SyncError::Codec("journal payload larger than 4 GiB".into()))?;

        let mut frame = Vec::with_capacity(HEADER_LEN + payload.len() + CRC_LEN);
        frame.extend_from_slice(&JOURNAL_MAGIC);
        frame.extend_from_slice(&JOURNAL_FORMAT_VERSION.to_le_bytes());
        frame.push(self.record_type().as_byte());
        frame.extend_from_slice(&len.to_le_bytes());
        frame.extend_from_slice(&payload);

        let crc = crc32fast::hash(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }

    /// Decodes a payload of the given type.
    ///
    /// # Errors
    ///
    /// Fails if the payload is not valid CBOR for that record type.
    pub fn decode_payload(record_type: RecordType, payload: &[u8]) -> SyncResult<Self> {
        Ok(match record_type {
            RecordType::Init => Self::Init(from_cbor(payload)?),
            RecordType::Commit => Self::Commit(from_cbor(payload)?),
        })
    }
}

fn to_cbor<T: Serialize>(value: &T) -> SyncResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| SyncError::Codec(e.to_string()))?;
    Ok(buf)
}

fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> SyncResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| SyncError::Codec(e.to_string()))
}

//! Sequential frame reader used by recovery and inspection.

use super::record::{
    JournalRecord, RecordType, CRC_LEN, HEADER_LEN, JOURNAL_FORMAT_VERSION, JOURNAL_MAGIC,
};
use crate::error::{SyncError, SyncResult};
use itemsync_storage::StorageBackend;

/// One decoded frame and where it sits in the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Offset of the frame's first byte.
    pub offset: u64,
    /// Total frame length, header and checksum included.
    pub len: u64,
    /// The decoded record.
    pub record: JournalRecord,
}

/// Reads frames one at a time from the start of a backend.
///
/// Stops with `Ok(None)` at the end of the journal or at a torn tail; check
/// [`JournalReader::torn_tail`] afterwards to tell them apart.
///
/// An incomplete frame is only a torn tail when nothing valid follows it. A
/// frame whose length runs over a later intact frame has a damaged header
/// and is reported as corruption.
pub struct JournalReader<'a> {
    backend: &'a dyn StorageBackend,
    size: u64,
    offset: u64,
    torn_tail: Option<u64>,
    finished: bool,
}

impl<'a> JournalReader<'a> {
    /// Starts reading at offset zero.
    ///
    /// # Errors
    ///
    /// Fails if the backend size cannot be read.
    pub fn new(backend: &'a dyn StorageBackend) -> SyncResult<Self> {
        let size = backend.size()?;
        Ok(Self {
            backend,
            size,
            offset: 0,
            torn_tail: None,
            finished: false,
        })
    }

    /// Offset just past the last complete frame read so far.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Offset where an incomplete trailing frame starts, once reading hit one.
    #[must_use]
    pub fn torn_tail(&self) -> Option<u64> {
        self.torn_tail
    }

    /// Reads the next complete frame.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::JournalCorruption`] for a complete but invalid
    /// frame, or a storage error if the backend cannot be read.
    pub fn next_frame(&mut self) -> SyncResult<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let start = self.offset;
        let remaining = self.size - start;
        if remaining == 0 {
            self.finished = true;
            return Ok(None);
        }
        if remaining < HEADER_LEN as u64 {
            return Ok(self.stop_torn(start));
        }

        let header = self.backend.read_at(start, HEADER_LEN)?;
        if header[0..4] != JOURNAL_MAGIC {
            self.finished = true;
            return Err(SyncError::corruption(start, "bad frame magic"));
        }

        let format = u16::from_le_bytes([header[4], header[5]]);
        if format != JOURNAL_FORMAT_VERSION {
            self.finished = true;
            return Err(SyncError::corruption(
                start,
                format!("unsupported format version {format}"),
            ));
        }

        let type_byte = header[6];
        let payload_len = u32::from_le_bytes([header[7], header[8], header[9], header[10]]);
        let frame_len = (HEADER_LEN + CRC_LEN) as u64 + u64::from(payload_len);
        if remaining < frame_len {
            if self.intact_frame_after(start)? {
                self.finished = true;
                return Err(SyncError::corruption(
                    start,
                    format!("frame length {frame_len} runs over a later intact frame"),
                ));
            }
            return Ok(self.stop_torn(start));
        }

        let body = self
            .backend
            .read_at(start + HEADER_LEN as u64, payload_len as usize + CRC_LEN)?;
        let (payload, crc_bytes) = body.split_at(payload_len as usize);
        let stored_crc = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&header);
        hasher.update(payload);
        if hasher.finalize() != stored_crc {
            self.finished = true;
            return Err(SyncError::corruption(start, "checksum mismatch"));
        }

        let Some(record_type) = RecordType::from_byte(type_byte) else {
            self.finished = true;
            return Err(SyncError::corruption(
                start,
                format!("unknown record type {type_byte}"),
            ));
        };

        let record = JournalRecord::decode_payload(record_type, payload).map_err(|err| {
            self.finished = true;
            SyncError::corruption(start, format!("undecodable {} payload: {err}", record_type.name()))
        })?;

        self.offset = start + frame_len;
        Ok(Some(Frame {
            offset: start,
            len: frame_len,
            record,
        }))
    }

    /// True if a complete frame with a valid checksum starts anywhere after
    /// `start`.
    fn intact_frame_after(&self, start: u64) -> SyncResult<bool> {
        let rest = self.backend.read_at(start + 1, (self.size - start - 1) as usize)?;
        let mut at = 0;
        while rest.len() - at >= HEADER_LEN + CRC_LEN {
            let Some(found) = rest[at..]
                .windows(JOURNAL_MAGIC.len())
                .position(|window| window == JOURNAL_MAGIC)
            else {
                return Ok(false);
            };
            at += found;
            if is_intact_frame(&rest[at..]) {
                tracing::debug!(
                    offset = start + 1 + at as u64,
                    "intact frame found past an overlong frame"
                );
                return Ok(true);
            }
            at += 1;
        }
        Ok(false)
    }

    fn stop_torn(&mut self, at: u64) -> Option<Frame> {
        self.finished = true;
        self.torn_tail = Some(at);
        None
    }
}

impl Iterator for JournalReader<'_> {
    type Item = SyncResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

fn is_intact_frame(bytes: &[u8]) -> bool {
    if bytes.len() < HEADER_LEN + CRC_LEN || bytes[0..4] != JOURNAL_MAGIC {
        return false;
    }
    let payload_len = u32::from_le_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]) as usize;
    let Some(body_end) = HEADER_LEN.checked_add(payload_len) else {
        return false;
    };
    if bytes.len() - CRC_LEN < body_end {
        return false;
    }
    let crc_bytes = &bytes[body_end..body_end + CRC_LEN];
    let stored_crc = u32::from_le_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
    crc32fast::hash(&bytes[..body_end]) == stored_crc
}

/// Every complete frame in a journal.
#[derive(Debug, Clone, Default)]
pub struct JournalScan {
    /// Complete frames in journal order.
    pub frames: Vec<Frame>,
    /// Length of the valid prefix: the offset just past the last good frame.
    pub valid_len: u64,
    /// Offset of a torn trailing frame, if the journal ends in one.
    pub torn_tail: Option<u64>,
}

impl JournalScan {
    /// Reads the whole journal.
    ///
    /// # Errors
    ///
    /// Fails on the first corrupt frame.
    pub fn read(backend: &dyn StorageBackend) -> SyncResult<Self> {
        let mut reader = JournalReader::new(backend)?;
        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame()? {
            frames.push(frame);
        }
        Ok(Self {
            frames,
            valid_len: reader.position(),
            torn_tail: reader.torn_tail(),
        })
    }
}

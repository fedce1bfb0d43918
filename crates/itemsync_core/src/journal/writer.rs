//! Journal appends.

use super::reader::{JournalReader, JournalScan};
use super::record::JournalRecord;
use crate::error::{SyncError, SyncResult};
use itemsync_storage::StorageBackend;

/// Position of a frame written by [`Journal::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendedFrame {
    /// Offset of the first byte.
    pub offset: u64,
    /// Frame length in bytes.
    pub len: u64,
}

/// The append side of the commit journal.
///
/// Not internally synchronized: the store keeps the journal behind its write
/// lock, so holding `&mut Journal` is holding the right to commit.
pub struct Journal {
    backend: Box<dyn StorageBackend>,
    sync_on_commit: bool,
}

impl Journal {
    /// Wraps a backend.
    pub fn new(backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> Self {
        Self {
            backend,
            sync_on_commit,
        }
    }

    /// Appends one record as a single frame and makes it durable.
    ///
    /// A failed append leaves the journal exactly as it was: whatever part of
    /// the frame reached the backend is truncated away before the error is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns the storage error that failed the append, or
    /// [`SyncError::Invariant`] if the partial frame could not be removed
    /// either (the journal then ends in a torn frame that the next open will
    /// discard).
    pub fn append(&mut self, record: &JournalRecord) -> SyncResult<AppendedFrame> {
        let frame = record.encode_frame()?;
        let before = self.backend.size()?;

        match self.write_frame(&frame) {
            Ok(offset) => Ok(AppendedFrame {
                offset,
                len: frame.len() as u64,
            }),
            Err(err) => {
                if let Err(rollback) = self.backend.truncate(before) {
                    tracing::error!(
                        offset = before,
                        error = %rollback,
                        "failed to remove partial journal frame"
                    );
                    return Err(SyncError::invariant(format!(
                        "append failed ({err}) and rollback to offset {before} failed ({rollback})"
                    )));
                }
                tracing::warn!(offset = before, error = %err, "journal append rolled back");
                Err(err)
            }
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> SyncResult<u64> {
        let offset = self.backend.append(frame)?;
        if self.sync_on_commit {
            self.backend.sync()?;
        } else {
            self.backend.flush()?;
        }
        Ok(offset)
    }

    /// Current journal length in bytes.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot report its size.
    pub fn size(&self) -> SyncResult<u64> {
        Ok(self.backend.size()?)
    }

    /// Cuts the journal back to `len` bytes.
    ///
    /// Used by recovery to drop a torn tail.
    ///
    /// # Errors
    ///
    /// Fails if `len` is past the end or the backend cannot truncate.
    pub fn truncate(&mut self, len: u64) -> SyncResult<()> {
        self.backend.truncate(len)?;
        Ok(())
    }

    /// Reads every complete frame.
    ///
    /// # Errors
    ///
    /// Fails on the first corrupt frame.
    pub fn scan(&self) -> SyncResult<JournalScan> {
        JournalScan::read(self.backend.as_ref())
    }

    /// A streaming reader from the start of the journal.
    ///
    /// # Errors
    ///
    /// Fails if the backend size cannot be read.
    pub fn reader(&self) -> SyncResult<JournalReader<'_>> {
        JournalReader::new(self.backend.as_ref())
    }

    /// Whether appends are fsynced.
    #[must_use]
    pub fn sync_on_commit(&self) -> bool {
        self.sync_on_commit
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("sync_on_commit", &self.sync_on_commit)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::record::InitRecord;
    use crate::types::{Timestamp, Version};
    use itemsync_storage::{InMemoryBackend, StorageError, StorageResult};
    use std::io;

    fn init() -> JournalRecord {
        JournalRecord::Init(InitRecord {
            latest_version: Version::ZERO,
            created_at: Timestamp::from_millis(1),
        })
    }

    #[test]
    fn appends_are_sequential() {
        let mut journal = Journal::new(Box::new(InMemoryBackend::new()), true);
        let first = journal.append(&init()).unwrap();
        let second = journal.append(&init()).unwrap();

        assert_eq!(first.offset, 0);
        assert_eq!(second.offset, first.len);
        assert_eq!(journal.size().unwrap(), first.len + second.len);
        assert_eq!(journal.scan().unwrap().frames.len(), 2);
    }

    /// Writes half of every frame, then fails on sync.
    struct HalfWriteBackend {
        inner: InMemoryBackend,
    }

    impl StorageBackend for HalfWriteBackend {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.inner.read_at(offset, len)
        }
        fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
            self.inner.append(&data[..data.len() / 2])
        }
        fn flush(&mut self) -> StorageResult<()> {
            Ok(())
        }
        fn sync(&mut self) -> StorageResult<()> {
            Err(io::Error::new(io::ErrorKind::Other, "disk went away").into())
        }
        fn size(&self) -> StorageResult<u64> {
            self.inner.size()
        }
        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            self.inner.truncate(new_size)
        }
    }

    #[test]
    fn failed_append_is_rolled_back() {
        let backend = HalfWriteBackend {
            inner: InMemoryBackend::new(),
        };
        let mut journal = Journal::new(Box::new(backend), true);

        let err = journal.append(&init()).unwrap_err();
        assert!(matches!(err, SyncError::Storage(StorageError::Io(_))));
        assert!(err.is_retryable());
        assert_eq!(journal.size().unwrap(), 0);
    }

    #[test]
    fn flush_only_mode() {
        let journal = Journal::new(Box::new(InMemoryBackend::new()), false);
        assert!(!journal.sync_on_commit());
    }
}

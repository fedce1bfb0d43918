//! The backend trait the journal writes through.

use crate::error::StorageResult;

/// An append-only byte store.
///
/// The journal is the only writer. It appends whole frames, reads them back
/// during recovery and cuts a torn or rolled-back tail with [`truncate`].
///
/// # Invariants
///
/// - `append` returns the offset the bytes were written at, which is the
///   size of the store before the call
/// - `read_at` returns exactly the bytes appended at that offset
/// - `truncate` only ever shrinks the store
///
/// [`truncate`]: StorageBackend::truncate
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::StorageError::ReadPastEnd`] when the range is not
    /// fully inside the store, or with an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it starts at.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. The store may then hold a partial
    /// tail, which the caller is expected to truncate away.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Makes all appended data and file metadata durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Current size in bytes; the offset of the next append.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Drops everything at or after `new_size`.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::StorageError::TruncatePastEnd`] if `new_size` is
    /// larger than the current size.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}

impl<B: StorageBackend + ?Sized> StorageBackend for Box<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        (**self).read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        (**self).append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        (**self).flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        (**self).sync()
    }

    fn size(&self) -> StorageResult<u64> {
        (**self).size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        (**self).truncate(new_size)
    }
}

//! Failure injection for the storage layer.
//!
//! [`FlakyBackend`] wraps an in-memory store and fails appends or syncs on
//! demand. Tests keep the matching [`FaultHandle`] to flip faults while the
//! store owns the backend, and to take a copy of the bytes that "reached
//! disk" for a crash-and-reopen check.

use itemsync_core::{StoreConfig, SyncStore};
use itemsync_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};
use parking_lot::Mutex;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// How an append misbehaves while its fault is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendFault {
    /// Writes nothing and fails.
    Reject,
    /// Writes the first half of the bytes, then fails.
    Tear,
}

#[derive(Debug, Default)]
struct Faults {
    reject_append: AtomicBool,
    tear_append: AtomicBool,
    fail_sync: AtomicBool,
    appends: AtomicUsize,
    injected: AtomicUsize,
}

/// Backend whose writes can be made to fail.
#[derive(Debug)]
pub struct FlakyBackend {
    inner: Arc<Mutex<InMemoryBackend>>,
    faults: Arc<Faults>,
}

/// Switches faults on a [`FlakyBackend`] owned by someone else.
#[derive(Debug, Clone)]
pub struct FaultHandle {
    inner: Arc<Mutex<InMemoryBackend>>,
    faults: Arc<Faults>,
}

impl FlakyBackend {
    /// Creates an empty backend and its fault handle.
    pub fn new() -> (Self, FaultHandle) {
        Self::with_bytes(Vec::new())
    }

    /// Creates a backend that already holds `bytes`.
    pub fn with_bytes(bytes: Vec<u8>) -> (Self, FaultHandle) {
        let inner = Arc::new(Mutex::new(InMemoryBackend::with_bytes(bytes)));
        let faults = Arc::new(Faults::default());
        let handle = FaultHandle {
            inner: Arc::clone(&inner),
            faults: Arc::clone(&faults),
        };
        (Self { inner, faults }, handle)
    }

    fn injected(&self, what: &str) -> StorageError {
        self.faults.injected.fetch_add(1, Ordering::SeqCst);
        StorageError::Io(io::Error::new(
            io::ErrorKind::Other,
            format!("injected {what} failure"),
        ))
    }
}

impl StorageBackend for FlakyBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.lock().read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.faults.appends.fetch_add(1, Ordering::SeqCst);
        if self.faults.reject_append.load(Ordering::SeqCst) {
            return Err(self.injected("append"));
        }
        if self.faults.tear_append.load(Ordering::SeqCst) {
            let half = data.len() / 2;
            if half > 0 {
                self.inner.lock().append(&data[..half])?;
            }
            return Err(self.injected("torn append"));
        }
        self.inner.lock().append(data)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.lock().flush()
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.faults.fail_sync.load(Ordering::SeqCst) {
            return Err(self.injected("sync"));
        }
        self.inner.lock().sync()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.lock().size()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.lock().truncate(new_size)
    }
}

impl FaultHandle {
    /// Arms or clears an append fault. `None` clears both kinds.
    pub fn set_append_fault(&self, fault: Option<AppendFault>) {
        self.faults
            .reject_append
            .store(fault == Some(AppendFault::Reject), Ordering::SeqCst);
        self.faults
            .tear_append
            .store(fault == Some(AppendFault::Tear), Ordering::SeqCst);
    }

    /// Makes every sync fail until cleared.
    pub fn set_fail_sync(&self, fail: bool) {
        self.faults.fail_sync.store(fail, Ordering::SeqCst);
    }

    /// Clears all faults.
    pub fn heal(&self) {
        self.set_append_fault(None);
        self.set_fail_sync(false);
    }

    /// Append calls seen so far, failed ones included.
    pub fn appends(&self) -> usize {
        self.faults.appends.load(Ordering::SeqCst)
    }

    /// Failures injected so far.
    pub fn injected(&self) -> usize {
        self.faults.injected.load(Ordering::SeqCst)
    }

    /// Copy of the bytes currently stored.
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().snapshot()
    }
}

/// Opens a store on a fresh [`FlakyBackend`] with fsync on every commit.
pub fn flaky_store() -> (SyncStore, FaultHandle) {
    let (backend, handle) = FlakyBackend::new();
    let store = SyncStore::with_backend(Box::new(backend), StoreConfig::default())
        .expect("Failed to open flaky store");
    (store, handle)
}

/// Opens a plain in-memory store over bytes captured with
/// [`FaultHandle::snapshot`], as if the process had crashed.
pub fn reopen_snapshot(bytes: Vec<u8>) -> SyncStore {
    SyncStore::with_backend(
        Box::new(InMemoryBackend::with_bytes(bytes)),
        StoreConfig::default(),
    )
    .expect("Failed to reopen snapshot")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_toggle() {
        let (mut backend, handle) = FlakyBackend::new();
        backend.append(b"ok").unwrap();

        handle.set_append_fault(Some(AppendFault::Tear));
        assert!(backend.append(b"torn").is_err());
        assert_eq!(handle.snapshot(), b"okto");

        handle.set_append_fault(Some(AppendFault::Reject));
        assert!(backend.append(b"never").is_err());
        assert_eq!(backend.size().unwrap(), 4);

        handle.set_fail_sync(true);
        assert!(backend.sync().is_err());

        handle.heal();
        backend.sync().unwrap();
        assert_eq!(handle.appends(), 3);
        assert_eq!(handle.injected(), 3);
    }
}

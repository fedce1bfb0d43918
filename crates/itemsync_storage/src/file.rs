//! File-backed storage.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A backend that appends to one file on disk.
///
/// `flush` hands data to the OS; `sync` calls `File::sync_all` so that a
/// commit survives power loss. The journal decides which one a commit needs
/// (see `StoreConfig::sync_on_commit`).
///
/// ```no_run
/// use itemsync_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("store/journal.isj")).unwrap();
/// backend.append(b"frame").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    inner: Mutex<FileState>,
}

#[derive(Debug)]
struct FileState {
    file: File,
    size: u64,
}

impl FileBackend {
    /// Opens `path` for appending, creating the file and any missing parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories or the file cannot be created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(FileState { file, size }),
        })
    }

    /// Opens an existing file without creating anything.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be opened.
    pub fn open_existing(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(FileState { file, size }),
        })
    }

    /// Path of the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        let size = inner.size;
        if offset.saturating_add(len as u64) > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        let mut buffer = vec![0u8; len];
        if len > 0 {
            inner.file.seek(SeekFrom::Start(offset))?;
            inner.file.read_exact(&mut buffer)?;
        }
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let inner = self.inner.get_mut();
        let offset = inner.size;
        if data.is_empty() {
            return Ok(offset);
        }

        inner.file.seek(SeekFrom::End(0))?;
        inner.file.write_all(data)?;
        inner.size += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.get_mut().file.flush()?;
        Ok(())
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.get_mut().file.sync_all()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().size)
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let inner = self.inner.get_mut();
        if new_size > inner.size {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size: inner.size,
            });
        }

        inner.file.set_len(new_size)?;
        inner.file.sync_all()?;
        inner.size = new_size;
        Ok(())
    }
}

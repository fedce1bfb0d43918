//! # itemsync storage
//!
//! Byte-level storage for the itemsync commit journal.
//!
//! Backends are append-only byte stores. They never look inside what they
//! hold: framing, checksums and record decoding all live in
//! `itemsync_core::journal`.
//!
//! - [`InMemoryBackend`] keeps everything in a `Vec<u8>` (tests, ephemeral stores)
//! - [`FileBackend`] appends to a single file and survives restarts
//!
//! ```rust
//! use itemsync_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"frame").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"frame");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;

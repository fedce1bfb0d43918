//! # itemsync Testkit
//!
//! Test utilities for itemsync.
//!
//! This crate provides:
//! - Store fixtures that clean up after themselves
//! - A storage backend with switchable faults
//! - Property-based test generators using proptest
//! - Concurrency helpers for racing clients against one store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use itemsync_testkit::prelude::*;
//!
//! #[test]
//! fn creates_a_note() {
//!     let store = TestStore::memory();
//!     let outcome = store.create(&ctx("alice"), note("n1", "hello")).unwrap();
//!     assert!(matches!(outcome, CreateOutcome::Created(_)));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod flaky;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::flaky::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use flaky::*;
pub use generators::*;
pub use stress::*;

//! # itemsync server
//!
//! The request boundary of the itemsync backend.
//!
//! This crate provides:
//! - Caller context validation (owner, idempotency token)
//! - CBOR wire messages with HTTP-style status codes
//! - A synchronous request handler over [`itemsync_core::SyncStore`]
//! - An async scheduler running each request on its own blocking worker
//!
//! Transport (HTTP routing, TLS) and authentication live outside this crate:
//! the transport decodes the authenticated owner, wraps it in a
//! [`RequestEnvelope`] and calls [`SyncServer::handle`] or
//! [`SyncServer::handle_bytes`].
//!
//! # Status codes
//!
//! | Response | Status |
//! |----------|--------|
//! | `Item`, `Items`, `Changes` | 200 |
//! | `NotFound` | 404 |
//! | `Conflict`, `AlreadyExists` | 409 |
//! | invalid request, reused mutation id | 400 |
//! | missing owner | 401 |
//! | transient failure (retry with the same mutation id) | 503 |
//! | internal failure | 500 |

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod config;
mod context;
mod error;
mod handler;
mod messages;
mod server;

pub use config::ServerConfig;
pub use context::RequestContext;
pub use error::{ServerError, ServerResult};
pub use handler::RequestHandler;
pub use messages::{CborDecode, CborEncode, ErrorCode, RequestEnvelope, SyncRequest, SyncResponse};
pub use server::SyncServer;

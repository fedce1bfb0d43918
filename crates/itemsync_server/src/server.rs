//! Async request scheduler.

use crate::config::ServerConfig;
use crate::context::RequestContext;
use crate::error::{ServerError, ServerResult};
use crate::handler::RequestHandler;
use crate::messages::{CborDecode, CborEncode, ErrorCode, RequestEnvelope, SyncResponse};
use itemsync_core::SyncStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// The sync server.
///
/// Each request runs on its own blocking worker (`spawn_blocking`), because
/// mutations block on the store's write lock and on journal I/O. A semaphore
/// bounds how many run at once. The request deadline is handed to the core,
/// so a mutation that runs out of time rolls back inside its transaction
/// instead of being abandoned mid-commit.
///
/// # Example
///
/// ```
/// use itemsync_core::SyncStore;
/// use itemsync_server::{RequestEnvelope, ServerConfig, SyncRequest, SyncServer};
/// use std::sync::Arc;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let store = Arc::new(SyncStore::open_in_memory().unwrap());
/// let server = SyncServer::new(store, ServerConfig::default());
///
/// let response = server
///     .handle(RequestEnvelope {
///         owner_id: Some("alice".into()),
///         mutation_id: None,
///         request: SyncRequest::List,
///     })
///     .await;
/// assert_eq!(response.status_code(), 200);
/// # });
/// ```
#[derive(Debug)]
pub struct SyncServer {
    handler: RequestHandler,
    permits: Arc<Semaphore>,
    config: ServerConfig,
}

impl SyncServer {
    /// Creates a server over `store`.
    pub fn new(store: Arc<SyncStore>, config: ServerConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_requests.max(1)));
        let handler = RequestHandler::new(store, config.clone());
        Self {
            handler,
            permits,
            config,
        }
    }

    /// Handles one decoded request.
    pub async fn handle(&self, envelope: RequestEnvelope) -> SyncResponse {
        let op = envelope.request.name();
        match self.schedule(envelope).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(op, error = %err, "request not scheduled");
                SyncResponse::error(&err)
            }
        }
    }

    /// Handles one CBOR-encoded request and returns the CBOR-encoded response.
    pub async fn handle_bytes(&self, bytes: &[u8]) -> Vec<u8> {
        let response = match RequestEnvelope::decode_cbor(bytes) {
            Ok(envelope) => self.handle(envelope).await,
            Err(err) => {
                tracing::debug!(error = %err, len = bytes.len(), "undecodable request");
                SyncResponse::error(&err)
            }
        };

        match response.encode_cbor() {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::error!(error = %err, "failed to encode response");
                let fallback = SyncResponse::Error {
                    code: ErrorCode::Internal,
                    message: "response encoding failed".into(),
                    retryable: false,
                };
                fallback.encode_cbor().unwrap_or_default()
            }
        }
    }

    async fn schedule(&self, envelope: RequestEnvelope) -> ServerResult<SyncResponse> {
        let deadline = Instant::now() + self.config.request_timeout;

        let permit = tokio::time::timeout_at(
            tokio::time::Instant::from_std(deadline),
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        .map_err(|_| ServerError::Overloaded)?
        .map_err(|_| ServerError::Worker("request scheduler closed".into()))?;

        let ctx = RequestContext {
            owner_id: envelope.owner_id,
            mutation_id: envelope.mutation_id,
            deadline: Some(deadline),
        };
        let handler = self.handler.clone();
        let request = envelope.request;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            handler.handle(&ctx, request)
        })
        .await
        .map_err(|err| ServerError::Worker(err.to_string()))
    }

    /// Request slots currently free.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// The synchronous handler, for transports that schedule work themselves.
    #[must_use]
    pub fn handler(&self) -> &RequestHandler {
        &self.handler
    }

    /// The server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::SyncRequest;
    use itemsync_core::{CreateItem, Version};
    use std::time::Duration;

    fn envelope(token: Option<&str>, request: SyncRequest) -> RequestEnvelope {
        RequestEnvelope {
            owner_id: Some("alice".into()),
            mutation_id: token.map(str::to_string),
            request,
        }
    }

    fn create(id: &str) -> SyncRequest {
        SyncRequest::Create(CreateItem {
            id: id.into(),
            kind: "note".into(),
            title: "t".into(),
            content: String::new(),
        })
    }

    #[tokio::test]
    async fn handles_requests_on_workers() {
        let store = Arc::new(SyncStore::open_in_memory().unwrap());
        let server = SyncServer::new(Arc::clone(&store), ServerConfig::default());

        let token = uuid::Uuid::new_v4().to_string();
        let response = server.handle(envelope(Some(&token), create("a"))).await;
        assert!(response.is_success());
        assert_eq!(store.latest_version(), Version::new(1));
        assert_eq!(server.available_permits(), 64);
    }

    #[tokio::test]
    async fn bytes_in_bytes_out() {
        let server = SyncServer::new(
            Arc::new(SyncStore::open_in_memory().unwrap()),
            ServerConfig::default().with_uuid_mutation_ids(false),
        );

        let request = envelope(Some("m1"), create("a")).encode_cbor().unwrap();
        let response = SyncResponse::decode_cbor(&server.handle_bytes(&request).await).unwrap();
        assert_eq!(response.status_code(), 200);

        let garbage = SyncResponse::decode_cbor(&server.handle_bytes(b"\xff\xfe").await).unwrap();
        assert_eq!(garbage.status_code(), 400);
    }

    #[tokio::test]
    async fn timed_out_mutation_rolls_back() {
        let store = Arc::new(SyncStore::open_in_memory().unwrap());
        let config = ServerConfig::new()
            .with_request_timeout(Duration::from_millis(50))
            .with_uuid_mutation_ids(false);
        let server = SyncServer::new(Arc::clone(&store), config);

        // Another writer holds the lock for longer than the request may wait.
        let busy = store.begin_write(None).unwrap();
        let response = server.handle(envelope(Some("m1"), create("a"))).await;
        drop(busy);

        assert!(matches!(
            response,
            SyncResponse::Error {
                code: ErrorCode::Unavailable,
                retryable: true,
                ..
            }
        ));
        assert_eq!(store.latest_version(), Version::ZERO);

        // Resending the identical request succeeds once the lock is free.
        let retry = server.handle(envelope(Some("m1"), create("a"))).await;
        assert!(retry.is_success());
    }
}

//! Maps requests onto the sync core.

use crate::config::ServerConfig;
use crate::context::RequestContext;
use crate::error::{ServerError, ServerResult};
use crate::messages::{SyncRequest, SyncResponse};
use itemsync_core::{
    CreateOutcome, DeleteOutcome, MutationContext, Replay, SyncStore, UpdateOutcome,
};
use std::sync::Arc;

/// Synchronous request handler.
///
/// Never fails: every error is folded into [`SyncResponse::Error`], so the
/// transport always has something to send back.
#[derive(Debug, Clone)]
pub struct RequestHandler {
    store: Arc<SyncStore>,
    config: ServerConfig,
}

impl RequestHandler {
    /// Creates a handler over `store`.
    pub fn new(store: Arc<SyncStore>, config: ServerConfig) -> Self {
        Self { store, config }
    }

    /// Handles one request.
    pub fn handle(&self, ctx: &RequestContext, request: SyncRequest) -> SyncResponse {
        let op = request.name();
        match self.dispatch(ctx, request) {
            Ok(response) => {
                tracing::debug!(op, status = response.status_code(), "request handled");
                response
            }
            Err(err) => {
                if err.is_client_error() {
                    tracing::debug!(op, error = %err, "request rejected");
                } else {
                    tracing::warn!(op, error = %err, retryable = err.is_retryable(), "request failed");
                }
                SyncResponse::error(&err)
            }
        }
    }

    fn dispatch(&self, ctx: &RequestContext, request: SyncRequest) -> ServerResult<SyncResponse> {
        if request.is_mutation() {
            let mutation = ctx.mutation(&self.config)?;
            self.mutate(&mutation, request)
        } else {
            self.read(ctx, request)
        }
    }

    fn mutate(
        &self,
        mutation: &MutationContext,
        request: SyncRequest,
    ) -> ServerResult<SyncResponse> {
        match request {
            SyncRequest::Create(create) => Ok(match self.store.create(mutation, create)? {
                CreateOutcome::Created(item) => SyncResponse::item(item),
                CreateOutcome::Replayed(replay) => replayed(replay),
                CreateOutcome::AlreadyExists(server_item) => {
                    SyncResponse::AlreadyExists { server_item }
                }
            }),
            SyncRequest::Update(update) => Ok(match self.store.update(mutation, update)? {
                UpdateOutcome::Updated(item) => SyncResponse::item(item),
                UpdateOutcome::Replayed(replay) => replayed(replay),
                UpdateOutcome::Conflict(server_item) => SyncResponse::Conflict { server_item },
                UpdateOutcome::NotFound => SyncResponse::NotFound,
            }),
            SyncRequest::Delete(delete) => Ok(match self.store.delete(mutation, delete)? {
                DeleteOutcome::Deleted(item) => SyncResponse::item(item),
                DeleteOutcome::Replayed(replay) => replayed(replay),
                DeleteOutcome::Conflict(server_item) => SyncResponse::Conflict { server_item },
                DeleteOutcome::NotFound => SyncResponse::NotFound,
            }),
            read => Err(ServerError::InvalidRequest(format!(
                "{} does not change state",
                read.name()
            ))),
        }
    }

    fn read(&self, ctx: &RequestContext, request: SyncRequest) -> ServerResult<SyncResponse> {
        let owner = ctx.owner()?;
        match request {
            SyncRequest::Get { id } => {
                if id.is_empty() {
                    return Err(ServerError::InvalidRequest("item id must not be empty".into()));
                }
                Ok(match self.store.get(owner, &id)? {
                    Some(item) => SyncResponse::item(item),
                    None => SyncResponse::NotFound,
                })
            }
            SyncRequest::List => Ok(SyncResponse::Items {
                items: self.store.list(owner)?,
            }),
            SyncRequest::Changes { since_version } => {
                let changes = self.store.changes(owner, since_version)?;
                Ok(SyncResponse::Changes {
                    latest_version: changes.latest_version,
                    items: changes.items,
                })
            }
            mutation => Err(ServerError::InvalidRequest(format!(
                "{} needs a mutation id",
                mutation.name()
            ))),
        }
    }

    /// The store behind this handler.
    #[must_use]
    pub fn store(&self) -> &Arc<SyncStore> {
        &self.store
    }

    /// The handler's configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

fn replayed(replay: Replay) -> SyncResponse {
    SyncResponse::Item {
        item: replay.item,
        replayed: true,
        applied_version: replay.applied_version,
    }
}

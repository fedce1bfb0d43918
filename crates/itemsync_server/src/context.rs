//! Per-request caller context.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use itemsync_core::{MutationContext, MutationId};
use std::time::Instant;
use uuid::Uuid;

/// What the transport and authentication layer hand over with a request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authenticated owner, if any.
    pub owner_id: Option<String>,
    /// Client idempotency token, required for mutations.
    pub mutation_id: Option<String>,
    /// Deadline after which a mutation rolls back.
    pub deadline: Option<Instant>,
}

impl RequestContext {
    /// Context for an authenticated owner.
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Self::default()
        }
    }

    /// Context without an owner; every request made with it is refused.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Attaches an idempotency token.
    #[must_use]
    pub fn with_mutation_id(mut self, mutation_id: impl Into<String>) -> Self {
        self.mutation_id = Some(mutation_id.into());
        self
    }

    /// Attaches a deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The authenticated owner.
    ///
    /// # Errors
    ///
    /// [`ServerError::Unauthorized`] when the owner is missing or blank.
    pub fn owner(&self) -> ServerResult<&str> {
        match self.owner_id.as_deref() {
            Some(owner) if !owner.trim().is_empty() => Ok(owner),
            _ => Err(ServerError::Unauthorized("missing owner".into())),
        }
    }

    /// Builds the core context for a mutating request.
    ///
    /// # Errors
    ///
    /// - [`ServerError::Unauthorized`] without an owner
    /// - [`ServerError::InvalidRequest`] without a mutation id, or with a
    ///   non-UUID one when the configuration requires UUIDs
    pub fn mutation(&self, config: &ServerConfig) -> ServerResult<MutationContext> {
        let owner = self.owner()?;
        let token = match self.mutation_id.as_deref() {
            Some(token) if !token.trim().is_empty() => token,
            _ => {
                return Err(ServerError::InvalidRequest(
                    "mutating requests need a mutation id".into(),
                ))
            }
        };
        if config.require_uuid_mutation_ids && Uuid::parse_str(token).is_err() {
            return Err(ServerError::InvalidRequest(format!(
                "mutation id {token:?} is not a UUID"
            )));
        }

        let mut ctx = MutationContext::new(owner, MutationId::new(token));
        ctx.deadline = self.deadline;
        Ok(ctx)
    }
}

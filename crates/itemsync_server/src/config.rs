//! Server configuration.

use std::time::Duration;

/// Configuration for the request boundary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Requests allowed to run at once. Further requests wait for a slot.
    pub max_concurrent_requests: usize,
    /// Time a request may take, queueing included. Mutations still running
    /// when it expires roll back.
    pub request_timeout: Duration,
    /// Reject mutation ids that are not UUIDs. On by default; clients are
    /// expected to generate a fresh UUID per logical mutation.
    pub require_uuid_mutation_ids: bool,
}

impl ServerConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self {
            max_concurrent_requests: 64,
            request_timeout: Duration::from_secs(30),
            require_uuid_mutation_ids: true,
        }
    }

    /// Sets the concurrency limit. Zero is treated as one.
    pub fn with_max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = max.max(1);
        self
    }

    /// Sets the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets whether mutation ids must be UUIDs.
    pub fn with_uuid_mutation_ids(mut self, required: bool) -> Self {
        self.require_uuid_mutation_ids = required;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}

//! Seams between the HTTP layer and whoever owns the session.

use client_storage::{StorageKeys, TokenStorage};
use std::sync::Arc;
use tracing::warn;

/// Supplies the bearer credential for outgoing requests.
///
/// Consulted once per request, at send time, so a credential written or
/// removed between two calls is picked up without touching the client.
pub trait CredentialProvider: Send + Sync {
    /// Returns the bearer token, if one is available.
    fn bearer_token(&self) -> Option<String>;
}

/// Reads the bearer token from persistent storage.
#[derive(Clone)]
pub struct StoredTokenProvider {
    storage: Arc<dyn TokenStorage>,
}

impl StoredTokenProvider {
    pub fn new(storage: Arc<dyn TokenStorage>) -> Self {
        Self { storage }
    }
}

impl CredentialProvider for StoredTokenProvider {
    fn bearer_token(&self) -> Option<String> {
        match self.storage.get(StorageKeys::TOKEN) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }
}

/// Reacts to an HTTP 401 from any call.
///
/// Invoked synchronously from the response path, before the response is
/// handed back to the call site.
pub trait UnauthorizedHandler: Send + Sync {
    fn on_unauthorized(&self);
}

/// Handler that ignores unauthorized responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopUnauthorizedHandler;

impl UnauthorizedHandler for NoopUnauthorizedHandler {
    fn on_unauthorized(&self) {}
}

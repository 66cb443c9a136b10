//! Authentication multiplexer.

use std::sync::Arc;

use crate::registry::Registry;
use muxd_auth::{AuthProvider, Credentials, Identity};
use muxd_common::{ProviderId, Result};

/// Selects an authentication scheme by id and delegates to it.
///
/// The mux holds no credential logic: the chosen provider's identity or
/// error is returned exactly as the provider produced it.
#[derive(Debug)]
pub struct AuthMux {
    registry: Registry<dyn AuthProvider>,
}

impl AuthMux {
    pub fn new() -> Self {
        Self {
            registry: Registry::new("auth"),
        }
    }

    /// Register a provider under its own id.
    ///
    /// # Errors
    /// - `DuplicateProvider` if the id is taken
    pub fn register_auth_provider(&mut self, provider: Arc<dyn AuthProvider>) -> Result<()> {
        let id = provider.id().clone();
        self.registry.register(id, provider)
    }

    /// Authenticate with the scheme registered as `scheme_id`.
    ///
    /// # Errors
    /// - `ProviderNotFound` if no such scheme is registered
    /// - Whatever the provider returns, unchanged
    pub async fn authenticate(&self, scheme_id: &str, credentials: &Credentials) -> Result<Identity> {
        let provider = self.registry.get(scheme_id)?;
        tracing::debug!(scheme = scheme_id, user = %credentials.username, "authenticating");
        provider.authenticate(credentials).await
    }

    /// Registered scheme ids, in no particular order.
    pub fn schemes(&self) -> impl Iterator<Item = &ProviderId> + '_ {
        self.registry.list()
    }
}

impl Default for AuthMux {
    fn default() -> Self {
        Self::new()
    }
}

//! Named provider registry shared by every multiplexer.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use muxd_common::{Error, ProviderId, Result};

/// Registry of provider instances keyed by [`ProviderId`].
///
/// `P` is the capability the registry holds (usually a trait object such
/// as `dyn AuthProvider`). The `kind` label only feeds error messages.
/// A registry is filled during bootstrap and then only read.
pub struct Registry<P: ?Sized> {
    kind: &'static str,
    providers: HashMap<ProviderId, Arc<P>>,
}

impl<P: ?Sized> Registry<P> {
    /// Create a new empty registry.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            providers: HashMap::new(),
        }
    }

    /// Register a provider.
    ///
    /// # Postconditions
    /// - On success the provider can be resolved by `id`
    /// - On failure the existing registration is left untouched
    ///
    /// # Errors
    /// - `DuplicateProvider` if `id` is already registered
    pub fn register(&mut self, id: ProviderId, provider: Arc<P>) -> Result<()> {
        match self.providers.entry(id) {
            Entry::Occupied(existing) => Err(Error::DuplicateProvider {
                kind: self.kind,
                id: existing.key().to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(provider);
                Ok(())
            }
        }
    }

    /// Resolve a provider by id.
    ///
    /// # Errors
    /// - `ProviderNotFound` if nothing is registered under `id`
    pub fn get(&self, id: &str) -> Result<Arc<P>> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| Error::ProviderNotFound {
                kind: self.kind,
                id: id.to_string(),
            })
    }

    /// Iterate over the registered ids, in no particular order.
    ///
    /// Each call starts a fresh pass over the registry.
    pub fn list(&self) -> impl Iterator<Item = &ProviderId> + '_ {
        self.providers.keys()
    }

    /// Check if a provider is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.providers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<P: ?Sized> fmt::Debug for Registry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&str> = self.providers.keys().map(ProviderId::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("providers", &ids)
            .finish()
    }
}

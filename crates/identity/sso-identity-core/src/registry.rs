//! Provider registry.

use std::collections::HashMap;
use std::sync::Arc;

/// A configured identity source.
pub trait Provider: Send + Sync {
    /// Unique id of the provider in this deployment.
    fn id(&self) -> &str;

    /// Human-readable name, used in messages shown to users.
    fn name(&self) -> &str;
}

/// Immutable map of configured providers, built at application startup
/// and passed explicitly to whatever needs lookups.
pub struct ProviderRegistry<P: Provider> {
    providers: HashMap<String, Arc<P>>,
}

impl<P: Provider> ProviderRegistry<P> {
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
        }
    }

    pub fn register(&mut self, provider: P) {
        self.providers
            .insert(provider.id().to_string(), Arc::new(provider));
    }

    pub fn by_id(&self, id: &str) -> Option<Arc<P>> {
        self.providers.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

impl<P: Provider> Default for ProviderRegistry<P> {
    fn default() -> Self {
        Self::new()
    }
}

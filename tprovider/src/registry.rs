//! Provider registry: the deployment's fleet of providers.
//!
//! ```rust
//! use tprovider::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! assert!(registry.is_empty());
//! assert!(registry.descriptors().is_empty());
//! ```

use std::sync::Arc;

use tcommon::Registry;

use crate::{ModelProvider, ProviderDescriptor, ProviderId};

#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: Registry<ProviderId, Arc<dyn ModelProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<P>(&mut self, provider: P)
    where
        P: ModelProvider + 'static,
    {
        self.register_arc(Arc::new(provider));
    }

    pub fn register_arc(&mut self, provider: Arc<dyn ModelProvider>) {
        self.providers.insert(provider.id(), provider);
    }

    pub fn get(&self, provider_id: ProviderId) -> Option<Arc<dyn ModelProvider>> {
        self.providers.get(&provider_id).cloned()
    }

    pub fn contains(&self, provider_id: ProviderId) -> bool {
        self.providers.contains_key(&provider_id)
    }

    pub fn ids(&self) -> Vec<ProviderId> {
        let mut ids: Vec<_> = self.providers.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Descriptors of every registered provider, ordered by id.
    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        let mut descriptors: Vec<_> = self
            .providers
            .values()
            .map(|provider| provider.descriptor().clone())
            .collect();
        descriptors.sort_by_key(|descriptor| descriptor.id);
        descriptors
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

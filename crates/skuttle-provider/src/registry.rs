//! Provider registry
//!
//! Maps an infra reference prefix to the provider responsible for it. The
//! registry is assembled once at startup through [`RegistryBuilder`]; the
//! built [`ProviderRegistry`] has no write path, so it can be shared between
//! reconcile tasks behind an `Arc` without locking.

use crate::error::{ProviderError, Result};
use crate::provider::InstanceProvider;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable prefix → provider map
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn InstanceProvider>>,
}

impl ProviderRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Look up the provider registered for `prefix`
    pub fn get(&self, prefix: &str) -> Result<Arc<dyn InstanceProvider>> {
        self.providers
            .get(prefix)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownProvider(prefix.to_string()))
    }

    /// Registered prefixes, sorted
    pub fn prefixes(&self) -> Vec<&str> {
        let mut prefixes: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        prefixes.sort_unstable();
        prefixes
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("prefixes", &self.prefixes())
            .finish()
    }
}

/// Construction phase of a [`ProviderRegistry`]
#[derive(Default)]
pub struct RegistryBuilder {
    providers: HashMap<String, Arc<dyn InstanceProvider>>,
}

impl RegistryBuilder {
    /// Register `provider` for `prefix`; each prefix may be registered once
    pub fn register(
        mut self,
        prefix: impl Into<String>,
        provider: Arc<dyn InstanceProvider>,
    ) -> Result<Self> {
        let prefix = prefix.into();
        if self.providers.contains_key(&prefix) {
            return Err(ProviderError::DuplicatePrefix(prefix));
        }
        tracing::debug!("registering provider {} for prefix {}", provider.name(), prefix);
        self.providers.insert(prefix, provider);
        Ok(self)
    }

    pub fn build(self) -> ProviderRegistry {
        ProviderRegistry {
            providers: self.providers,
        }
    }
}

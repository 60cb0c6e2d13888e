//! Static list provider
//!
//! Answers instance liveness from a newline-delimited list of instance IDs
//! loaded once at startup. Useful for bare-metal clusters and for exercising
//! the controller without cloud credentials.

use crate::error::{ProviderError, Result};
use crate::provider::{InstanceProvider, SCHEME_DELIMITER};
use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;

/// Provider backed by an immutable set of known-live instance IDs
#[derive(Debug, Clone)]
pub struct StaticListProvider {
    prefix: String,
    scheme: String,
    instances: HashSet<String>,
}

impl StaticListProvider {
    /// Build a provider from an in-memory list of IDs
    pub fn from_ids<I, S>(prefix: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prefix = prefix.into();
        Self {
            scheme: format!("{}{}", prefix, SCHEME_DELIMITER),
            prefix,
            instances: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Load the list from `path`
    ///
    /// One ID per line; surrounding whitespace is trimmed, and blank lines
    /// and `#` comments are skipped.
    pub async fn load(prefix: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ProviderError::ListLoad {
                path: path.display().to_string(),
                source,
            })?;

        let provider = Self::from_ids(prefix, parse_list(&content));
        tracing::info!(
            "loaded {} instance IDs from {}",
            provider.instances.len(),
            path.display()
        );
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

fn parse_list(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

#[async_trait]
impl InstanceProvider for StaticListProvider {
    fn name(&self) -> &str {
        &self.prefix
    }

    async fn instance_exists(&self, infra_reference: &str) -> Result<bool> {
        let id = infra_reference
            .strip_prefix(self.scheme.as_str())
            .unwrap_or(infra_reference);
        Ok(self.instances.contains(id))
    }
}

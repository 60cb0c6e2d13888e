//! Instance provider trait definition

use crate::error::{ProviderError, Result};
use async_trait::async_trait;

/// Separates the provider prefix from the opaque instance ID in a node's
/// `spec.providerID`.
pub const SCHEME_DELIMITER: &str = "://";

/// Infrastructure instance provider
///
/// Every substrate skuttle can cross-check (AWS EC2, a static list, ...)
/// implements this trait. Implementations must not mutate infrastructure
/// state: `instance_exists` is a read-only query and may be called
/// concurrently from many reconcile tasks.
#[async_trait]
pub trait InstanceProvider: Send + Sync {
    /// Returns the provider name used in logs (e.g. "aws", "file")
    fn name(&self) -> &str;

    /// Check whether the instance behind `infra_reference` still exists
    ///
    /// `infra_reference` is the full `<prefix>://<opaque-id>` string. An
    /// instance the substrate reports as gone is `Ok(false)`, not an error.
    async fn instance_exists(&self, infra_reference: &str) -> Result<bool>;
}

/// Parsed `<prefix>://<opaque-id>` reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfraReference<'a> {
    prefix: &'a str,
    opaque_id: &'a str,
}

impl<'a> InfraReference<'a> {
    pub fn parse(reference: &'a str) -> Result<Self> {
        let (prefix, opaque_id) = reference.split_once(SCHEME_DELIMITER).ok_or_else(|| {
            ProviderError::invalid_reference(reference, "missing scheme delimiter")
        })?;

        if prefix.is_empty() {
            return Err(ProviderError::invalid_reference(reference, "empty prefix"));
        }

        Ok(Self { prefix, opaque_id })
    }

    /// Provider prefix (e.g. "aws")
    pub fn prefix(&self) -> &'a str {
        self.prefix
    }

    /// Everything after the scheme delimiter
    pub fn opaque_id(&self) -> &'a str {
        self.opaque_id
    }

    /// Final `/`-delimited segment of the opaque ID
    pub fn last_segment(&self) -> &'a str {
        self.opaque_id.rsplit('/').next().unwrap_or(self.opaque_id)
    }
}

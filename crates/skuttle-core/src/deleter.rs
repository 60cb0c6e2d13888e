//! Node deletion capability

use async_trait::async_trait;
use thiserror::Error;

/// Error returned by a [`NodeDeleter`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DeleteError {
    pub message: String,
}

impl DeleteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Removes node objects from the cluster
///
/// Implementations must treat a node that is already gone as success, so
/// that duplicate or late decisions for the same node stay harmless.
#[async_trait]
pub trait NodeDeleter: Send + Sync {
    async fn delete(&self, name: &str) -> Result<(), DeleteError>;
}

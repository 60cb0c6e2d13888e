//! Error types for node decoding, reconciliation and startup configuration

use crate::deleter::DeleteError;
use skuttle_provider::ProviderError;
use thiserror::Error;

/// Errors decoding a raw node object into a [`crate::NodeView`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    #[error("node object has no name")]
    MissingName,

    #[error("node {node} missing Ready condition")]
    MissingReadyCondition { node: String },

    #[error("node {node} has invalid Ready condition status {status:?}")]
    InvalidConditionStatus { node: String, status: String },
}

/// Per-node reconciliation errors
///
/// None of these are fatal: the node is left alone and the next delivered
/// event re-evaluates it.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("node {node} missing Ready condition")]
    MissingReadyCondition { node: String },

    #[error("node {node}: {source}")]
    InvalidInfraReference {
        node: String,
        #[source]
        source: ProviderError,
    },

    #[error("node {node}: no provider for prefix {prefix}")]
    UnknownProvider { node: String, prefix: String },

    #[error("node {node}: {source}")]
    ProviderQuery {
        node: String,
        #[source]
        source: ProviderError,
    },

    #[error("failed to delete node {node}: {source}")]
    Deletion {
        node: String,
        #[source]
        source: DeleteError,
    },

    #[error("node {node}: reconcile cancelled by shutdown")]
    Cancelled { node: String },
}

impl ReconcileError {
    /// Short label used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingReadyCondition { .. } => "missing_ready_condition",
            Self::InvalidInfraReference { .. } => "invalid_infra_reference",
            Self::UnknownProvider { .. } => "unknown_provider",
            Self::ProviderQuery { .. } => "provider_query",
            Self::Deletion { .. } => "deletion",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    pub(crate) fn from_provider(node: &str, err: ProviderError) -> Self {
        let node = node.to_string();
        match err {
            ProviderError::UnknownProvider(prefix) => Self::UnknownProvider { node, prefix },
            source @ ProviderError::InvalidInfraReference { .. } => {
                Self::InvalidInfraReference { node, source }
            }
            source => Self::ProviderQuery { node, source },
        }
    }
}

/// Startup configuration errors; these stop the process
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid duration {value:?}: {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },

    #[error("no providers specified")]
    NoProviders,

    #[error("provider {0} listed more than once")]
    DuplicateProvider(String),

    #[error("no provider available for {0}")]
    UnknownProvider(String),
}

pub type Result<T> = std::result::Result<T, ReconcileError>;

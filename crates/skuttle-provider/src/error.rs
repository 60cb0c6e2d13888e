//! Provider error types

use thiserror::Error;

/// Provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("no provider for prefix {0}")]
    UnknownProvider(String),

    #[error("provider already registered for prefix {0}")]
    DuplicatePrefix(String),

    #[error("invalid infra reference {reference:?}: {reason}")]
    InvalidInfraReference { reference: String, reason: String },

    #[error("provider {provider} query failed: {message}")]
    Query {
        provider: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("failed to load instance list {path}: {source}")]
    ListLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("missing provider configuration: {0}")]
    MissingConfig(String),
}

impl ProviderError {
    pub fn query(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            provider: provider.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Query failure wrapping the provider's own error; the message is its
    /// display text
    pub fn query_source<E>(provider: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Query {
            provider: provider.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_reference(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInfraReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

//! Provider construction from command-line configuration

use anyhow::{Context, Result, bail};
use skuttle_provider::{InstanceProvider, ProviderError, ProviderRegistry, StaticListProvider};
use std::path::PathBuf;
use std::sync::Arc;

pub const FILE: &str = "file";
#[cfg(feature = "aws")]
pub const AWS: &str = "aws";

/// Prefixes this build knows how to construct
pub fn available() -> &'static [&'static str] {
    #[cfg(feature = "aws")]
    {
        &[AWS, FILE]
    }
    #[cfg(not(feature = "aws"))]
    {
        &[FILE]
    }
}

/// Provider-specific inputs
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    /// Instance list for the `file` provider
    pub node_list: Option<PathBuf>,
}

/// Construct every listed provider; any failure aborts startup
pub async fn build_registry(
    prefixes: &[String],
    options: &ProviderOptions,
) -> Result<ProviderRegistry> {
    let mut builder = ProviderRegistry::builder();

    for prefix in prefixes {
        let provider = build_provider(prefix, options)
            .await
            .with_context(|| format!("error creating provider {}", prefix))?;
        builder = builder.register(prefix.as_str(), provider)?;
    }

    Ok(builder.build())
}

async fn build_provider(
    prefix: &str,
    options: &ProviderOptions,
) -> Result<Arc<dyn InstanceProvider>> {
    match prefix {
        #[cfg(feature = "aws")]
        AWS => {
            let provider = skuttle_provider_aws::Ec2Provider::connect().await?;
            Ok(Arc::new(provider))
        }
        FILE => {
            let path = options.node_list.as_ref().ok_or_else(|| {
                ProviderError::MissingConfig(
                    "need to specify path to node list in --node-list or NODE_LIST".to_string(),
                )
            })?;
            let provider = StaticListProvider::load(FILE, path).await?;
            Ok(Arc::new(provider))
        }
        other => bail!("no provider available for {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_build_file_registry() {
        let mut list = tempfile::NamedTempFile::new().unwrap();
        writeln!(list, "node1\nnode2").unwrap();

        let options = ProviderOptions {
            node_list: Some(list.path().to_path_buf()),
        };
        let registry = build_registry(&["file".to_string()], &options).await.unwrap();

        let provider = registry.get("file").unwrap();
        assert!(provider.instance_exists("file://node1").await.unwrap());
        assert!(!provider.instance_exists("file://node3").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_provider_requires_node_list() {
        let result = build_registry(&["file".to_string()], &ProviderOptions::default()).await;

        let err = result.unwrap_err();
        assert!(format!("{:#}", err).contains("--node-list"));
    }

    #[tokio::test]
    async fn test_unknown_prefix_fails() {
        let result = build_registry(&["gce".to_string()], &ProviderOptions::default()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_file_is_always_available() {
        assert!(available().contains(&FILE));
    }
}

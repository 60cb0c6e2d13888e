//! AWS EC2 provider implementation

use crate::api::{ApiError, InstanceApi};
use crate::error::{AwsError, Result};
use async_trait::async_trait;
use skuttle_provider::{InfraReference, InstanceProvider, ProviderError};

const PROVIDER_NAME: &str = "aws";

const DRY_RUN_OPERATION: &str = "DryRunOperation";
const UNAUTHORIZED_OPERATION: &str = "UnauthorizedOperation";
const INSTANCE_NOT_FOUND: &str = "InvalidInstanceID.NotFound";

/// EC2 provider
///
/// Only instances in the `running` state count as existing; stopped,
/// terminated and unknown instance IDs are all reported as gone.
pub struct Ec2Provider<C = aws_sdk_ec2::Client> {
    client: C,
}

impl Ec2Provider {
    /// Build a client from the default AWS configuration chain and verify
    /// that it is allowed to describe instances
    pub async fn connect() -> Result<Self> {
        let config = aws_config::load_from_env().await;
        tracing::debug!(
            "loaded AWS configuration (region: {:?})",
            config.region().map(|r| r.as_ref().to_string())
        );
        Self::with_client(aws_sdk_ec2::Client::new(&config)).await
    }
}

impl<C: InstanceApi> Ec2Provider<C> {
    /// Wrap an existing client, running the permission dry run first
    pub async fn with_client(client: C) -> Result<Self> {
        tracing::info!("performing ec2 dry run");

        match client.probe_permissions().await {
            Ok(()) => tracing::info!("dry run successful"),
            Err(err) => match err.code() {
                Some(DRY_RUN_OPERATION) => tracing::info!("dry run successful"),
                Some(UNAUTHORIZED_OPERATION) => {
                    tracing::error!("dry run failed: {}", err);
                    return Err(AwsError::Unauthorized(err.to_string()));
                }
                _ => {
                    tracing::error!("dry run failed: {}", err);
                    return Err(AwsError::DryRunFailed(err.to_string()));
                }
            },
        }

        Ok(Self { client })
    }

    fn instance_id<'a>(&self, infra_reference: &'a str) -> skuttle_provider::Result<&'a str> {
        let reference = InfraReference::parse(infra_reference)?;
        if reference.prefix() != PROVIDER_NAME {
            return Err(ProviderError::invalid_reference(
                infra_reference,
                format!("expected {} scheme", PROVIDER_NAME),
            ));
        }

        // EC2 instance ID is the last path segment of the provider ID
        match reference.last_segment() {
            "" => Err(ProviderError::invalid_reference(
                infra_reference,
                "missing instance ID",
            )),
            id => Ok(id),
        }
    }
}

#[async_trait]
impl<C: InstanceApi> InstanceProvider for Ec2Provider<C> {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn instance_exists(&self, infra_reference: &str) -> skuttle_provider::Result<bool> {
        let instance_id = self.instance_id(infra_reference)?;

        match self.client.running_reservations(instance_id).await {
            Ok(0) => {
                tracing::info!("no reservations for instance ID {}", instance_id);
                Ok(false)
            }
            Ok(_) => Ok(true),
            Err(ApiError { code: Some(code), .. }) if code == INSTANCE_NOT_FOUND => {
                tracing::info!("no instance found for instance ID {}", instance_id);
                Ok(false)
            }
            Err(err) => {
                tracing::error!("aws API error - {}", err);
                Err(ProviderError::query_source(PROVIDER_NAME, err))
            }
        }
    }
}

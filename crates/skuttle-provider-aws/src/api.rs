//! Narrow view of the EC2 API
//!
//! The provider only needs two DescribeInstances calls. Keeping them behind
//! [`InstanceApi`] lets the error handling be tested without AWS.

use async_trait::async_trait;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::operation::describe_instances::DescribeInstancesError;
use aws_sdk_ec2::types::Filter;

const STATE_FILTER: &str = "instance-state-name";
const RUNNING: &str = "running";

/// Error reported by the EC2 API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// AWS error code (e.g. "InvalidInstanceID.NotFound"), absent for
    /// transport or dispatch failures
    pub code: Option<String>,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "code: {}, message: {}", code, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<SdkError<DescribeInstancesError>> for ApiError {
    fn from(err: SdkError<DescribeInstancesError>) -> Self {
        let code = err.code().map(str::to_string);
        let message = match err.message() {
            Some(message) => message.to_string(),
            None => DisplayErrorContext(&err).to_string(),
        };
        Self { code, message }
    }
}

/// The DescribeInstances calls the provider relies on
#[async_trait]
pub trait InstanceApi: Send + Sync {
    /// DescribeInstances with `DryRun=true`
    ///
    /// EC2 answers a permitted dry run with the `DryRunOperation` error code,
    /// so a successful probe usually arrives as `Err`.
    async fn probe_permissions(&self) -> std::result::Result<(), ApiError>;

    /// Number of reservations holding `instance_id` in the running state
    async fn running_reservations(&self, instance_id: &str)
    -> std::result::Result<usize, ApiError>;
}

#[async_trait]
impl InstanceApi for aws_sdk_ec2::Client {
    async fn probe_permissions(&self) -> std::result::Result<(), ApiError> {
        self.describe_instances()
            .dry_run(true)
            .send()
            .await
            .map(|_| ())
            .map_err(ApiError::from)
    }

    async fn running_reservations(
        &self,
        instance_id: &str,
    ) -> std::result::Result<usize, ApiError> {
        let output = self
            .describe_instances()
            .instance_ids(instance_id)
            .filters(Filter::builder().name(STATE_FILTER).values(RUNNING).build())
            .send()
            .await?;

        Ok(output.reservations().len())
    }
}

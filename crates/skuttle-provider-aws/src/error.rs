//! AWS provider error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("EC2 dry run unauthorized, check IAM permissions for ec2:DescribeInstances: {0}")]
    Unauthorized(String),

    #[error("EC2 dry run failed: {0}")]
    DryRunFailed(String),
}

pub type Result<T> = std::result::Result<T, AwsError>;

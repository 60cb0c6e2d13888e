//! AWS EC2 provider for skuttle
//!
//! Implements [`skuttle_provider::InstanceProvider`] for nodes whose
//! `spec.providerID` looks like `aws:///<availability-zone>/<instance-id>`.
//!
//! # Requirements
//!
//! - Credentials from the default AWS chain (env, profile, IRSA, IMDS)
//! - IAM permission for `ec2:DescribeInstances`
//!
//! # Example
//!
//! ```ignore
//! use skuttle_provider::InstanceProvider;
//! use skuttle_provider_aws::Ec2Provider;
//!
//! // Fails here, not on first use, when the IAM policy is missing
//! let provider = Ec2Provider::connect().await?;
//!
//! let alive = provider
//!     .instance_exists("aws:///eu-west-1a/i-0123abcdef")
//!     .await?;
//! ```

pub mod api;
pub mod error;
pub mod provider;

pub use api::{ApiError, InstanceApi};
pub use error::{AwsError, Result};
pub use provider::Ec2Provider;

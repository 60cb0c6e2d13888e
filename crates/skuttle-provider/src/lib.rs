//! skuttle infrastructure providers
//!
//! This crate answers one question for the reconciler: does the compute
//! instance behind a node still exist in the infrastructure substrate?
//!
//! # Supported Providers
//!
//! - **Static list** (`file://`): membership check against a preloaded list
//! - **AWS EC2** (`aws://`): lives in the `skuttle-provider-aws` crate
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   Reconciler                    │
//! └─────────────────┬───────────────────────────────┘
//!                   │ prefix of spec.providerID
//! ┌─────────────────▼───────────────────────────────┐
//! │                skuttle-provider                 │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │ ProviderRegistry (immutable after build)  │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │ trait InstanceProvider { ... }            │   │
//! │  └──────────────────────────────────────────┘   │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │  static list  │ │    aws ec2    │
//! │   provider    │ │   provider    │
//! └───────────────┘ └───────────────┘
//! ```

pub mod error;
pub mod provider;
pub mod registry;
pub mod static_list;

// Re-exports
pub use error::{ProviderError, Result};
pub use provider::{InfraReference, InstanceProvider, SCHEME_DELIMITER};
pub use registry::{ProviderRegistry, RegistryBuilder};
pub use static_list::StaticListProvider;

//! skuttle reconciliation engine
//!
//! Decides, one node event at a time, whether a node object has outlived the
//! compute instance behind it:
//!
//! ```text
//! Ready ──► NotReadyWithinGrace ──► NotReadyStale ──┬─► DeleteIssued
//!                                                   └─► StillExistsAtProvider
//! ```
//!
//! Nothing here is stored between events. Staleness is recomputed from the
//! Ready condition's `lastTransitionTime` every time a node is delivered, so
//! detection latency is bounded by the event source's resync interval.

pub mod config;
pub mod deleter;
pub mod error;
pub mod node;
pub mod reconciler;
pub mod shutdown;
pub mod stats;

// Re-exports
pub use config::{ReconcilerConfig, parse_duration, parse_provider_prefixes};
pub use deleter::{DeleteError, NodeDeleter};
pub use error::{ConfigError, NodeError, ReconcileError};
pub use node::{ConditionStatus, NodeView, ReadyCondition};
pub use reconciler::{Decision, NoOpReason, Reconciler};
pub use shutdown::{Shutdown, ShutdownTrigger};
pub use stats::{ReconcileStats, StatsSnapshot};

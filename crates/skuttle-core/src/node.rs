//! Read-only view over a Kubernetes node object

use crate::error::NodeError;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Node;
use std::str::FromStr;
use std::time::Duration;

const READY_CONDITION: &str = "Ready";

/// Status of a node condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn is_true(self) -> bool {
        self == Self::True
    }
}

impl FromStr for ConditionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "True" => Ok(Self::True),
            "False" => Ok(Self::False),
            "Unknown" => Ok(Self::Unknown),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for ConditionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::True => write!(f, "True"),
            Self::False => write!(f, "False"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

/// The node's `Ready` condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadyCondition {
    pub status: ConditionStatus,
    pub last_transition_time: DateTime<Utc>,
}

impl ReadyCondition {
    /// Time spent in the current status as of `now`
    ///
    /// Transition times in the future (clock skew between kubelet and
    /// controller) count as zero.
    pub fn elapsed(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_transition_time)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Semantic view of a node as delivered by the event source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeView {
    name: String,
    infra_reference: String,
    ready_condition: Option<ReadyCondition>,
}

impl NodeView {
    pub fn new(
        name: impl Into<String>,
        infra_reference: impl Into<String>,
        ready_condition: Option<ReadyCondition>,
    ) -> Self {
        Self {
            name: name.into(),
            infra_reference: infra_reference.into(),
            ready_condition,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `spec.providerID`, empty when the node has none
    pub fn infra_reference(&self) -> &str {
        &self.infra_reference
    }

    pub fn ready_condition(&self) -> Result<&ReadyCondition, NodeError> {
        self.ready_condition
            .as_ref()
            .ok_or_else(|| NodeError::MissingReadyCondition {
                node: self.name.clone(),
            })
    }
}

impl TryFrom<&Node> for NodeView {
    type Error = NodeError;

    fn try_from(node: &Node) -> Result<Self, Self::Error> {
        let name = node
            .metadata
            .name
            .clone()
            .filter(|name| !name.is_empty())
            .ok_or(NodeError::MissingName)?;

        let infra_reference = node
            .spec
            .as_ref()
            .and_then(|spec| spec.provider_id.clone())
            .unwrap_or_default();

        let condition = node
            .status
            .as_ref()
            .and_then(|status| status.conditions.as_ref())
            .and_then(|conditions| conditions.iter().find(|c| c.type_ == READY_CONDITION));

        let ready_condition = match condition {
            None => None,
            Some(condition) => {
                let status = condition.status.parse::<ConditionStatus>().map_err(|status| {
                    NodeError::InvalidConditionStatus {
                        node: name.clone(),
                        status,
                    }
                })?;

                // Without a transition time the staleness clock can't run
                condition
                    .last_transition_time
                    .as_ref()
                    .map(|time| ReadyCondition {
                        status,
                        last_transition_time: time.0,
                    })
            }
        };

        Ok(Self {
            name,
            infra_reference,
            ready_condition,
        })
    }
}

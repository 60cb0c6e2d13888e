//! Stale node decision engine

use crate::config::ReconcilerConfig;
use crate::deleter::NodeDeleter;
use crate::error::{ReconcileError, Result};
use crate::node::NodeView;
use crate::shutdown::Shutdown;
use crate::stats::ReconcileStats;
use chrono::{DateTime, Utc};
use skuttle_provider::{InfraReference, ProviderRegistry};
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Outcome of one reconcile pass
#[derive(Debug)]
pub enum Decision {
    /// Nothing to do
    NoOp(NoOpReason),
    /// The node's instance is gone; the node was (or in dry run, would have
    /// been) deleted
    DeleteRequested { dry_run: bool },
    /// The node was left alone because of an error
    Failed(ReconcileError),
}

impl Decision {
    pub fn is_delete(&self) -> bool {
        matches!(self, Self::DeleteRequested { .. })
    }
}

/// Why a node was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// Ready condition is True
    Ready,
    /// NotReady, but not for longer than the tolerance
    WithinTolerance { not_ready_for: Duration },
    /// NotReady past the tolerance, but the provider still sees the instance
    InstanceExists,
}

/// Decides, per node event, whether a stale node should be deleted
///
/// All state is shared read-only, so one `Reconciler` behind an `Arc` serves
/// every concurrent task. There is no per-node in-flight tracking: two
/// overlapping events for the same stale node may both delete it, which the
/// [`NodeDeleter`] contract makes harmless.
pub struct Reconciler {
    config: ReconcilerConfig,
    registry: Arc<ProviderRegistry>,
    deleter: Arc<dyn NodeDeleter>,
    stats: Arc<ReconcileStats>,
    shutdown: Shutdown,
}

impl Reconciler {
    pub fn new(
        config: ReconcilerConfig,
        registry: Arc<ProviderRegistry>,
        deleter: Arc<dyn NodeDeleter>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            config,
            registry,
            deleter,
            stats: Arc::new(ReconcileStats::new()),
            shutdown,
        }
    }

    /// Record decisions into an existing set of counters
    pub fn with_stats(mut self, stats: Arc<ReconcileStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn stats(&self) -> &Arc<ReconcileStats> {
        &self.stats
    }

    /// Reconcile `node` against the wall clock
    pub async fn reconcile(&self, node: &NodeView) -> Decision {
        self.reconcile_at(node, Utc::now()).await
    }

    /// Reconcile `node` as of `now`
    pub async fn reconcile_at(&self, node: &NodeView, now: DateTime<Utc>) -> Decision {
        let span = tracing::info_span!("reconcile", node = %node.name());

        let decision = match self.evaluate(node, now).instrument(span.clone()).await {
            Ok(decision) => decision,
            Err(err) => {
                span.in_scope(|| tracing::error!(kind = err.kind(), "{}", err));
                Decision::Failed(err)
            }
        };

        self.stats.record(&decision);
        decision
    }

    async fn evaluate(&self, node: &NodeView, now: DateTime<Utc>) -> Result<Decision> {
        let condition = node
            .ready_condition()
            .map_err(|_| ReconcileError::MissingReadyCondition {
                node: node.name().to_string(),
            })?;

        // node is Ready, no need to handle
        if condition.status.is_true() {
            tracing::debug!("node {} is Ready", node.name());
            return Ok(Decision::NoOp(NoOpReason::Ready));
        }

        let not_ready_for = condition.elapsed(now);
        let threshold = self.config.not_ready_tolerance;

        if not_ready_for <= threshold {
            tracing::debug!(
                "node {} has been NotReady ({}) for {:?} (<= threshold {:?})",
                node.name(),
                condition.status,
                whole_seconds(not_ready_for),
                threshold
            );
            return Ok(Decision::NoOp(NoOpReason::WithinTolerance { not_ready_for }));
        }

        tracing::info!(
            "node {} has been NotReady ({}) for {:?} (> threshold {:?})",
            node.name(),
            condition.status,
            whole_seconds(not_ready_for),
            threshold
        );

        let reference = InfraReference::parse(node.infra_reference())
            .map_err(|err| ReconcileError::from_provider(node.name(), err))?;
        let provider = self
            .registry
            .get(reference.prefix())
            .map_err(|err| ReconcileError::from_provider(node.name(), err))?;

        let exists = self
            .shutdown
            .run(provider.instance_exists(node.infra_reference()))
            .await
            .ok_or_else(|| ReconcileError::Cancelled {
                node: node.name().to_string(),
            })?
            .map_err(|err| ReconcileError::from_provider(node.name(), err))?;

        if exists {
            tracing::warn!(
                "node {} exists at provider {}",
                node.name(),
                provider.name()
            );
            return Ok(Decision::NoOp(NoOpReason::InstanceExists));
        }

        tracing::info!("deleting node {}", node.name());
        self.delete_node(node.name()).await
    }

    async fn delete_node(&self, name: &str) -> Result<Decision> {
        if self.config.dry_run {
            tracing::info!("*** DRY RUN *** deleted node {}", name);
            return Ok(Decision::DeleteRequested { dry_run: true });
        }

        self.shutdown
            .run(self.deleter.delete(name))
            .await
            .ok_or_else(|| ReconcileError::Cancelled {
                node: name.to_string(),
            })?
            .map_err(|source| ReconcileError::Deletion {
                node: name.to_string(),
                source,
            })?;

        tracing::info!("deleted node {}", name);
        Ok(Decision::DeleteRequested { dry_run: false })
    }
}

fn whole_seconds(duration: Duration) -> Duration {
    Duration::from_secs(duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deleter::DeleteError;
    use crate::node::{ConditionStatus, ReadyCondition};
    use crate::shutdown::ShutdownTrigger;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use skuttle_provider::{InstanceProvider, ProviderError, StaticListProvider};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingDeleter {
        deleted: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl NodeDeleter for RecordingDeleter {
        async fn delete(&self, name: &str) -> std::result::Result<(), DeleteError> {
            self.deleted.lock().unwrap().push(name.to_string());
            if self.fail {
                return Err(DeleteError::new("nodes \"x\" is forbidden"));
            }
            Ok(())
        }
    }

    /// Provider that never answers; only shutdown can end the query
    struct HangingProvider;

    #[async_trait]
    impl InstanceProvider for HangingProvider {
        fn name(&self) -> &str {
            "hang"
        }

        async fn instance_exists(&self, _: &str) -> skuttle_provider::Result<bool> {
            std::future::pending().await
        }
    }

    /// Deleter whose API call never returns
    struct HangingDeleter;

    #[async_trait]
    impl NodeDeleter for HangingDeleter {
        async fn delete(&self, _: &str) -> std::result::Result<(), DeleteError> {
            std::future::pending().await
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl InstanceProvider for FailingProvider {
        fn name(&self) -> &str {
            "broken"
        }

        async fn instance_exists(&self, _: &str) -> skuttle_provider::Result<bool> {
            Err(ProviderError::query("broken", "throttled"))
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
    }

    fn node(name: &str, reference: &str, status: ConditionStatus, minutes_ago: i64) -> NodeView {
        NodeView::new(
            name,
            reference,
            Some(ReadyCondition {
                status,
                last_transition_time: now() - chrono::Duration::minutes(minutes_ago),
            }),
        )
    }

    fn registry() -> Arc<ProviderRegistry> {
        Arc::new(
            ProviderRegistry::builder()
                .register("file", Arc::new(StaticListProvider::from_ids("file", ["alive"])))
                .unwrap()
                .register("hang", Arc::new(HangingProvider))
                .unwrap()
                .register("broken", Arc::new(FailingProvider))
                .unwrap()
                .build(),
        )
    }

    fn reconciler(dry_run: bool) -> (Reconciler, Arc<RecordingDeleter>, ShutdownTrigger) {
        let deleter = Arc::new(RecordingDeleter::default());
        let (trigger, shutdown) = Shutdown::channel();
        let config = ReconcilerConfig::new(dry_run, Duration::from_secs(600)).unwrap();
        (
            Reconciler::new(config, registry(), deleter.clone(), shutdown),
            deleter,
            trigger,
        )
    }

    fn deleted(deleter: &RecordingDeleter) -> Vec<String> {
        deleter.deleted.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_ready_node_is_noop_regardless_of_age() {
        let (reconciler, deleter, _trigger) = reconciler(false);

        for reference in ["file://gone", "gce://unregistered", ""] {
            let decision = reconciler
                .reconcile_at(&node("n", reference, ConditionStatus::True, 24 * 60), now())
                .await;
            assert!(matches!(decision, Decision::NoOp(NoOpReason::Ready)));
        }
        assert!(deleted(&deleter).is_empty());
    }

    #[tokio::test]
    async fn test_within_tolerance_is_noop() {
        let (reconciler, deleter, _trigger) = reconciler(false);

        let decision = reconciler
            .reconcile_at(&node("n", "file://gone", ConditionStatus::False, 5), now())
            .await;

        match decision {
            Decision::NoOp(NoOpReason::WithinTolerance { not_ready_for }) => {
                assert_eq!(not_ready_for, Duration::from_secs(300));
            }
            other => panic!("expected WithinTolerance, got {:?}", other),
        }
        assert!(deleted(&deleter).is_empty());
    }

    #[tokio::test]
    async fn test_exactly_at_tolerance_is_noop() {
        let (reconciler, deleter, _trigger) = reconciler(false);

        let decision = reconciler
            .reconcile_at(&node("n", "file://gone", ConditionStatus::Unknown, 10), now())
            .await;

        assert!(matches!(decision, Decision::NoOp(NoOpReason::WithinTolerance { .. })));
        assert!(deleted(&deleter).is_empty());
    }

    #[tokio::test]
    async fn test_stale_node_with_live_instance_is_kept() {
        let (reconciler, deleter, _trigger) = reconciler(false);

        let decision = reconciler
            .reconcile_at(&node("n", "file://alive", ConditionStatus::False, 15), now())
            .await;

        assert!(matches!(decision, Decision::NoOp(NoOpReason::InstanceExists)));
        assert!(deleted(&deleter).is_empty());
    }

    #[tokio::test]
    async fn test_stale_node_without_instance_is_deleted_once() {
        let (reconciler, deleter, _trigger) = reconciler(false);

        let decision = reconciler
            .reconcile_at(&node("stale", "file://gone", ConditionStatus::Unknown, 15), now())
            .await;

        assert!(matches!(decision, Decision::DeleteRequested { dry_run: false }));
        assert_eq!(deleted(&deleter), vec!["stale".to_string()]);
        assert_eq!(reconciler.stats().snapshot().deleted, 1);
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_deleter() {
        let (reconciler, deleter, _trigger) = reconciler(true);

        let decision = reconciler
            .reconcile_at(&node("stale", "file://gone", ConditionStatus::False, 15), now())
            .await;

        assert!(matches!(decision, Decision::DeleteRequested { dry_run: true }));
        assert!(decision.is_delete());
        assert!(deleted(&deleter).is_empty());
        assert_eq!(reconciler.stats().snapshot().dry_run_deleted, 1);
    }

    #[tokio::test]
    async fn test_missing_ready_condition() {
        let (reconciler, deleter, _trigger) = reconciler(false);

        let decision = reconciler
            .reconcile_at(&NodeView::new("n", "file://gone", None), now())
            .await;

        assert!(matches!(
            decision,
            Decision::Failed(ReconcileError::MissingReadyCondition { .. })
        ));
        assert!(deleted(&deleter).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_provider_is_error_not_delete() {
        let (reconciler, deleter, _trigger) = reconciler(false);

        let decision = reconciler
            .reconcile_at(&node("n", "gce://zone/vm", ConditionStatus::False, 20), now())
            .await;

        match decision {
            Decision::Failed(ReconcileError::UnknownProvider { node, prefix }) => {
                assert_eq!(node, "n");
                assert_eq!(prefix, "gce");
            }
            other => panic!("expected UnknownProvider, got {:?}", other),
        }
        assert!(deleted(&deleter).is_empty());
        assert_eq!(reconciler.stats().snapshot().errors, 1);
    }

    #[tokio::test]
    async fn test_invalid_reference_is_error() {
        let (reconciler, deleter, _trigger) = reconciler(false);

        let decision = reconciler
            .reconcile_at(&node("n", "", ConditionStatus::False, 20), now())
            .await;

        assert!(matches!(
            decision,
            Decision::Failed(ReconcileError::InvalidInfraReference { .. })
        ));
        assert!(deleted(&deleter).is_empty());
    }

    #[tokio::test]
    async fn test_provider_error_is_error_not_delete() {
        let (reconciler, deleter, _trigger) = reconciler(false);

        let decision = reconciler
            .reconcile_at(&node("n", "broken://x", ConditionStatus::False, 20), now())
            .await;

        match decision {
            Decision::Failed(err @ ReconcileError::ProviderQuery { .. }) => {
                assert_eq!(err.kind(), "provider_query");
                assert!(err.to_string().contains("throttled"));
            }
            other => panic!("expected ProviderQuery, got {:?}", other),
        }
        assert!(deleted(&deleter).is_empty());
    }

    #[tokio::test]
    async fn test_deletion_error_is_reported() {
        let deleter = Arc::new(RecordingDeleter {
            fail: true,
            ..Default::default()
        });
        let (_trigger, shutdown) = Shutdown::channel();
        let reconciler = Reconciler::new(ReconcilerConfig::default(), registry(), deleter.clone(), shutdown);

        let decision = reconciler
            .reconcile_at(&node("stale", "file://gone", ConditionStatus::False, 15), now())
            .await;

        assert!(matches!(decision, Decision::Failed(ReconcileError::Deletion { .. })));
        assert_eq!(deleted(&deleter), vec!["stale".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_provider_query() {
        let (reconciler, deleter, trigger) = reconciler(false);
        let reconciler = Arc::new(reconciler);

        let task = tokio::spawn({
            let reconciler = Arc::clone(&reconciler);
            async move {
                reconciler
                    .reconcile_at(&node("n", "hang://i-1", ConditionStatus::False, 15), now())
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.trigger();

        let decision = task.await.unwrap();
        assert!(matches!(decision, Decision::Failed(ReconcileError::Cancelled { .. })));
        assert!(deleted(&deleter).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_delete() {
        let (trigger, shutdown) = Shutdown::channel();
        let reconciler = Arc::new(Reconciler::new(
            ReconcilerConfig::default(),
            registry(),
            Arc::new(HangingDeleter),
            shutdown,
        ));

        let task = tokio::spawn({
            let reconciler = Arc::clone(&reconciler);
            async move {
                reconciler
                    .reconcile_at(&node("stale", "file://gone", ConditionStatus::False, 15), now())
                    .await
            }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        trigger.trigger();

        match task.await.unwrap() {
            Decision::Failed(ReconcileError::Cancelled { node }) => assert_eq!(node, "stale"),
            other => panic!("expected Cancelled, got {:?}", other),
        }
        let stats = reconciler.stats().snapshot();
        assert_eq!(stats.deleted, 0);
        assert_eq!(stats.errors, 1);
    }

    #[tokio::test]
    async fn test_repeated_events_delete_again() {
        let (reconciler, deleter, _trigger) = reconciler(false);
        let stale = node("stale", "file://gone", ConditionStatus::False, 15);

        reconciler.reconcile_at(&stale, now()).await;
        reconciler.reconcile_at(&stale, now()).await;

        assert_eq!(deleted(&deleter), vec!["stale".to_string(), "stale".to_string()]);
    }
}

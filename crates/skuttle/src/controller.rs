//! Node event source
//!
//! Watches nodes matching the label selector, keeps them in a reflector
//! store, and hands every add/update (plus a periodic resync of the whole
//! store) to the reconciler. Each node event runs in its own task.

use anyhow::Result;
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::api::Api;
use kube::runtime::reflector::{self, Store};
use kube::runtime::{WatchStreamExt, watcher};
use skuttle_core::{ConfigError, NodeView, Reconciler, Shutdown};
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

/// Node notification delivered by the watcher
#[derive(Debug)]
pub enum NodeEvent {
    Added(Node),
    Updated(Node),
    Removed(Node),
}

impl NodeEvent {
    /// Map a raw watcher event; bookkeeping events carry no node
    pub fn from_watcher(event: watcher::Event<Node>) -> Option<Self> {
        match event {
            watcher::Event::InitApply(node) => Some(Self::Added(node)),
            watcher::Event::Apply(node) => Some(Self::Updated(node)),
            watcher::Event::Delete(node) => Some(Self::Removed(node)),
            _ => None,
        }
    }
}

/// Runs one reconcile task per delivered node
pub struct Dispatcher {
    reconciler: Arc<Reconciler>,
    tasks: JoinSet<()>,
}

impl Dispatcher {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self {
            reconciler,
            tasks: JoinSet::new(),
        }
    }

    pub fn notify(&mut self, event: NodeEvent) {
        match event {
            NodeEvent::Added(node) => {
                tracing::debug!("add node {}", node_name(&node));
                self.dispatch(&node);
            }
            NodeEvent::Updated(node) => {
                tracing::debug!("update node {}", node_name(&node));
                self.dispatch(&node);
            }
            NodeEvent::Removed(node) => {
                tracing::debug!("remove node {}", node_name(&node));
            }
        }
        self.reap();
    }

    /// Re-deliver every cached node
    pub fn resync<I>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = Arc<Node>>,
    {
        let mut count = 0;
        for node in nodes {
            self.dispatch(&node);
            count += 1;
        }
        tracing::debug!("resynced {} nodes", count);
        self.reap();
    }

    fn dispatch(&mut self, node: &Node) {
        let view = match NodeView::try_from(node) {
            Ok(view) => view,
            Err(err) => {
                tracing::error!("skipping malformed node object: {}", err);
                return;
            }
        };

        let reconciler = Arc::clone(&self.reconciler);
        self.tasks.spawn(async move {
            reconciler.reconcile(&view).await;
        });
    }

    fn reap(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(err) = result {
                tracing::error!("reconcile task failed: {}", err);
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for in-flight reconciles to finish or unwind
    pub async fn drain(&mut self) {
        while let Some(result) = self.tasks.join_next().await {
            if let Err(err) = result {
                tracing::error!("reconcile task failed: {}", err);
            }
        }
    }
}

/// Watch loop settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub node_selector: String,
    pub refresh: Duration,
}

impl ControllerConfig {
    /// `refresh` drives a `tokio::time::interval`, so it must be non-zero
    pub fn new(
        node_selector: impl Into<String>,
        refresh: Duration,
    ) -> Result<Self, ConfigError> {
        if refresh.is_zero() {
            return Err(ConfigError::ZeroDuration {
                name: "refresh-duration",
            });
        }
        Ok(Self {
            node_selector: node_selector.into(),
            refresh,
        })
    }
}

pub struct Controller {
    api: Api<Node>,
    config: ControllerConfig,
    dispatcher: Dispatcher,
    shutdown: Shutdown,
}

impl Controller {
    pub fn new(
        api: Api<Node>,
        config: ControllerConfig,
        reconciler: Arc<Reconciler>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            api,
            config,
            dispatcher: Dispatcher::new(reconciler),
            shutdown,
        }
    }

    fn watcher_config(&self) -> watcher::Config {
        let config = watcher::Config::default();
        match self.config.node_selector.trim() {
            "" => config,
            selector => config.labels(selector),
        }
    }

    /// Run until shutdown, then wait for in-flight reconciles
    pub async fn run(mut self) -> Result<()> {
        let (reader, writer) = reflector::store::<Node>();
        let stream = reflector::reflector(writer, watcher(self.api.clone(), self.watcher_config()))
            .default_backoff();
        let mut stream = pin!(stream);

        let mut resync = tokio::time::interval(self.config.refresh);
        resync.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately, before the store has synced
        resync.tick().await;

        let mut shutdown = self.shutdown.clone();
        tracing::info!(
            "watching nodes (selector: {:?}, resync every {:?})",
            self.config.node_selector,
            self.config.refresh
        );

        loop {
            tokio::select! {
                _ = shutdown.wait() => {
                    tracing::info!("controller shutting down");
                    break;
                }
                event = stream.next() => match event {
                    Some(Ok(event)) => {
                        if matches!(event, watcher::Event::InitDone) {
                            tracing::info!("node cache synced ({} nodes)", reader.state().len());
                        }
                        if let Some(event) = NodeEvent::from_watcher(event) {
                            self.dispatcher.notify(event);
                        }
                    }
                    Some(Err(err)) => tracing::warn!("node watch error: {}", err),
                    None => {
                        tracing::warn!("node watch stream ended");
                        break;
                    }
                },
                _ = resync.tick() => self.resync(&reader),
            }
        }

        tracing::info!(
            "waiting for {} in-flight reconciles",
            self.dispatcher.in_flight()
        );
        self.dispatcher.drain().await;
        Ok(())
    }

    fn resync(&mut self, reader: &Store<Node>) {
        self.dispatcher.resync(reader.state());
    }
}

fn node_name(node: &Node) -> &str {
    node.metadata.name.as_deref().unwrap_or("<unnamed>")
}

mod controller;
mod deleter;
mod logging;
mod metrics;
mod providers;

use anyhow::{Context, Result};
use clap::Parser;
use controller::{Controller, ControllerConfig};
use deleter::KubeNodeDeleter;
use k8s_openapi::api::core::v1::Node;
use kube::api::Api;
use kube::config::{KubeConfigOptions, Kubeconfig};
use logging::LogLevel;
use providers::ProviderOptions;
use skuttle_core::{
    ReconcileStats, Reconciler, ReconcilerConfig, Shutdown, ShutdownTrigger, parse_duration,
    parse_provider_prefixes,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Parser, Debug)]
#[command(name = "skuttle", version)]
#[command(about = "Delete NotReady nodes whose cloud instances are gone", long_about = None)]
struct Cli {
    /// Only log deletions instead of performing them
    #[arg(long, env = "DRY_RUN")]
    dry_run: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "LOG_LEVEL", value_enum, default_value = "info")]
    log_level: LogLevel,

    /// Path to a kubeconfig file if not running in-cluster
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Label selector for the nodes skuttle should manage
    #[arg(long, env = "NODE_SELECTOR", default_value = "node.kubernetes.io/node")]
    node_selector: String,

    /// How long to tolerate NotReady nodes
    #[arg(long, env = "NOT_READY_DURATION", default_value = "10m", value_parser = parse_duration)]
    not_ready_duration: Duration,

    /// How often every cached node is re-evaluated
    #[arg(long, env = "REFRESH_DURATION", default_value = "10s", value_parser = parse_duration)]
    refresh_duration: Duration,

    /// Comma-separated list of enabled providers (aws, file)
    #[arg(long, env = "PROVIDERS", default_value = "")]
    providers: String,

    /// Newline-delimited instance list for the file provider
    #[arg(long, env = "NODE_LIST")]
    node_list: Option<PathBuf>,

    /// Serve /metrics and /healthz on this address
    #[arg(long, env = "METRICS_ADDR")]
    metrics_addr: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    tracing::info!("init");

    let prefixes = parse_provider_prefixes(&cli.providers, providers::available())?;
    let config = ReconcilerConfig::new(cli.dry_run, cli.not_ready_duration)?;
    let controller_config = ControllerConfig::new(cli.node_selector, cli.refresh_duration)?;
    if config.dry_run {
        tracing::warn!("dry run mode: nodes will not be deleted");
    }

    let client = kube_client(cli.kubeconfig.as_ref()).await?;

    let registry = providers::build_registry(
        &prefixes,
        &ProviderOptions {
            node_list: cli.node_list.clone(),
        },
    )
    .await?;
    tracing::info!("enabled providers: {}", registry.prefixes().join(", "));

    let (trigger, shutdown) = Shutdown::channel();
    let trigger = Arc::new(trigger);
    tokio::spawn(wait_for_signal(Arc::clone(&trigger)));

    let stats = Arc::new(ReconcileStats::new());
    let nodes: Api<Node> = Api::all(client);
    let reconciler = Reconciler::new(
        config,
        Arc::new(registry),
        Arc::new(KubeNodeDeleter::new(nodes.clone())),
        shutdown.clone(),
    )
    .with_stats(Arc::clone(&stats));

    let metrics_server = match cli.metrics_addr {
        Some(addr) => {
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind metrics address {}", addr))?;
            Some(tokio::spawn(metrics::serve(
                listener,
                Arc::clone(&stats),
                shutdown.clone(),
            )))
        }
        None => None,
    };

    tracing::info!("starting");
    let controller = Controller::new(nodes, controller_config, Arc::new(reconciler), shutdown);
    let result = controller.run().await;

    // also reached when the watch stream ends without a signal
    stop_metrics(&trigger, metrics_server).await?;
    result?;

    let totals = stats.snapshot();
    tracing::info!(
        evaluated = totals.evaluated,
        deleted = totals.deleted,
        dry_run_deleted = totals.dry_run_deleted,
        skipped_exists = totals.skipped_exists,
        errors = totals.errors,
        "stopped"
    );
    Ok(())
}

async fn kube_client(kubeconfig: Option<&PathBuf>) -> Result<kube::Client> {
    let config = match kubeconfig {
        Some(path) => {
            tracing::info!("using config from: {}", path.display());
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("could not read kubeconfig {}", path.display()))?;
            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .context("could not build kubeconfig")?
        }
        None => {
            tracing::info!("assuming we're running in-cluster");
            kube::Config::infer()
                .await
                .context("could not build kubeconfig")?
        }
    };

    kube::Client::try_from(config).context("could not create kube client")
}

/// Flip shutdown and wait for the metrics server to finish
async fn stop_metrics(
    trigger: &ShutdownTrigger,
    server: Option<JoinHandle<Result<()>>>,
) -> Result<()> {
    trigger.trigger();
    match server {
        Some(server) => server.await?,
        None => Ok(()),
    }
}

async fn wait_for_signal(trigger: Arc<ShutdownTrigger>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!("failed to install SIGTERM handler: {}", err);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("received shutdown signal");
    trigger.trigger();
}

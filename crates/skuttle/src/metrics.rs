//! HTTP endpoint exposing decision counters

use anyhow::Result;
use axum::Router;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use skuttle_core::{ReconcileStats, Shutdown};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

pub fn router(stats: Arc<ReconcileStats>) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(stats)
}

async fn metrics(State(stats): State<Arc<ReconcileStats>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
        stats.snapshot().to_prometheus(),
    )
}

/// Serve until shutdown is triggered
pub async fn serve(
    listener: TcpListener,
    stats: Arc<ReconcileStats>,
    mut shutdown: Shutdown,
) -> Result<()> {
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!("serving metrics on http://{}/metrics", addr);

    axum::serve(listener, router(stats))
        .with_graceful_shutdown(async move {
            shutdown.wait().await;
            tracing::debug!("metrics server shutting down");
        })
        .await?;

    Ok(())
}

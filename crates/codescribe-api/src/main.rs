//! Codescribe RAG API server.
//!
//! Serves the HTTP surface (`routes::create_router`) and runs the job
//! orchestrator as a background task against the same durable queue.
//! Installs a `SIGINT`/`SIGTERM` handler: on receipt, the HTTP server stops
//! accepting new connections and the orchestrator stops new dequeues, but
//! in-flight request handlers and the current phase of each in-flight job
//! run to completion before the process exits.

use codescribe_api::{bootstrap, routes};
use codescribe_config::{ApplicationConfig, Validate};
use futures::stream::StreamExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook_tokio::Signals;
use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use tracing::info;

type MainResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> MainResult {
    codescribe_common::initialize_environment();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("starting codescribe API server");

    let config = ApplicationConfig::from_env();
    config.validate()?;
    info!(
        port = config.api.port,
        database = %config.database.safe_connection_string(),
        "configuration loaded"
    );

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    let (state, orchestrator) = bootstrap::initialize_app_state(&config).await?;
    let state = state.with_metrics_handle(metrics_handle);
    let shutdown = orchestrator.shutdown_handle();

    let orchestrator = std::sync::Arc::new(orchestrator);
    let orchestrator_task = tokio::spawn({
        let orchestrator = std::sync::Arc::clone(&orchestrator);
        async move { orchestrator.run().await }
    });

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let signals_handle = signals.handle();

    let app = routes::create_router(state);
    let addr: SocketAddr = format!("0.0.0.0:{}", config.api.port).parse()?;
    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            signals.next().await;
            info!("shutdown signal received, stopping new connections and new job dequeues");
            shutdown.store(true, Ordering::Relaxed);
        })
        .await?;

    signals_handle.close();
    orchestrator_task.await?;

    Ok(())
}

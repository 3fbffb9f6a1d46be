//! Elevation API Server
//!
//! Accepts bounding-box requests, runs the elevation mosaic pipeline and
//! stores the resulting rasters.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use elevation_api::{build_router, AppState, ServiceConfig};

/// Elevation API Server
#[derive(Parser, Debug)]
#[command(name = "elevation-api")]
#[command(about = "Elevation tile mosaic service")]
struct Args {
    /// Listen address
    #[arg(short, long, env = "API_LISTEN_ADDR")]
    listen: Option<String>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Pipeline configuration file (YAML)
    #[arg(short, long, env = "PIPELINE_CONFIG")]
    config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(long, env = "API_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(run_server(args))
}

async fn run_server(args: Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    let prometheus_handle = PrometheusBuilder::new().install_recorder()?;
    info!("Prometheus metrics exporter initialized");

    let mut config = ServiceConfig::from_env();
    if let Some(listen) = args.listen {
        config.listen = listen;
    }
    if args.config.is_some() {
        config.pipeline_config = args.config;
    }
    config
        .validate()
        .map_err(|e| anyhow!("invalid service config: {}", e))?;

    info!(
        listen = %config.listen,
        origins = ?config.allowed_origins,
        "Starting elevation API server"
    );

    let state = Arc::new(AppState::from_config(&config)?.with_prometheus(prometheus_handle));
    let app = build_router(state, config.cors_layer());

    let addr: SocketAddr = config.listen.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use clippa_api::{create_router, metrics, ApiConfig, AppState};
use clippa_media::{MetadataConfig, ToolRunner};
use clippa_worker::spawn_purge_task;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Everything after this point logs through the subscriber
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialise tracing: {:#}", e);
        std::process::exit(1);
    }

    if let Err(e) = run().await {
        error!("Server failed: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install rustls crypto provider"))?;

    info!("Starting clippa-api");

    let config = ApiConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);

    let state = AppState::from_env(config.clone())
        .await
        .context("Failed to create application state")?;

    let worker = state.orchestrator.config();
    for program in [&worker.ytdlp_path, &worker.ffmpeg_path] {
        match ToolRunner::new(program.as_str()).check() {
            Ok(path) => info!(program = %program, path = %path.display(), "Found tool"),
            Err(e) => warn!(program = %program, error = %e, "Tool not found, jobs will fail"),
        }
    }

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("Failed to install Prometheus recorder")?)
    } else {
        None
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metadata_config = MetadataConfig::from_env();
    let sweeper = state
        .metadata
        .cache()
        .spawn_sweeper(metadata_config.sweep_interval, shutdown_rx.clone());

    let purger = spawn_purge_task(
        state.jobs.clone(),
        worker.job_retention,
        worker.purge_interval,
        shutdown_rx,
    );

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(sweeper, purger);

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("clippa=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .try_init()?;
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_reports_second_install() {
        assert!(init_tracing().is_ok());
        assert!(init_tracing().is_err());
    }
}

//! Splunk Event Reader
//!
//! Reads Splunk events via the Splunk REST API and serves publish
//! transactions over HTTP.
//!
//! Run with: cargo run --bin event-reader
//! Health: http://localhost:8080/__health

use anyhow::Context;
use event_reader_runtime::metrics::MetricsServer;
use event_reader_web::{AppState, ServiceConfig, router};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = ServiceConfig::from_env().context("Invalid configuration")?;
    info!(
        system_code = %config.system_code,
        name = %config.name,
        environment = %config.environment,
        wire_format = ?config.wire_format,
        "Starting splunk-event-reader"
    );

    if let Some(addr) = config.metrics_addr {
        MetricsServer::new(addr)
            .start()
            .context("Failed to start metrics exporter")?;
    }

    let state = AppState::from_config(&config).context("Failed to build Splunk client")?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutdown complete");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "event_reader=info,event_reader_web=info,event_reader_runtime=info,tower_http=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Unable to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "Unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}

//! Webhook relay server.
//!
//! Reads configuration from the environment (and `.env` if present), then
//! serves the liveness check, the relay endpoint and, in bearer mode, the
//! token endpoint.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;

use relay::{logging, router, AppState, Config};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Missing secrets are fatal before anything binds.
    let config = Config::from_env().context("Invalid configuration")?;

    logging::init(&config);

    info!("relay_starting");
    info!(
        port = config.port,
        auth_mode = %config.auth_mode,
        forward_url = %config.forward_url,
        forward_format = ?config.forward_format,
        forward_timeout_ms = config.forward_timeout.as_millis() as u64,
        relay_path = %config.relay_path,
        log_file = %config.log_file,
        "config_loaded"
    );

    let port = config.port;
    let state = AppState::new(config).context("Failed to build application state")?;
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, "relay_listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("relay_shutdown_complete");

    Ok(())
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }

    info!("relay_shutting_down");
}

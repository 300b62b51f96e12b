//! # Shared Canvas Server
//!
//! Boots the canvas server: loads configuration, binds the WebSocket
//! listener, serves operator metrics over HTTP and answers `stat` on stdin
//! with a statistics report.
//!
//! ## Usage
//! `place-server [port] [dimension]`, or `PLACE_PORT` / `PLACE_DIMENSION` and
//! the other `PLACE_*` variables (a `.env` file is honored).

use place_server::{config, server};
use std::sync::Arc;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    net::TcpListener,
    signal,
};
use tracing::{error, info};
use place_server::server::ServerState;

/// Entry point for the canvas server.
///
/// # Errors
/// Returns an error if configuration validation fails or if the server fails to bind to a port.
#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let _ = dotenv::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::ServerConfig::load(std::env::args().skip(1))?;
    let state = Arc::new(ServerState::new(config)?);

    let listener = TcpListener::bind(format!("0.0.0.0:{}", state.config.port)).await?;
    info!(
        "Server listening on port {} with a {}x{} board",
        state.config.port, state.config.dimension, state.config.dimension
    );

    let metrics_state = state.clone();
    tokio::spawn(async move {
        if let Err(e) = server::health::serve_metrics_http(metrics_state).await {
            error!("Metrics endpoint stopped: {}", e);
        }
    });
    tokio::spawn(operator_console(state.clone()));

    // Handle incoming connections or shutdown signals
    tokio::select! {
        _ = server::accept_connections(listener, state.clone()) => {},
        _ = shutdown_signal() => {
            info!("Shutting down gracefully");
        }
    }

    Ok(())
}

/// Prints a statistics report whenever a stdin line starts with `stat`.
async fn operator_console(state: Arc<ServerState>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().to_lowercase().starts_with("stat") => {
                println!("{}", state.stats.snapshot());
            }
            Ok(Some(_)) => {}
            Ok(None) => return,
            Err(e) => {
                error!("Console read failed: {}", e);
                return;
            }
        }
    }
}

/// Listens for a shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

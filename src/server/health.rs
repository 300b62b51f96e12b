use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use axum::{Router, routing::get, extract::State, response::IntoResponse, Json};
use std::{net::SocketAddr, sync::Arc};
use tracing::info;

use crate::server::ServerState;
use crate::utils::error::PlaceError;

/// Prometheus counters for connections, logins and tile traffic.
#[derive(Clone)]
pub struct HealthMetrics {
    /// Open WebSocket connections, logged in or not.
    pub connections: IntGauge,
    /// Sessions currently registered under a username.
    pub sessions: IntGauge,
    /// Frames read from clients.
    pub messages_received: IntCounter,
    /// Tile changes applied and broadcast.
    pub tiles_applied: IntCounter,
    /// Tile changes refused as invalid moves.
    pub tiles_rejected: IntCounter,
    /// Tile changes dropped by the per-session rate limiter.
    pub changes_throttled: IntCounter,
    registry: Registry,
}

impl HealthMetrics {
    /// Creates the metrics and registers them with a fresh Prometheus registry.
    ///
    /// # Errors
    /// Returns a `PlaceError::MetricsError` if a metric cannot be registered.
    pub fn new() -> Result<Self, PlaceError> {
        let registry = Registry::new();
        let connections = IntGauge::new("connections", "Open connections")?;
        let sessions = IntGauge::new("sessions", "Logged-in sessions")?;
        let messages_received = IntCounter::new("messages_received", "Total frames received")?;
        let tiles_applied = IntCounter::new("tiles_applied", "Tile changes applied")?;
        let tiles_rejected = IntCounter::new("tiles_rejected", "Tile changes refused as invalid")?;
        let changes_throttled = IntCounter::new("changes_throttled", "Tile changes dropped by the rate limiter")?;

        registry.register(Box::new(connections.clone()))?;
        registry.register(Box::new(sessions.clone()))?;
        registry.register(Box::new(messages_received.clone()))?;
        registry.register(Box::new(tiles_applied.clone()))?;
        registry.register(Box::new(tiles_rejected.clone()))?;
        registry.register(Box::new(changes_throttled.clone()))?;

        Ok(Self {
            connections,
            sessions,
            messages_received,
            tiles_applied,
            tiles_rejected,
            changes_throttled,
            registry,
        })
    }

    /// Exposes the current state of all registered metrics in Prometheus text format.
    ///
    /// # Errors
    /// Returns a `PlaceError::MetricsError` if encoding fails.
    pub fn expose_metrics(&self) -> Result<String, PlaceError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = vec![];
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| PlaceError::SerializationError(e.to_string()))
    }
}

/// Builds the router serving `/metrics` and `/stats`.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/stats", get(stats_handler))
        .with_state(state)
}

/// Serves the operator HTTP endpoint on `metrics_port` until the process exits.
///
/// # Errors
/// Returns a `PlaceError::ConnectionError` if the HTTP server fails.
pub async fn serve_metrics_http(state: Arc<ServerState>) -> Result<(), PlaceError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.metrics_port));
    info!("Metrics listening on {}", addr);

    axum::Server::try_bind(&addr)
        .map_err(|e| PlaceError::ConnectionError(e.to_string()))?
        .serve(router(state).into_make_service())
        .await
        .map_err(|e| PlaceError::ConnectionError(e.to_string()))
}

async fn metrics_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    match state.metrics.expose_metrics() {
        Ok(body) => (axum::http::StatusCode::OK, body),
        Err(e) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn stats_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(state.stats.snapshot())
}

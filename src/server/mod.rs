// src/server/mod.rs
pub mod board_service;
pub mod handler;
pub mod health;
pub mod listener;
pub mod message;
pub mod middleware;
pub mod registry;
pub mod session;

// Re-export public components
pub use board_service::{BoardService, TileOutcome};
pub use handler::{handle_connection, SessionHandler, SessionPhase};
pub use health::HealthMetrics;
pub use listener::accept_connections;
pub use message::{ClientMessage, ServerMessage};
pub use registry::ConnectionRegistry;
pub use session::Session;

// Import internal dependencies
use std::sync::Arc;
use governor::Quota;
use crate::board::Board;
use crate::config::ServerConfig;
use crate::stats::StatsAggregator;
use crate::utils::error::PlaceError;

/// Handles shared by every connection task.
pub struct ServerState {
    pub config: Arc<ServerConfig>,
    pub registry: ConnectionRegistry,
    pub board: BoardService,
    pub stats: Arc<StatsAggregator>,
    pub metrics: HealthMetrics,
    pub change_quota: Quota,
}

impl ServerState {
    /// Builds the board, registry and statistics for `config`.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or metrics cannot be registered.
    pub fn new(config: ServerConfig) -> Result<Self, PlaceError> {
        config.validate()?;
        let change_quota = config.change_quota()?;
        let registry = ConnectionRegistry::new();
        let stats = Arc::new(StatsAggregator::new());
        let metrics = HealthMetrics::new()?;
        let board = BoardService::new(
            Board::new(config.dimension),
            registry.clone(),
            stats.clone(),
            metrics.clone(),
        );

        Ok(Self {
            config: Arc::new(config),
            registry,
            board,
            stats,
            metrics,
            change_quota,
        })
    }
}

//! The single serialized path into board mutation.
//!
//! Every tile change and every login runs under one board lock, so a client's
//! initial board copy is never taken mid-change and changes are broadcast in
//! the order they were applied. Lock order is board, then registry shards,
//! then the stats mutex; the last two are never held while taking another.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::board::{Board, Tile};
use crate::server::health::HealthMetrics;
use crate::server::message::ServerMessage;
use crate::server::registry::ConnectionRegistry;
use crate::server::session::{LoginError, SessionRef};
use crate::stats::StatsAggregator;

/// What happened to a proposed tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    /// Applied and broadcast to this many sessions.
    Applied { recipients: usize },
    /// Refused as an invalid move.
    Rejected,
}

pub struct BoardService {
    board: Mutex<Board>,
    registry: ConnectionRegistry,
    stats: Arc<StatsAggregator>,
    metrics: HealthMetrics,
}

impl BoardService {
    pub fn new(
        board: Board,
        registry: ConnectionRegistry,
        stats: Arc<StatsAggregator>,
        metrics: HealthMetrics,
    ) -> Self {
        Self {
            board: Mutex::new(board),
            registry,
            stats,
            metrics,
        }
    }

    /// Logs `session` in while no tile change can run, so its board copy and
    /// the first broadcast it sees are consistent.
    ///
    /// `replaces` is the connection's current registration, if any. It is
    /// released under the same lock once the new name is taken, so no change
    /// is broadcast to both names. A refused login leaves it registered.
    pub async fn login(
        &self,
        session: SessionRef,
        replaces: Option<&SessionRef>,
    ) -> Result<(), LoginError> {
        let board = self.board.lock().await;
        self.registry.login(session, &board)?;
        self.metrics.sessions.inc();

        if let Some(previous) = replaces {
            if self.registry.logoff(&previous.username, previous.connection_id) {
                self.metrics.sessions.dec();
            }
        }
        Ok(())
    }

    /// Records, validates, applies and broadcasts one proposed tile.
    ///
    /// Statistics count every proposal that reaches this point, valid or not.
    /// An invalid move is reported to its owner only, if still connected.
    #[instrument(skip(self, tile), fields(tile = %tile))]
    pub async fn change_tile(&self, tile: Tile) -> TileOutcome {
        let mut board = self.board.lock().await;
        self.stats.record(&tile);

        if !board.is_valid(&tile) {
            debug!("Invalid move from {}", tile.owner);
            self.metrics.tiles_rejected.inc();
            if let Some(owner) = self.registry.get(&tile.owner) {
                let _ = owner.send(ServerMessage::error("Invalid Move"));
            }
            return TileOutcome::Rejected;
        }

        board.set(tile.clone());
        let recipients = self.registry.broadcast(&tile);
        self.metrics.tiles_applied.inc();
        info!("{} was changed, sent to {} sessions", tile, recipients);

        TileOutcome::Applied { recipients }
    }

    /// Copy of the current board.
    pub async fn snapshot(&self) -> Board {
        self.board.lock().await.clone()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }
}

use std::{net::SocketAddr, sync::Arc};
use futures_util::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, instrument};
use tungstenite::Message;
use uuid::Uuid;

use crate::{
    board::Tile,
    server::{
        board_service::TileOutcome,
        message::{ClientMessage, MessageError, ServerMessage},
        middleware::{validate_request, ChangeRateLimiter},
        session::{spawn_writer, Outbound, Session, SessionRef},
        ServerState,
    },
    utils::error::PlaceError,
};

/// Where a connection is in its lifecycle.
#[derive(Debug)]
pub enum SessionPhase {
    /// Connected, no username claimed yet.
    AwaitingLogin,
    /// Registered under a username.
    Active(SessionRef),
    /// The connection ended and any registration was released.
    Closed,
}

/// Protocol state for one connection.
///
/// Relays requests into the registry and board service and never writes to
/// the client on its own, except to refuse a malformed login. The change
/// limiter lives as long as the connection, across every name it logs in as.
pub struct SessionHandler {
    connection_id: Uuid,
    addr: SocketAddr,
    outbound: Outbound,
    limiter: Arc<ChangeRateLimiter>,
    phase: SessionPhase,
    state: Arc<ServerState>,
}

impl SessionHandler {
    pub fn new(addr: SocketAddr, outbound: Outbound, state: Arc<ServerState>) -> Self {
        Self {
            connection_id: Uuid::new_v4(),
            addr,
            outbound,
            limiter: Arc::new(ChangeRateLimiter::new(state.change_quota)),
            phase: SessionPhase::AwaitingLogin,
            state,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn username(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Active(session) => Some(&session.username),
            _ => None,
        }
    }

    /// Dispatches one decoded request.
    pub async fn handle(&mut self, request: ClientMessage) {
        if let SessionPhase::Closed = self.phase {
            return;
        }

        if let Err(e) = validate_request(&request) {
            debug!("Refusing request from {}: {}", self.addr, e);
            let _ = self.outbound.send(ServerMessage::error(e));
            return;
        }

        match request {
            ClientMessage::Login { username } => self.login(username).await,
            ClientMessage::ChangeTile { tile } => {
                self.change_tile(tile).await;
            }
        }
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn login(&mut self, username: String) {
        let session = Arc::new(Session::new(
            self.connection_id,
            username,
            self.addr,
            self.outbound.clone(),
            self.limiter.clone(),
        ));
        let previous = match &self.phase {
            SessionPhase::Active(previous) => Some(previous.clone()),
            _ => None,
        };

        // A successful login replaces the previous name; the board service
        // releases it before any further change can be broadcast.
        match self.state.board.login(session.clone(), previous.as_ref()).await {
            Ok(()) => {
                info!("{} @ {} logging in...", session.username, self.addr);
                self.phase = SessionPhase::Active(session);
            }
            Err(e) => info!("{} @ {} log in rejected: {}", session.username, self.addr, e),
        }
    }

    async fn change_tile(&mut self, tile: Tile) -> Option<TileOutcome> {
        let session = match &self.phase {
            SessionPhase::Active(session) => session.clone(),
            _ => {
                debug!("Ignoring tile change from {} before login", self.addr);
                return None;
            }
        };

        if !session.try_accept_change() {
            debug!("Throttled tile change from {}", session.username);
            self.state.metrics.changes_throttled.inc();
            return None;
        }

        let tile = tile.with_owner(session.username.clone());
        Some(self.state.board.change_tile(tile).await)
    }

    fn release(&self, session: &SessionRef) {
        if self
            .state
            .registry
            .logoff(&session.username, session.connection_id)
        {
            self.state.metrics.sessions.dec();
        }
    }

    /// Releases the registration, if any. Safe to call more than once.
    pub fn close(&mut self) {
        if let SessionPhase::Active(session) =
            std::mem::replace(&mut self.phase, SessionPhase::Closed)
        {
            info!("{} @ {} logging off...", session.username, self.addr);
            self.release(&session);
        }
    }
}

impl Drop for SessionHandler {
    fn drop(&mut self) {
        self.close();
    }
}

/// Runs one client connection from WebSocket handshake to disconnect.
///
/// The read loop only ends on close, end of stream or a read error; the
/// registration is released on every exit path.
///
/// # Errors
/// Returns `PlaceError::ConnectionError` if the handshake or a read fails.
#[instrument(skip(state, stream))]
pub async fn handle_connection<S>(
    stream: S,
    state: Arc<ServerState>,
    addr: SocketAddr,
) -> Result<(), PlaceError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| {
            error!("WebSocket handshake failed: {}", e);
            PlaceError::ConnectionError(e.to_string())
        })?;

    let (writer, mut reader) = ws_stream.split();
    let outbound = spawn_writer(addr, writer);
    let mut handler = SessionHandler::new(addr, outbound, state.clone());
    state.metrics.connections.inc();

    let process_result = async {
        while let Some(msg) = reader.next().await {
            let msg = msg.map_err(|e| PlaceError::ConnectionError(e.to_string()))?;
            state.metrics.messages_received.inc();

            if let Message::Close(_) = msg {
                break;
            }
            match ClientMessage::try_from(msg) {
                Ok(request) => handler.handle(request).await,
                Err(MessageError::InvalidFormat) => {}
                Err(e) => debug!("Ignoring frame from {}: {}", addr, e),
            }
        }
        Ok(())
    }.await;

    handler.close();
    state.metrics.connections.dec();

    process_result
}

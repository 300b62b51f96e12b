use std::sync::Arc;
use dashmap::{mapref::entry::Entry, DashMap};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::board::{Board, Tile};
use crate::server::message::ServerMessage;
use crate::server::session::{LoginError, SessionRef};

/// Maps usernames to the sessions currently logged in.
///
/// Its shard locks are leaves: nothing else is locked while one is held.
/// Callers that need login to be ordered against board changes hold the
/// board lock around [`ConnectionRegistry::login`].
pub struct ConnectionRegistry {
    sessions: Arc<DashMap<String, SessionRef>>,
}

// Manual Clone implementation
impl Clone for ConnectionRegistry {
    fn clone(&self) -> Self {
        ConnectionRegistry {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Registers `session` under its username.
    ///
    /// On success the client is sent `LoginSuccess` then a copy of `board`,
    /// and only after that does the session become visible to
    /// [`ConnectionRegistry::broadcast`]. A taken name is answered with a
    /// single `Error` and nothing is registered.
    #[instrument(skip(self, session, board), fields(username = %session.username))]
    pub fn login(&self, session: SessionRef, board: &Board) -> Result<(), LoginError> {
        // The entry keeps the name's shard locked until the insert, so a
        // concurrent login for the same name waits and then sees it taken.
        match self.sessions.entry(session.username.clone()) {
            Entry::Occupied(_) => {
                if let Err(e) = session.send(ServerMessage::error(LoginError::UsernameTaken)) {
                    warn!("Login refusal failed to reach {}: {}", session.addr, e);
                }
                Err(LoginError::UsernameTaken)
            }
            Entry::Vacant(slot) => {
                let replies = [
                    ServerMessage::LoginSuccess("Login Successful".into()),
                    ServerMessage::Board(board.clone()),
                ];
                for reply in replies {
                    if let Err(e) = session.send(reply) {
                        // Still registered; the handler logs it off on disconnect.
                        warn!("Login reply failed to {}: {}", session.username, e);
                    }
                }
                slot.insert(session);
                Ok(())
            }
        }
    }

    /// Removes `username` if it still belongs to `connection_id`.
    ///
    /// Safe to call repeatedly. Returns whether an entry was removed.
    pub fn logoff(&self, username: &str, connection_id: Uuid) -> bool {
        let removed = self
            .sessions
            .remove_if(username, |_, session| session.connection_id == connection_id)
            .is_some();
        if removed {
            debug!("{} removed from registry", username);
        }
        removed
    }

    pub fn get(&self, username: &str) -> Option<SessionRef> {
        self.sessions.get(username).map(|entry| entry.value().clone())
    }

    /// Sends `TileChanged(tile)` to every session registered at call time.
    ///
    /// Membership is copied first so no shard lock is held while sending.
    /// A failed send is logged and skipped. Returns the number delivered.
    #[instrument(skip(self, tile), fields(tile = %tile))]
    pub fn broadcast(&self, tile: &Tile) -> usize {
        let recipients: Vec<SessionRef> = self
            .sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect();

        recipients
            .iter()
            .filter(|session| match session.send(ServerMessage::TileChanged(tile.clone())) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Broadcast failed to {}: {}", session.username, e);
                    false
                }
            })
            .count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn usernames(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

use std::{net::SocketAddr, sync::Arc};
use futures_util::{Sink, SinkExt};
use tokio::sync::mpsc;
use tracing::{debug, error, instrument};
use tungstenite::Message;
use uuid::Uuid;

use crate::server::message::ServerMessage;
use crate::server::middleware::ChangeRateLimiter;

/// Sending half of a connection's outbound notification queue.
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// A logged-in client.
///
/// Owned by the [`ConnectionRegistry`](crate::server::ConnectionRegistry) once
/// registered; the connection's handler keeps a second handle for logoff.
/// The limiter belongs to the connection and is shared by every session it
/// logs in, so switching names does not reset the cooldown.
#[derive(Debug)]
pub struct Session {
    /// Identifier of the connection that logged in.
    pub connection_id: Uuid,
    /// Unique while the session is registered.
    pub username: String,
    /// Address of the peer, for logging.
    pub addr: SocketAddr,
    outbound: Outbound,
    limiter: Arc<ChangeRateLimiter>,
}

impl Session {
    pub fn new(
        connection_id: Uuid,
        username: impl Into<String>,
        addr: SocketAddr,
        outbound: Outbound,
        limiter: Arc<ChangeRateLimiter>,
    ) -> Self {
        Self {
            connection_id,
            username: username.into(),
            addr,
            outbound,
            limiter,
        }
    }

    /// Queues a notification for the client.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::SendFailed` if the connection's writer is gone.
    pub fn send(&self, message: ServerMessage) -> Result<(), SessionError> {
        self.outbound.send(message).map_err(|_| SessionError::SendFailed)
    }

    /// Decides whether a tile change from this session may proceed now.
    pub fn try_accept_change(&self) -> bool {
        self.limiter.try_accept()
    }
}

/// Spawns the task that drains `Outbound` onto the socket and returns the
/// queue's sender. The task ends when every sender is dropped or a write fails.
#[instrument(skip(writer))]
pub fn spawn_writer<W>(addr: SocketAddr, writer: W) -> Outbound
where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: std::fmt::Display + Send,
{
    let (sender, mut receiver) = mpsc::unbounded_channel::<ServerMessage>();

    tokio::spawn(async move {
        let mut writer = writer;
        while let Some(notification) = receiver.recv().await {
            let frame = match Message::try_from(notification) {
                Ok(frame) => frame,
                Err(e) => {
                    error!("Failed to encode notification for {}: {}", addr, e);
                    continue;
                }
            };
            if let Err(e) = writer.send(frame).await {
                error!("Failed to send message to {}: {}", addr, e);
                break;
            }
        }
        let _ = writer.close().await;
        debug!("Writer for {} finished", addr);
    });

    sender
}

/// Shared handle to a registered session.
pub type SessionRef = Arc<Session>;

/// Represents errors that may occur in session operations.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Failed to send message")]
    SendFailed,
}

/// Reasons a login is refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Invalid username")]
    InvalidUsername,
}

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tungstenite::Message;
use crate::board::{Board, Tile};
use crate::utils::error::PlaceError;

/// Represents the errors that can occur when decoding a client frame.
#[derive(Error, Debug)]
pub enum MessageError {
    /// The frame kind carries no request (ping, pong, raw frames).
    #[error("Invalid message format")]
    InvalidFormat,

    /// The frame's JSON is malformed or names an unknown request kind.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Requests a client can send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    /// Claim a username for this connection.
    Login { username: String },

    /// Propose a new tile.
    ChangeTile { tile: Tile },
}

/// Notifications the server pushes to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    /// The login was accepted.
    LoginSuccess(String),

    /// A login or a move was refused.
    Error(String),

    /// Full copy of the board, sent once right after login.
    Board(Board),

    /// A tile change that every logged-in client must apply.
    TileChanged(Tile),
}

impl ServerMessage {
    pub fn error(reason: impl ToString) -> Self {
        ServerMessage::Error(reason.to_string())
    }
}

/// Converts a Tungstenite `Message` into a `ClientMessage`.
impl TryFrom<Message> for ClientMessage {
    type Error = MessageError;

    fn try_from(msg: Message) -> Result<Self, Self::Error> {
        match msg {
            Message::Text(text) => serde_json::from_str(&text)
                .map_err(|e| MessageError::SerializationError(e.to_string())),

            Message::Binary(data) => serde_json::from_slice(&data)
                .map_err(|e| MessageError::SerializationError(e.to_string())),

            _ => Err(MessageError::InvalidFormat),
        }
    }
}

/// Converts a `ServerMessage` into a JSON text frame.
impl TryFrom<ServerMessage> for Message {
    type Error = PlaceError;

    fn try_from(msg: ServerMessage) -> Result<Self, Self::Error> {
        let json = serde_json::to_string(&msg)?;
        Ok(Message::Text(json))
    }
}

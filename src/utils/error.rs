use thiserror::Error;

/// Represents the errors that can surface anywhere in the canvas server.
#[derive(Error, Debug)]
pub enum PlaceError {
    /// Represents a general connection error.
    ///
    /// This error occurs when the WebSocket handshake fails or the stream breaks.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Indicates a failure in serializing or deserializing data.
    ///
    /// This can happen when converting notifications to JSON.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Represents an error in the server configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Socket level failure outside a single session (bind, accept).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Metric registration or encoding failed.
    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),
}

/// Implements conversion from `serde_json::Error` to `PlaceError`.
impl From<serde_json::Error> for PlaceError {
    fn from(err: serde_json::Error) -> Self {
        PlaceError::SerializationError(err.to_string())
    }
}

impl From<config::ConfigError> for PlaceError {
    fn from(err: config::ConfigError) -> Self {
        PlaceError::ConfigurationError(err.to_string())
    }
}

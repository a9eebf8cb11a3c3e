//! Error types for the Cups room client.

use thiserror::Error;

/// Failure to convert between typed messages and text frames.
///
/// Always per-message: the session logs and drops inbound payloads, and
/// reports outbound failures to the caller.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A command could not be serialized
    #[error("Failed to encode command: {0}")]
    Encode(String),

    /// Payload is not JSON, not an object, or its payload shape does not match its kind
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The `kind` tag is not one of the known message kinds
    #[error("Unknown message kind '{0}'")]
    UnknownMessageKind(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedPayload(e.to_string())
    }
}

/// Transport level failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established
    #[error("Connection error: {0}")]
    Connect(String),

    /// A frame could not be written
    #[error("Send error: {0}")]
    Send(String),

    /// The peer is gone
    #[error("Connection closed")]
    Closed,
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `APP_ENVIRONMENT` holds something other than `local` or `production`
    #[error("'{0}' is not a supported environment. Use either `local` or `production`.")]
    InvalidEnvironment(String),

    /// `APP_PORT` is not a valid port number
    #[error("'{0}' is not a valid port number")]
    InvalidPort(String),
}

/// Client-facing errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// A command was issued while no connection is open
    #[error("Not connected to the room")]
    NotConnected,

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

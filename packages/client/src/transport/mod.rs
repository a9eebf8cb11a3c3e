//! Transport abstraction for the room connection.
//!
//! ## Responsibilities
//!
//! - `Connector`: opens one duplex text-frame stream to an endpoint
//! - `Transport`: writes frames and yields inbound events in arrival order
//!
//! ## Implementations
//!
//! - `websocket`: tokio-tungstenite client
//! - `memory`: in-process channel pair, used by tests and embedders

pub mod memory;
pub mod websocket;

use async_trait::async_trait;

use crate::error::TransportError;

pub use memory::{MemoryConnector, MemoryServer};
pub use websocket::WebSocketConnector;

/// What the transport delivers to the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One text frame
    Text(String),
    /// The peer closed the stream
    Closed,
    /// The stream broke
    Failed(String),
}

/// Opens connections
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError>;
}

/// An open duplex stream of text frames.
///
/// `next_event` must be cancel-safe: the connection driver races it against
/// outbound frames and the shutdown signal.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, payload: String) -> Result<(), TransportError>;

    /// Wait for the next inbound event. After `Closed`/`Failed` the stream is done.
    async fn next_event(&mut self) -> TransportEvent;

    /// Close the stream gracefully; errors are ignored
    async fn close(&mut self);
}

//! Cups room client.
//!
//! Keeps one participant's session with a Cups room: the connection is
//! opened lazily while the snapshot is observed, inbound messages are folded
//! into an immutable `SessionSnapshot`, and typed commands are sent over the
//! open connection.
//!
//! - `codec`: JSON wire format for commands and inbound messages
//! - `connection`: per-activation connection handle and driver task
//! - `projector`: pure snapshot reducer
//! - `session`: observers, lazy activation and the command façade
//! - `cli`: the interactive `cups-client` front end

pub mod cli;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod projector;
pub mod protocol;
pub mod session;
pub mod snapshot;
pub mod transport;

mod store;

pub use config::{ClientConfig, Environment};
pub use connection::ConnectionState;
pub use error::{ClientError, CodecError, ConfigError, TransportError};
pub use session::{PublicationObserver, Session, SnapshotObserver};
pub use snapshot::{ConnectionStatus, CupTally, SessionSnapshot};

//! In-process transport backed by tokio channels.
//!
//! `MemoryConnector` is handed to a session; the matching `MemoryServer`
//! accepts each connection as a `MemoryPeer` that plays the server side.
//!
//! ```ignore
//! let (connector, mut server) = MemoryConnector::new();
//! let session = Session::with_connector(Arc::new(connector), url, "math", ConnectionType::Student);
//! let _observer = session.subscribe();
//! let mut peer = server.accept().await.unwrap();
//! let handshake = peer.recv().await.unwrap();
//! peer.send_text(r#"{"kind":"Ok"}"#);
//! ```

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Connector, Transport, TransportEvent};
use crate::error::TransportError;

/// Client end of an in-memory connection
pub struct MemoryTransport {
    outgoing: Option<mpsc::UnboundedSender<String>>,
    incoming: mpsc::UnboundedReceiver<TransportEvent>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&mut self, payload: String) -> Result<(), TransportError> {
        let outgoing = self.outgoing.as_ref().ok_or(TransportError::Closed)?;
        outgoing.send(payload).map_err(|_| TransportError::Closed)
    }

    async fn next_event(&mut self) -> TransportEvent {
        self.incoming.recv().await.unwrap_or(TransportEvent::Closed)
    }

    async fn close(&mut self) {
        self.outgoing = None;
    }
}

/// Server end of an in-memory connection
pub struct MemoryPeer {
    url: String,
    to_client: mpsc::UnboundedSender<TransportEvent>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MemoryPeer {
    /// URL the client connected to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Push one text frame to the client; false once the client is gone
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.to_client
            .send(TransportEvent::Text(text.into()))
            .is_ok()
    }

    /// Close from the server side
    pub fn close(&self) -> bool {
        self.to_client.send(TransportEvent::Closed).is_ok()
    }

    /// Break the stream with a transport error
    pub fn fail(&self, reason: impl Into<String>) -> bool {
        self.to_client
            .send(TransportEvent::Failed(reason.into()))
            .is_ok()
    }

    /// Next frame written by the client; `None` once the client closed
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Frame written by the client, without waiting
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }
}

/// Accepts connections made through the paired `MemoryConnector`
pub struct MemoryServer {
    accepted: mpsc::UnboundedReceiver<MemoryPeer>,
    attempts: Arc<AtomicUsize>,
    refusing: Arc<AtomicBool>,
}

impl MemoryServer {
    /// Wait for the next connection
    pub async fn accept(&mut self) -> Option<MemoryPeer> {
        self.accepted.recv().await
    }

    /// Connection accepted so far but not yet taken, without waiting
    pub fn try_accept(&mut self) -> Option<MemoryPeer> {
        self.accepted.try_recv().ok()
    }

    /// Number of `connect` calls seen by the connector, refused ones included
    pub fn connect_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Make further `connect` calls fail
    pub fn refuse_connections(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }
}

/// Connector producing `MemoryTransport`s
pub struct MemoryConnector {
    accepted: mpsc::UnboundedSender<MemoryPeer>,
    attempts: Arc<AtomicUsize>,
    refusing: Arc<AtomicBool>,
}

impl MemoryConnector {
    pub fn new() -> (Self, MemoryServer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let attempts = Arc::new(AtomicUsize::new(0));
        let refusing = Arc::new(AtomicBool::new(false));
        let connector = Self {
            accepted: tx,
            attempts: attempts.clone(),
            refusing: refusing.clone(),
        };
        let server = MemoryServer {
            accepted: rx,
            attempts,
            refusing,
        };
        (connector, server)
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.refusing.load(Ordering::SeqCst) {
            return Err(TransportError::Connect(format!("{} refused", url)));
        }

        let (to_server, from_client) = mpsc::unbounded_channel();
        let (to_client, incoming) = mpsc::unbounded_channel();
        let peer = MemoryPeer {
            url: url.to_string(),
            to_client,
            from_client,
        };

        self.accepted
            .send(peer)
            .map_err(|_| TransportError::Connect(format!("{} is not listening", url)))?;

        Ok(Box::new(MemoryTransport {
            outgoing: Some(to_server),
            incoming,
        }))
    }
}

//! Connection lifecycle.
//!
//! A `ConnectionHandle` owns one activation of the room connection. Opening
//! it spawns a driver task that connects, writes the `RoomConnect`
//! handshake, then folds inbound frames into the session store in arrival
//! order until the transport ends or the handle is dropped.
//!
//! ```text
//! Opening ──► Open ──► Disconnected
//!    └───────────────────────┘
//! ```
//!
//! `Disconnected` is terminal. A new activation needs a new handle.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use futures_util::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::Instrument;

use crate::{
    codec,
    error::ClientError,
    projector::LifecycleMarker,
    protocol::Command,
    store::SessionStore,
    transport::{Connector, Transport, TransportEvent},
};

/// State of one connection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Opening,
    Open,
    Disconnected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Opening => "opening",
            ConnectionState::Open => "open",
            ConnectionState::Disconnected => "disconnected",
        }
    }

    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        matches!(
            (self, next),
            (ConnectionState::Opening, ConnectionState::Open)
                | (ConnectionState::Opening, ConnectionState::Disconnected)
                | (ConnectionState::Open, ConnectionState::Disconnected)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One activation of the room connection.
///
/// Dropping the handle stops the driver and retires its epoch, which
/// publishes `Closed` unless a newer activation already took over.
pub(crate) struct ConnectionHandle {
    epoch: u64,
    state: watch::Receiver<ConnectionState>,
    /// Set once the handle reached `Open`; survives the move to `Disconnected`
    opened: Arc<AtomicBool>,
    outbound: mpsc::UnboundedSender<String>,
    shutdown: Option<oneshot::Sender<()>>,
    store: Arc<SessionStore>,
}

impl ConnectionHandle {
    /// Start connecting to `url` on `runtime`
    pub(crate) fn open(
        runtime: &tokio::runtime::Handle,
        store: Arc<SessionStore>,
        connector: Arc<dyn Connector>,
        url: String,
        handshake: Command,
    ) -> Self {
        let epoch = store.activate();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Opening);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let opened = Arc::new(AtomicBool::new(false));

        let room = store.current().room_name().to_string();
        let driver = Driver {
            epoch,
            store: store.clone(),
            state: state_tx,
            opened: opened.clone(),
        };
        let span = tracing::info_span!("connection", room = %room, epoch);
        runtime.spawn(
            driver
                .run(connector, url, handshake, outbound_rx, shutdown_rx)
                .instrument(span),
        );

        Self {
            epoch,
            state: state_rx,
            opened,
            outbound: outbound_tx,
            shutdown: Some(shutdown_tx),
            store,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Whether this activation ever reached `Open`
    pub(crate) fn has_opened(&self) -> bool {
        self.opened.load(Ordering::SeqCst)
    }

    /// Queue a command for the driver. Fails unless the handle is `Open`.
    pub(crate) fn send(&self, command: &Command) -> Result<(), ClientError> {
        let state = self.state();
        if state != ConnectionState::Open {
            tracing::debug!(
                "Rejecting {} while the connection is {}",
                command.task(),
                state
            );
            return Err(ClientError::NotConnected);
        }

        let payload = codec::encode(command)?;
        self.outbound
            .send(payload)
            .map_err(|_| ClientError::NotConnected)
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // Err means the driver already finished
            let _ = shutdown.send(());
        }
        self.store.retire(self.epoch);
        tracing::debug!("Connection handle (epoch {}) released", self.epoch);
    }
}

/// State owned by the driver task
struct Driver {
    epoch: u64,
    store: Arc<SessionStore>,
    state: watch::Sender<ConnectionState>,
    opened: Arc<AtomicBool>,
}

impl Driver {
    async fn run(
        mut self,
        connector: Arc<dyn Connector>,
        url: String,
        handshake: Command,
        mut outbound: mpsc::UnboundedReceiver<String>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        tracing::info!("Connecting to {}", url);

        let connected = tokio::select! {
            result = connector.connect(&url) => result,
            _ = &mut shutdown => {
                tracing::info!("Connection cancelled before it opened");
                self.finish();
                return;
            }
        };

        let mut transport = match connected {
            Ok(transport) => transport,
            Err(e) => {
                tracing::warn!("Failed to connect to {}: {}", url, e);
                self.finish();
                return;
            }
        };

        if !self.discard_early_frames(&mut *transport) {
            self.finish();
            return;
        }

        let handshake = match codec::encode(&handshake) {
            Ok(handshake) => handshake,
            Err(e) => {
                tracing::warn!("Failed to encode the room handshake: {}", e);
                transport.close().await;
                self.finish();
                return;
            }
        };
        if let Err(e) = transport.send(handshake).await {
            tracing::warn!("Failed to send the room handshake: {}", e);
            transport.close().await;
            self.finish();
            return;
        }
        self.on_open();

        self.pump(&mut *transport, &mut outbound, &mut shutdown).await;
        self.finish();
    }

    /// Drop frames the server pushed before the handshake.
    ///
    /// Returns false when the stream already ended.
    fn discard_early_frames(&self, transport: &mut dyn Transport) -> bool {
        while let Some(event) = transport.next_event().now_or_never() {
            match event {
                TransportEvent::Text(text) => {
                    tracing::warn!("Ignoring payload received before the handshake: {}", text);
                }
                TransportEvent::Closed => {
                    tracing::info!("Connection closed before the handshake");
                    return false;
                }
                TransportEvent::Failed(reason) => {
                    tracing::warn!("Connection failed before the handshake: {}", reason);
                    return false;
                }
            }
        }
        true
    }

    async fn pump(
        &mut self,
        transport: &mut dyn Transport,
        outbound: &mut mpsc::UnboundedReceiver<String>,
        shutdown: &mut oneshot::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                _ = &mut *shutdown => {
                    tracing::info!("Closing the connection");
                    transport.close().await;
                    return;
                }
                frame = outbound.recv() => {
                    let Some(payload) = frame else {
                        // Handle gone without a shutdown signal
                        transport.close().await;
                        return;
                    };
                    tracing::debug!("Sending: {}", payload);
                    if let Err(e) = transport.send(payload).await {
                        tracing::warn!("Failed to send frame: {}", e);
                        transport.close().await;
                        return;
                    }
                }
                event = transport.next_event() => match event {
                    TransportEvent::Text(text) => self.on_text(&text),
                    TransportEvent::Closed => {
                        tracing::info!("Connection closed by the server");
                        return;
                    }
                    TransportEvent::Failed(reason) => {
                        tracing::warn!("Connection failed: {}", reason);
                        return;
                    }
                },
            }
        }
    }

    fn transition(&mut self, next: ConnectionState) -> bool {
        let current = *self.state.borrow();
        if !current.can_transition_to(next) {
            tracing::debug!("Ignoring transition {} -> {}", current, next);
            return false;
        }
        tracing::info!("Connection {} -> {}", current, next);
        self.state.send_replace(next);
        true
    }

    fn on_open(&mut self) {
        if self.transition(ConnectionState::Open) {
            self.opened.store(true, Ordering::SeqCst);
            self.store.mark(self.epoch, LifecycleMarker::Started);
        }
    }

    fn on_text(&mut self, text: &str) {
        tracing::debug!("Received: {}", text);

        match codec::decode(text) {
            Ok(message) => {
                let kind = message.kind();
                if !self.store.receive(self.epoch, message) {
                    tracing::debug!("Dropping {} from a retired connection", kind.as_str());
                }
            }
            Err(e) => tracing::warn!("Dropping inbound payload: {}", e),
        }
    }

    fn finish(&mut self) {
        if self.transition(ConnectionState::Disconnected) {
            self.store.mark(self.epoch, LifecycleMarker::Closed);
        }
    }
}

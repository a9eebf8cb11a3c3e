//! WebSocket transport built on tokio-tungstenite.
//!
//! `wss://` endpoints go through rustls with the webpki root store.

use std::sync::Once;

use async_trait::async_trait;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use super::{Connector, Transport, TransportEvent};
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

static CRYPTO_PROVIDER: Once = Once::new();

/// Install ring as the process-wide rustls provider unless one is already set
fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            tracing::debug!("A rustls crypto provider is already installed");
        }
    });
}

/// Connects with `connect_async`
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        install_crypto_provider();

        let (ws_stream, response) = connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(
            "WebSocket handshake with {} completed ({})",
            url,
            response.status()
        );

        let (write, read) = ws_stream.split();
        Ok(Box::new(WebSocketTransport { write, read }))
    }
}

/// Split halves of one tungstenite stream
pub struct WebSocketTransport {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, payload: String) -> Result<(), TransportError> {
        self.write
            .send(Message::Text(payload.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn next_event(&mut self) -> TransportEvent {
        while let Some(message) = self.read.next().await {
            match message {
                Ok(Message::Text(text)) => return TransportEvent::Text(text.to_string()),
                Ok(Message::Binary(data)) => {
                    tracing::warn!("Ignoring {} bytes of binary data", data.len());
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!("Server closed the connection: {:?}", frame);
                    return TransportEvent::Closed;
                }
                // tungstenite answers pings itself
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Err(e) => return TransportEvent::Failed(e.to_string()),
            }
        }
        TransportEvent::Closed
    }

    async fn close(&mut self) {
        if let Err(e) = self.write.send(Message::Close(None)).await {
            tracing::debug!("Failed to send close frame: {}", e);
        }
        if let Err(e) = self.write.close().await {
            tracing::debug!("Failed to close WebSocket sink: {}", e);
        }
    }
}

//! WebSocket connection to the agent.
//!
//! [`Transport`] wraps one open client socket. It knows nothing about
//! frames or session state: it writes text, yields inbound text and reports
//! how the socket ended. The session event loop owns at most one transport
//! at a time and replaces it on reconnect.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Types
// ============================================================================

/// Client WebSocket stream.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// What the socket produced next.
#[derive(Debug)]
pub enum Inbound {
    /// One complete text message.
    Text(String),
    /// The peer closed or the stream ended.
    Closed {
        /// Close reason, if the peer gave one.
        reason: Option<String>,
    },
    /// The socket failed. A close always follows.
    Failed(WsError),
}

// ============================================================================
// Transport
// ============================================================================

/// One open WebSocket connection.
pub struct Transport {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

impl Transport {
    /// Opens a socket to `endpoint`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the handshake takes longer than
    ///   `connect_timeout`
    /// - [`Error::WebSocket`] if the connection or handshake fails
    pub async fn open(endpoint: Url, connect_timeout: Duration) -> Result<Self> {
        debug!(%endpoint, "Connecting to agent");

        let (ws_stream, _response) = timeout(connect_timeout, connect_async(endpoint.as_str()))
            .await
            .map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))??;

        Ok(Self::from_stream(ws_stream))
    }

    /// Wraps an already-open stream.
    #[must_use]
    pub fn from_stream(ws_stream: WsStream) -> Self {
        let (sink, stream) = ws_stream.split();
        Self { sink, stream }
    }

    /// Writes one text message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WebSocket`] if the write fails.
    pub async fn send_text(&mut self, text: String) -> Result<()> {
        self.sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Waits for the next text message or the end of the socket.
    ///
    /// Binary, ping and pong messages are skipped. Cancel safe.
    pub async fn next_inbound(&mut self) -> Inbound {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Inbound::Text(text.as_str().to_owned()),
                Some(Ok(Message::Close(frame))) => {
                    return Inbound::Closed {
                        reason: frame.map(|f| f.reason.as_str().to_owned()),
                    };
                }
                Some(Ok(other)) => {
                    trace!(kind = message_kind(&other), "Ignoring non-text message");
                }
                Some(Err(e)) => return Inbound::Failed(e),
                None => return Inbound::Closed { reason: None },
            }
        }
    }

    /// Sends a close frame. Errors are ignored; the socket is going away.
    pub async fn close(&mut self) {
        if let Err(e) = self.sink.close().await {
            debug!(error = %e, "Error while closing socket");
        }
    }
}

/// Short label for a message variant.
fn message_kind(message: &Message) -> &'static str {
    match message {
        Message::Text(_) => "text",
        Message::Binary(_) => "binary",
        Message::Ping(_) => "ping",
        Message::Pong(_) => "pong",
        Message::Close(_) => "close",
        Message::Frame(_) => "frame",
    }
}

// ============================================================================
// Tests
// ============================================================================

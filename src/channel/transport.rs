//! Channel transport
//!
//! The manager treats the transport as an opaque bidirectional text
//! channel: it hands frames to an outbound sender and consumes a stream of
//! lifecycle events. Error and close arrive as independent events, the way
//! the underlying WebSocket contract delivers them.
//!
//! `WsTransport` is the production implementation over tokio-tungstenite;
//! tests substitute their own.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// How a channel ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseKind {
    /// Terminated by an explicit protocol-level close handshake
    Clean,
    /// Terminated any other way (error, reset, silent EOF)
    Unclean,
}

/// Lifecycle events surfaced by a live channel
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A complete inbound text frame
    Frame(String),

    /// Transport-level error; a `Closed` event follows separately
    Error(String),

    /// The channel is gone; terminal
    Closed(CloseKind),
}

/// A live channel produced by a transport.
///
/// Dropping `outbound` closes the underlying connection. `events` ends
/// with a single `Closed` event.
pub struct Channel {
    /// Outbound frame sender
    pub outbound: mpsc::UnboundedSender<String>,

    /// Inbound event stream
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// Factory for channels to a given endpoint
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open a channel to the endpoint
    async fn open(&self, endpoint: &Url) -> Result<Channel>;
}

/// WebSocket transport over tokio-tungstenite
#[derive(Debug, Default)]
pub struct WsTransport;

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, endpoint: &Url) -> Result<Channel> {
        let (ws_stream, _response) = connect_async(endpoint.as_str())
            .await
            .map_err(|e| Error::connection_failed(endpoint.as_str(), e.to_string()))?;

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        // Writer: forward frames until the manager drops the sender, then
        // initiate the close handshake
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if write.send(WsMessage::Text(frame)).await.is_err() {
                    break;
                }
            }
            let _ = write.send(WsMessage::Close(None)).await;
            let _ = write.close().await;
        });

        // Reader: surface frames, errors, and the terminal close
        tokio::spawn(async move {
            let mut saw_close_frame = false;

            while let Some(message) = read.next().await {
                match message {
                    Ok(WsMessage::Text(text)) => {
                        let _ = event_tx.send(ChannelEvent::Frame(text));
                    }
                    Ok(WsMessage::Binary(data)) => match String::from_utf8(data) {
                        Ok(text) => {
                            let _ = event_tx.send(ChannelEvent::Frame(text));
                        }
                        Err(_) => warn!("discarding non-UTF-8 binary frame"),
                    },
                    Ok(WsMessage::Close(frame)) => {
                        debug!(frame = ?frame, "received close frame");
                        saw_close_frame = true;
                    }
                    // Ping/pong is answered by tungstenite itself
                    Ok(_) => {}
                    Err(e) => {
                        if !saw_close_frame {
                            let _ = event_tx.send(ChannelEvent::Error(e.to_string()));
                        }
                        break;
                    }
                }
            }

            let kind = if saw_close_frame {
                CloseKind::Clean
            } else {
                CloseKind::Unclean
            };
            let _ = event_tx.send(ChannelEvent::Closed(kind));
        });

        Ok(Channel {
            outbound: outbound_tx,
            events: event_rx,
        })
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

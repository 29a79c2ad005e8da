//! Outbound socket capability
//!
//! The liveness core never owns the WebSocket. It is handed something that
//! can send a serialized envelope, in order, and reports transport failures.

use async_trait::async_trait;
use futures_util::{Sink, SinkExt};
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::{self, Message};

/// Transport error type
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection (or its writer task) is gone
    #[error("Connection closed")]
    Closed,

    /// The WebSocket layer rejected the frame
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}

/// Something that can write text frames to the gateway
///
/// Implementations must deliver frames in the order `send` was called.
#[async_trait]
pub trait OutboundSocket: Send + Sync {
    /// Send one serialized envelope
    async fn send(&self, frame: String) -> Result<(), TransportError>;
}

/// Socket backed by an mpsc channel
///
/// The receiving half is drained by whatever task owns the WebSocket write half.
#[derive(Debug, Clone)]
pub struct ChannelSocket {
    sender: mpsc::Sender<String>,
}

impl ChannelSocket {
    /// Create a socket and the receiver its frames arrive on
    #[must_use]
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (Self { sender }, receiver)
    }

    /// Check if the receiving side has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[async_trait]
impl OutboundSocket for ChannelSocket {
    async fn send(&self, frame: String) -> Result<(), TransportError> {
        self.sender.send(frame).await.map_err(|_| TransportError::Closed)
    }
}

/// Socket writing straight into a WebSocket sink
///
/// Usually the write half of a split `tokio-tungstenite` stream.
pub struct WebSocketSink<S> {
    sink: Mutex<S>,
}

impl<S> WebSocketSink<S>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin + Send,
{
    #[must_use]
    pub fn new(sink: S) -> Self {
        Self {
            sink: Mutex::new(sink),
        }
    }
}

#[async_trait]
impl<S> OutboundSocket for WebSocketSink<S>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin + Send,
{
    async fn send(&self, frame: String) -> Result<(), TransportError> {
        let mut sink = self.sink.lock().await;
        match sink.send(Message::text(frame)).await {
            Ok(()) => Ok(()),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Err(TransportError::Closed)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<S> std::fmt::Debug for WebSocketSink<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketSink").finish_non_exhaustive()
    }
}

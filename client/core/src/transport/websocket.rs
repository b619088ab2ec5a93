//! WebSocket Transport
//!
//! Drives a real connection to the backend's streaming endpoint with
//! `tokio-tungstenite`. One driver task per connection owns both halves of
//! the socket: outbound frames come from the session's channel, inbound
//! text frames are reported through the [`SignalSink`].
//!
//! Binary frames are not part of the protocol and are dropped. Ping/pong is
//! answered by tungstenite itself; there is no application heartbeat.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use super::traits::{SignalSink, StreamTransport, TransportSignal};

/// WebSocket implementation of [`StreamTransport`]
#[derive(Clone, Debug, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Create a new WebSocket transport
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamTransport for WebSocketTransport {
    async fn run(&self, endpoint: String, mut outbound: mpsc::Receiver<String>, signals: SignalSink) {
        let (socket, _response) = match tokio_tungstenite::connect_async(endpoint.as_str()).await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::warn!(endpoint = %endpoint, error = %e, "WebSocket handshake failed");
                signals.emit(TransportSignal::Failed(e.to_string()));
                signals.emit(TransportSignal::Closed);
                return;
            }
        };

        tracing::info!(endpoint = %endpoint, epoch = signals.epoch(), "WebSocket connected");
        signals.emit(TransportSignal::Opened);

        let (mut write, mut read) = socket.split();

        loop {
            tokio::select! {
                frame = outbound.recv() => match frame {
                    Some(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::warn!(error = %e, "WebSocket write failed");
                            signals.emit(TransportSignal::Failed(e.to_string()));
                            break;
                        }
                    }
                    None => {
                        // Session dropped its sender: close our side.
                        let _ = write.close().await;
                        break;
                    }
                },
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        if !signals.emit(TransportSignal::Frame(text)) {
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(data))) => {
                        tracing::debug!(len = data.len(), "Dropping binary frame");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(?frame, "Server closed the stream");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "WebSocket read failed");
                        signals.emit(TransportSignal::Failed(e.to_string()));
                        break;
                    }
                    None => break,
                },
            }
        }

        signals.emit(TransportSignal::Closed);
        tracing::info!(endpoint = %endpoint, "WebSocket disconnected");
    }
}

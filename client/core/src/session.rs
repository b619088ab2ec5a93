//! Streaming Session Client
//!
//! Owns the one live connection to a conversation's streaming endpoint.
//!
//! # Connection State
//!
//! ```text
//!            connect(id)                Opened
//!   Closed ─────────────▶ Connecting ─────────▶ Open
//!     ▲                       │                   │
//!     └────── Closed / Failed ┴───── Closed ──────┘
//! ```
//!
//! `send` while `Connecting` queues the message; the queue is flushed in
//! FIFO order when the transport reports `Opened`. `send` with no
//! connection at all, or on a closed one, synthesizes an `error` event
//! instead of failing the call.
//!
//! # Stale Connections
//!
//! Every `connect` starts a new epoch. The previous driver is aborted and
//! anything it already queued on the signal channel carries the old epoch,
//! so it is discarded in [`SessionClient::next_signal`]. Locally
//! synthesized errors that were not yet delivered are dropped on
//! disconnect as well. A replaced conversation can never leak events into
//! the new one.
//!
//! # Runtime
//!
//! `connect` spawns the transport driver and therefore must be called from
//! inside a Tokio runtime.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::{SessionSignal, StreamEvent, CONNECTION_FAILED, NOT_CONNECTED, NOT_INITIALIZED};
use crate::messages::{ConversationId, OutboundMessage};
use crate::transport::traits::{SignalEnvelope, SignalSink, StreamTransport, TransportSignal};
use crate::transport::TransportConfig;

/// Error text synthesized when the outbound buffer is full
pub const SEND_BUFFER_FULL: &str = "WebSocket send buffer full";

/// Lifecycle of the current connection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No usable connection
    Closed,
    /// Handshake in progress; sends are queued
    Connecting,
    /// Frames flow in both directions
    Open,
}

/// What happened to a message handed to [`SessionClient::send`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// Written to the transport
    Sent,
    /// Held until the connection opens
    Queued,
    /// Not sent; an `error` event was synthesized
    Rejected,
}

/// The live connection and its driver
struct ActiveConnection {
    conversation_id: ConversationId,
    state: ConnectionState,
    outbound: mpsc::Sender<String>,
    driver: JoinHandle<()>,
}

/// Client for one conversation's streaming endpoint at a time
pub struct SessionClient {
    transport: Arc<dyn StreamTransport>,
    config: TransportConfig,
    connection: Option<ActiveConnection>,
    /// Messages sent while connecting, oldest first
    queue: VecDeque<OutboundMessage>,
    /// Events synthesized locally, delivered before transport signals
    local: VecDeque<StreamEvent>,
    epoch: u64,
    signal_tx: mpsc::UnboundedSender<SignalEnvelope>,
    signal_rx: mpsc::UnboundedReceiver<SignalEnvelope>,
}

impl SessionClient {
    /// Create a client with no connection
    pub fn new(transport: Arc<dyn StreamTransport>, config: TransportConfig) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            config,
            connection: None,
            queue: VecDeque::new(),
            local: VecDeque::new(),
            epoch: 0,
            signal_tx,
            signal_rx,
        }
    }

    /// Open a connection for `conversation_id`, replacing any existing one
    pub fn connect(&mut self, conversation_id: ConversationId) {
        self.disconnect();

        let endpoint = match self.config.endpoint(conversation_id.as_str()) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(conversation_id = %conversation_id, error = %e, "Cannot build stream endpoint");
                self.local.push_back(StreamEvent::error(CONNECTION_FAILED));
                return;
            }
        };

        let (outbound_tx, outbound_rx) = mpsc::channel(self.config.outbound_capacity.max(1));
        let sink = SignalSink::new(self.epoch, self.signal_tx.clone());
        let transport = Arc::clone(&self.transport);
        let driver_endpoint = endpoint.clone();
        let driver = tokio::spawn(async move {
            transport.run(driver_endpoint, outbound_rx, sink).await;
        });

        tracing::info!(
            conversation_id = %conversation_id,
            epoch = self.epoch,
            endpoint = %endpoint,
            "Connecting stream"
        );

        self.connection = Some(ActiveConnection {
            conversation_id,
            state: ConnectionState::Connecting,
            outbound: outbound_tx,
            driver,
        });
    }

    /// Send a chat message
    ///
    /// Never fails: problems are reported as `error` events on the signal
    /// stream.
    pub fn send(&mut self, message: OutboundMessage) -> SendOutcome {
        let Some(connection) = self.connection.as_ref() else {
            self.local.push_back(StreamEvent::error(NOT_INITIALIZED));
            return SendOutcome::Rejected;
        };

        match connection.state {
            ConnectionState::Connecting => {
                self.queue.push_back(message);
                tracing::debug!(queued = self.queue.len(), "Queued message until stream opens");
                SendOutcome::Queued
            }
            ConnectionState::Closed => {
                self.local.push_back(StreamEvent::error(NOT_CONNECTED));
                SendOutcome::Rejected
            }
            ConnectionState::Open => self.transmit(&message),
        }
    }

    fn transmit(&mut self, message: &OutboundMessage) -> SendOutcome {
        let Some(connection) = self.connection.as_ref() else {
            self.local.push_back(StreamEvent::error(NOT_INITIALIZED));
            return SendOutcome::Rejected;
        };

        let frame = match message.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                self.local.push_back(StreamEvent::error(format!("Failed to encode message: {e}")));
                return SendOutcome::Rejected;
            }
        };

        match connection.outbound.try_send(frame) {
            Ok(()) => SendOutcome::Sent,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Outbound buffer full, dropping message");
                self.local.push_back(StreamEvent::error(SEND_BUFFER_FULL));
                SendOutcome::Rejected
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.local.push_back(StreamEvent::error(NOT_CONNECTED));
                SendOutcome::Rejected
            }
        }
    }

    /// Close the connection, if any; idempotent
    pub fn disconnect(&mut self) {
        // New epoch: nothing already in flight from the old driver is accepted.
        self.epoch += 1;
        self.queue.clear();
        self.local.clear();

        if let Some(connection) = self.connection.take() {
            connection.driver.abort();
            tracing::info!(conversation_id = %connection.conversation_id, "Stream disconnected");
        }
    }

    /// Wait for the next signal from the current connection
    ///
    /// Cancel-safe. Returns `None` only if the signal channel is closed,
    /// which cannot happen while the client is alive.
    pub async fn next_signal(&mut self) -> Option<SessionSignal> {
        loop {
            if let Some(event) = self.local.pop_front() {
                return Some(SessionSignal::Event(event));
            }

            let envelope = self.signal_rx.recv().await?;
            if let Some(signal) = self.accept(envelope) {
                return Some(signal);
            }
        }
    }

    /// Take the next already-delivered signal without waiting
    pub fn try_next_signal(&mut self) -> Option<SessionSignal> {
        loop {
            if let Some(event) = self.local.pop_front() {
                return Some(SessionSignal::Event(event));
            }

            let envelope = self.signal_rx.try_recv().ok()?;
            if let Some(signal) = self.accept(envelope) {
                return Some(signal);
            }
        }
    }

    /// Apply a transport signal to the connection state
    fn accept(&mut self, envelope: SignalEnvelope) -> Option<SessionSignal> {
        if envelope.epoch != self.epoch || self.connection.is_none() {
            tracing::debug!(
                epoch = envelope.epoch,
                current = self.epoch,
                "Discarding signal from a replaced connection"
            );
            return None;
        }

        match envelope.signal {
            TransportSignal::Opened => {
                self.set_state(ConnectionState::Open);
                self.flush_queue();
                Some(SessionSignal::Opened)
            }
            TransportSignal::Frame(text) => StreamEvent::decode(&text).map(SessionSignal::Event),
            TransportSignal::Failed(reason) => {
                tracing::warn!(reason = %reason, "Stream transport failed");
                Some(SessionSignal::Event(StreamEvent::error(CONNECTION_FAILED)))
            }
            TransportSignal::Closed => {
                self.set_state(ConnectionState::Closed);
                if !self.queue.is_empty() {
                    tracing::debug!(dropped = self.queue.len(), "Stream closed before opening");
                    self.queue.clear();
                }
                Some(SessionSignal::Closed)
            }
        }
    }

    fn set_state(&mut self, state: ConnectionState) {
        if let Some(connection) = self.connection.as_mut() {
            connection.state = state;
        }
    }

    fn flush_queue(&mut self) {
        if !self.queue.is_empty() {
            tracing::debug!(queued = self.queue.len(), "Flushing queued messages");
        }
        while let Some(message) = self.queue.pop_front() {
            self.send(message);
        }
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection
            .as_ref()
            .map_or(ConnectionState::Closed, |c| c.state)
    }

    /// Whether frames can be written right now
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Whether a connection exists (in any state)
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// Conversation the current connection belongs to
    #[must_use]
    pub fn conversation_id(&self) -> Option<&ConversationId> {
        self.connection.as_ref().map(|c| &c.conversation_id)
    }

    /// Messages waiting for the connection to open
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Epoch of the current (or next) connection
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.driver.abort();
        }
    }
}

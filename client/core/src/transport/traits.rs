//! Transport Traits
//!
//! A [`StreamTransport`] drives exactly one connection to a streaming
//! endpoint. The session spawns it, hands it the receiving end of the
//! outbound frame channel, and listens on the other side of a
//! [`SignalSink`] for open/frame/close notifications.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur during transport operations
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection was closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// Endpoint could not be derived from the configured server URL
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Notification from a transport driver to its session
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportSignal {
    /// Handshake finished; frames can flow
    Opened,
    /// A text frame arrived
    Frame(String),
    /// The connection failed or errored
    Failed(String),
    /// The connection is gone; no further signals follow
    Closed,
}

/// A signal stamped with the epoch of the connection that produced it
#[derive(Debug)]
pub(crate) struct SignalEnvelope {
    pub(crate) epoch: u64,
    pub(crate) signal: TransportSignal,
}

/// Where a transport driver reports what happens on its connection
///
/// Every signal is stamped with the connection epoch so the session can
/// discard anything emitted by a connection it has already replaced.
#[derive(Clone, Debug)]
pub struct SignalSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<SignalEnvelope>,
}

impl SignalSink {
    pub(crate) fn new(epoch: u64, tx: mpsc::UnboundedSender<SignalEnvelope>) -> Self {
        Self { epoch, tx }
    }

    /// Epoch of the connection this sink belongs to
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Report a signal; returns `false` once the session is gone
    pub fn emit(&self, signal: TransportSignal) -> bool {
        self.tx
            .send(SignalEnvelope {
                epoch: self.epoch,
                signal,
            })
            .is_ok()
    }
}

/// Driver for one streaming connection
///
/// `run` opens a connection to `endpoint`, emits [`TransportSignal::Opened`]
/// once the handshake completes, forwards every frame received on
/// `outbound` to the peer, reports inbound text frames as
/// [`TransportSignal::Frame`], and finishes with [`TransportSignal::Closed`].
/// A failed handshake emits [`TransportSignal::Failed`] then `Closed`.
///
/// When the session drops the outbound sender the driver should close the
/// connection and return. The session may also abort the driver task at
/// any await point.
#[async_trait]
pub trait StreamTransport: Send + Sync + 'static {
    /// Drive one connection until it closes
    async fn run(&self, endpoint: String, outbound: mpsc::Receiver<String>, signals: SignalSink);
}

//! In-Process Transport
//!
//! Channel-based stand-in for the streaming endpoint. The session side gets
//! an [`InProcessTransport`]; whoever plays the backend (an embedded server,
//! a test) holds the matching [`InProcessServer`] and decides when each
//! connection attempt is accepted, what frames it receives, and when it
//! closes.
//!
//! # Usage
//!
//! ```ignore
//! let (transport, mut server) = InProcessTransport::new_pair();
//! let mut session = SessionClient::new(Arc::new(transport), TransportConfig::default());
//!
//! session.connect("c1".into());
//! let mut conn = server.accept().await.unwrap();
//! assert!(conn.endpoint().ends_with("/ws/chat/c1"));
//!
//! conn.open();
//! conn.send(r#"{"type":"done"}"#).await?;
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::traits::{SignalSink, StreamTransport, TransportError, TransportSignal};

/// Client half of an in-process transport pair
pub struct InProcessTransport {
    /// Connection attempts handed to the server half
    incoming: mpsc::Sender<InProcessConnection>,
    /// Drivers currently running
    live: Arc<AtomicUsize>,
    /// Capacity of the server-to-client frame channel
    capacity: usize,
}

impl InProcessTransport {
    /// Create a transport and the server half that receives its connections
    #[must_use]
    pub fn new_pair() -> (Self, InProcessServer) {
        Self::new_pair_with_capacity(100)
    }

    /// Create with custom channel capacity
    #[must_use]
    pub fn new_pair_with_capacity(capacity: usize) -> (Self, InProcessServer) {
        let (incoming_tx, incoming_rx) = mpsc::channel(capacity);
        let live = Arc::new(AtomicUsize::new(0));

        let transport = Self {
            incoming: incoming_tx,
            live: Arc::clone(&live),
            capacity,
        };
        let server = InProcessServer {
            incoming: incoming_rx,
            live,
        };

        (transport, server)
    }
}

/// Decrements the live-driver count when the driver future is dropped,
/// including when its task is aborted.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn new(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(live))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StreamTransport for InProcessTransport {
    async fn run(&self, endpoint: String, outbound: mpsc::Receiver<String>, signals: SignalSink) {
        let _live = LiveGuard::new(&self.live);

        let (to_client_tx, mut to_client_rx) = mpsc::channel(self.capacity);
        let (open_tx, open_rx) = oneshot::channel();

        let connection = InProcessConnection {
            endpoint,
            epoch: signals.epoch(),
            open: Some(open_tx),
            from_client: outbound,
            to_client: to_client_tx,
        };

        if self.incoming.send(connection).await.is_err() {
            signals.emit(TransportSignal::Failed(
                "no in-process server listening".to_string(),
            ));
            signals.emit(TransportSignal::Closed);
            return;
        }

        if open_rx.await.is_err() {
            signals.emit(TransportSignal::Failed("connection refused".to_string()));
            signals.emit(TransportSignal::Closed);
            return;
        }

        signals.emit(TransportSignal::Opened);

        while let Some(frame) = to_client_rx.recv().await {
            if !signals.emit(TransportSignal::Frame(frame)) {
                return;
            }
        }

        signals.emit(TransportSignal::Closed);
    }
}

/// Server half of an in-process transport pair
pub struct InProcessServer {
    incoming: mpsc::Receiver<InProcessConnection>,
    live: Arc<AtomicUsize>,
}

impl InProcessServer {
    /// Wait for the next connection attempt
    ///
    /// Returns `None` once the client half has been dropped.
    pub async fn accept(&mut self) -> Option<InProcessConnection> {
        self.incoming.recv().await
    }

    /// Take a pending connection attempt without waiting
    pub fn try_accept(&mut self) -> Option<InProcessConnection> {
        self.incoming.try_recv().ok()
    }

    /// Number of transport drivers currently running on the client side
    #[must_use]
    pub fn live_connections(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// One connection as seen from the server side
///
/// Dropping it closes the connection; dropping it before [`open`](Self::open)
/// refuses the handshake.
pub struct InProcessConnection {
    endpoint: String,
    epoch: u64,
    open: Option<oneshot::Sender<()>>,
    from_client: mpsc::Receiver<String>,
    to_client: mpsc::Sender<String>,
}

impl InProcessConnection {
    /// Endpoint the client dialed
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Session epoch of the dialing connection
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Complete the handshake; idempotent
    pub fn open(&mut self) {
        if let Some(open) = self.open.take() {
            let _ = open.send(());
        }
    }

    /// Refuse the handshake
    pub fn reject(self) {
        drop(self);
    }

    /// Push a text frame to the client
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionClosed`] once the client side
    /// has gone away.
    pub async fn send(&self, frame: impl Into<String>) -> Result<(), TransportError> {
        self.to_client
            .send(frame.into())
            .await
            .map_err(|_| TransportError::ConnectionClosed)
    }

    /// Receive the next frame the client wrote
    ///
    /// Returns `None` once the client has disconnected.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Take a frame the client already wrote, without waiting
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }
}

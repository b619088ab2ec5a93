//! Transport Layer for the Streaming Endpoint
//!
//! Provides abstraction over how a session reaches `/ws/chat/{id}`:
//! - `WebSocket`: the real backend (feature `websocket`, on by default)
//! - `InProcess`: channel pair for embedded backends and tests
//!
//! # Design Philosophy
//!
//! The transport layer separates the wire from the session logic. A driver
//! only moves text frames and reports open/close; queueing, decoding and
//! stale-connection filtering all live in
//! [`SessionClient`](crate::session::SessionClient).

pub mod config;
pub mod in_process;
pub mod traits;
#[cfg(feature = "websocket")]
pub mod websocket;

// Re-exports for convenience
pub use config::{default_server_url, TransportConfig, DEFAULT_OUTBOUND_CAPACITY};
pub use in_process::{InProcessConnection, InProcessServer, InProcessTransport};
pub use traits::{SignalSink, StreamTransport, TransportError, TransportSignal};

#[cfg(feature = "websocket")]
pub use websocket::WebSocketTransport;

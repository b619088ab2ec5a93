//! Transport Configuration
//!
//! Where the streaming endpoint lives and how much outbound buffering a
//! connection gets.

use reqwest::Url;

use super::traits::TransportError;

/// Default capacity of the per-connection outbound frame channel
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;

/// Backend address used when nothing is configured
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Path prefix of the per-conversation streaming endpoint
const STREAM_PATH: [&str; 2] = ["ws", "chat"];

/// Transport configuration
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Backend base URL (`http` or `https`)
    pub server_url: Url,

    /// Outbound frames buffered per connection before sends are rejected
    pub outbound_capacity: usize,
}

impl TransportConfig {
    /// Create a configuration for the given backend
    #[must_use]
    pub fn new(server_url: Url) -> Self {
        Self {
            server_url,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }

    /// Streaming endpoint for a conversation
    ///
    /// The socket scheme follows the server scheme: `https` becomes `wss`,
    /// anything else `ws`. Any path on the base URL is kept as a prefix.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidEndpoint`] if the base URL cannot
    /// carry a path (e.g. `mailto:`).
    pub fn endpoint(&self, conversation_id: &str) -> Result<String, TransportError> {
        let mut url = self.server_url.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme).map_err(|()| {
            TransportError::InvalidEndpoint(format!("cannot use {scheme} with {}", self.server_url))
        })?;

        url.path_segments_mut()
            .map_err(|()| {
                TransportError::InvalidEndpoint(format!("{} cannot be a base", self.server_url))
            })?
            .pop_if_empty()
            .extend(STREAM_PATH)
            .push(conversation_id);

        url.set_query(None);
        url.set_fragment(None);
        Ok(url.to_string())
    }
}

/// Parsed [`DEFAULT_SERVER_URL`]
#[must_use]
pub fn default_server_url() -> Url {
    Url::parse(DEFAULT_SERVER_URL).expect("DEFAULT_SERVER_URL is an absolute URL")
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new(default_server_url())
    }
}

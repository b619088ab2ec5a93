//! Stream Events
//!
//! Events pushed by the backend over the streaming endpoint, plus the
//! session-level signals a [`SessionClient`](crate::session::SessionClient)
//! surfaces to its owner.
//!
//! # Event Ordering
//!
//! Within one response the backend sends, per agent turn:
//!
//! ```text
//! agent_turn_start → (chunk | tool_call | tool_result)* → agent_turn_end
//! ```
//!
//! A group response contains several turns. `done` ends the whole response;
//! `error` may arrive at any point and also ends it.
//!
//! # Decoding Policy
//!
//! Frames are decoded best-effort. Anything that is not valid JSON, carries
//! an unknown `type`, or lacks a required field is dropped by
//! [`StreamEvent::decode`] and never reaches chat state.
//!
//! Group conversations are looser on the wire: `tool_name` may be `null`,
//! `tool_args` may arrive as a JSON-encoded string, and `agent_turn_end`
//! may carry no `message_id` when nothing was persisted. Those frames are
//! kept.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Error text synthesized when the transport fails to connect or errors out
pub const CONNECTION_FAILED: &str = "WebSocket connection failed";

/// Error text synthesized when `send` is called before any `connect`
pub const NOT_INITIALIZED: &str = "WebSocket not initialized";

/// Error text synthesized when `send` is called on a closed connection
pub const NOT_CONNECTED: &str = "WebSocket not connected";

/// Error text used when the backend sends an `error` frame without a message
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Server-pushed event on the streaming endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A piece of the current agent turn's text
    Chunk {
        /// Text to append
        delta: String,
        /// Agent producing the text (group conversations)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent_name: Option<String>,
    },

    /// An agent turn begins
    AgentTurnStart {
        /// Agent taking the turn
        #[serde(default, skip_serializing_if = "Option::is_none")]
        agent_name: Option<String>,
    },

    /// An agent turn finished and was persisted
    AgentTurnEnd {
        /// Backend id of the persisted message, if one was stored
        #[serde(default)]
        message_id: Option<i64>,
    },

    /// The agent invoked a tool
    ToolCall {
        /// Tool name (empty if the backend did not report one)
        #[serde(default, deserialize_with = "null_as_empty")]
        tool_name: String,
        /// Tool arguments
        #[serde(
            default,
            deserialize_with = "decode_args",
            skip_serializing_if = "Option::is_none"
        )]
        tool_args: Option<Value>,
    },

    /// Output of the most recent tool call
    ToolResult {
        /// Tool output text
        tool_result: String,
    },

    /// The whole response is complete
    Done {},

    /// The response failed
    Error {
        /// Human-readable error
        #[serde(default = "unknown_error")]
        error: String,
    },
}

fn unknown_error() -> String {
    UNKNOWN_ERROR.to_string()
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Arguments arrive either as an object or as that object JSON-encoded
fn decode_args<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => {
            Some(serde_json::from_str(&text).unwrap_or(Value::String(text)))
        }
        other => other,
    })
}

impl StreamEvent {
    /// Decode a text frame, dropping anything malformed
    #[must_use]
    pub fn decode(frame: &str) -> Option<Self> {
        match serde_json::from_str(frame) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::debug!(error = %e, len = frame.len(), "Dropping undecodable frame");
                None
            }
        }
    }

    /// Build an `error` event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    /// Build a `done` event
    #[must_use]
    pub fn done() -> Self {
        Self::Done {}
    }

    /// Whether this event ends the current response
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done {} | Self::Error { .. })
    }
}

/// What a session surfaces to its owner
#[derive(Clone, Debug, PartialEq)]
pub enum SessionSignal {
    /// The transport finished its handshake
    Opened,
    /// The transport closed (or never opened)
    Closed,
    /// A decoded or locally synthesized stream event
    Event(StreamEvent),
}

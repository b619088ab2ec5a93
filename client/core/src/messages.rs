//! Chat Messages
//!
//! Committed chat messages, tool-call records and the single frame a client
//! ever writes to the streaming endpoint.
//!
//! # Wire Format
//!
//! Outbound frames are JSON objects tagged with `"type": "message"`:
//!
//! ```json
//! { "type": "message", "content": "hi", "model": "gemini/gemini-2.5-flash",
//!   "temperature": 0.7, "system_prompt": "be brief", "is_group": false }
//! ```
//!
//! `system_prompt` and `is_group` are omitted when unset.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Model used when neither the caller nor the configuration names one
pub const DEFAULT_MODEL: &str = "gemini/gemini-2.5-flash";

/// Sampling temperature used when none is configured
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Suffix appended to partial content when the user stops a generation
pub const STOPPED_MARKER: &str = " *(Stopped by user)*";

/// Conversation identifier assigned by the backend
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    /// Borrow the raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ConversationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Who authored a message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// The person at the keyboard
    User,
    /// An agent or model reply
    Assistant,
    /// System prompt stored with the conversation
    System,
    /// Tool output persisted by the backend
    Tool,
}

/// A committed message in the conversation history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Backend message id; absent for optimistic user messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Author of the message
    pub role: MessageRole,
    /// Message text
    pub content: String,
    /// Agent that produced the message (group conversations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    /// Serialized tool calls recorded by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls_json: Option<String>,
    /// Tool call this message answers (tool role only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Creation timestamp as reported by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ChatMessage {
    /// Create a user message (not yet acknowledged by the backend)
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: None,
            role: MessageRole::User,
            content: content.into(),
            agent_name: None,
            tool_calls_json: None,
            tool_call_id: None,
            created_at: None,
        }
    }

    /// Create an assistant message
    pub fn assistant(
        id: Option<i64>,
        content: impl Into<String>,
        agent_name: Option<String>,
    ) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: content.into(),
            agent_name,
            tool_calls_json: None,
            tool_call_id: None,
            created_at: None,
        }
    }
}

/// A tool invocation observed during the current agent turn
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool name
    pub name: String,
    /// Arguments the agent passed, if the backend reported them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<serde_json::Value>,
    /// Tool output, once received
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl ToolCallRecord {
    /// Record a call that has no result yet
    pub fn pending(name: impl Into<String>, args: Option<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            args,
            result: None,
        }
    }
}

/// A user message waiting to be written to the streaming endpoint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Message text (never empty)
    pub content: String,
    /// Model identifier, e.g. `openai/gpt-4o`
    pub model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Per-message system prompt override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Route through the group (multi-agent) pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
}

impl OutboundMessage {
    /// Create a message with the default temperature
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: None,
            is_group: None,
        }
    }

    /// Override the temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Attach a system prompt
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: Option<String>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    /// Mark the message for group routing
    #[must_use]
    pub fn with_group(mut self, is_group: Option<bool>) -> Self {
        self.is_group = is_group;
        self
    }

    /// Serialize into the JSON text frame sent over the socket
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error if serialization fails.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&ClientFrame::Message(self))
    }
}

/// Frames a client writes to the streaming endpoint
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame<'a> {
    Message(&'a OutboundMessage),
}

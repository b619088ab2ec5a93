//! REST Resource Types
//!
//! Request and response bodies of the conversation, model and health
//! endpoints. Optional fields default so older backends still decode.

use serde::{Deserialize, Serialize};

use crate::messages::{ChatMessage, ConversationId};

/// A conversation as listed by the backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// Conversation id
    pub id: ConversationId,
    /// Display title
    pub title: String,
    /// Model bound to the conversation
    pub model: String,
    /// Stored system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Multi-agent conversation
    #[serde(default)]
    pub is_group: bool,
    /// Agent the conversation belongs to, if any
    #[serde(default)]
    pub agent_id: Option<String>,
    /// Channel the conversation belongs to, if any
    #[serde(default)]
    pub channel_id: Option<String>,
    /// Creation time (ISO 8601)
    #[serde(default)]
    pub created_at: String,
    /// Last update time (ISO 8601)
    #[serde(default)]
    pub updated_at: String,
}

/// A conversation with its message history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationDetail {
    /// Conversation record
    #[serde(flatten)]
    pub conversation: Conversation,
    /// Messages, oldest first
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

/// A model offered by one of the backend's providers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier, `provider/name`
    pub id: String,
    /// Display name
    pub name: String,
    /// Provider key
    pub provider: String,
    /// Supports token streaming
    #[serde(default = "default_true")]
    pub supports_streaming: bool,
    /// Supports tool calls
    #[serde(default = "default_true")]
    pub supports_tools: bool,
    /// Context window in tokens
    #[serde(default = "default_context_window")]
    pub context_window: u32,
}

fn default_true() -> bool {
    true
}

fn default_context_window() -> u32 {
    8192
}

/// Body of `POST /conversations`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateConversation {
    /// Initial title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Model to bind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// System prompt to store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Create a group conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_group: Option<bool>,
    /// Bind the conversation to an agent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

/// Body of `PATCH /conversations/{id}`
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateConversation {
    /// New title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

/// Response of `GET /health`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// `"ok"` when healthy
    pub status: String,
    /// Backend version
    #[serde(default)]
    pub version: String,
}

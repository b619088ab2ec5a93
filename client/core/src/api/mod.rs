//! REST API
//!
//! Conversation and model management lives behind [`ChatApi`] so the
//! controller can be driven by the real backend ([`HttpApiClient`]) or by
//! an in-memory double in tests.

mod client;
mod types;

pub use client::HttpApiClient;
pub use types::{
    Conversation, ConversationDetail, CreateConversation, HealthStatus, ModelInfo,
    UpdateConversation,
};

use async_trait::async_trait;
use thiserror::Error;

use crate::messages::ConversationId;

/// REST API errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request did not complete
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("API Error {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body as text
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Server URL cannot be used as an API base
    #[error("Invalid server URL: {0}")]
    InvalidUrl(String),
}

/// Conversation and model management
#[async_trait]
pub trait ChatApi: Send + Sync + 'static {
    /// `GET /models`
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ApiError>;

    /// `GET /conversations`, most recently updated first
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    /// `GET /conversations/{id}`
    async fn get_conversation(&self, id: &ConversationId) -> Result<ConversationDetail, ApiError>;

    /// `POST /conversations`
    async fn create_conversation(
        &self,
        request: &CreateConversation,
    ) -> Result<Conversation, ApiError>;

    /// `PATCH /conversations/{id}`
    async fn update_conversation(
        &self,
        id: &ConversationId,
        request: &UpdateConversation,
    ) -> Result<Conversation, ApiError>;

    /// `DELETE /conversations/{id}`
    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), ApiError>;

    /// `GET /health`
    async fn health(&self) -> Result<HealthStatus, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_text() {
        let err = ApiError::Status {
            status: 404,
            body: "{\"detail\":\"Conversation not found\"}".into(),
        };
        assert_eq!(
            err.to_string(),
            "API Error 404: {\"detail\":\"Conversation not found\"}"
        );
    }
}

//! Headless Test Utilities
//!
//! In-memory stand-ins for the backend so controllers can be exercised
//! without a network. Pair [`InMemoryApi`] with
//! [`InProcessTransport`](crate::transport::InProcessTransport) to drive the
//! whole chat lifecycle from a test.
//!
//! # Usage
//!
//! ```ignore
//! use crossclaw_core::test_utils::InMemoryApi;
//!
//! let api = InMemoryApi::new();
//! let id = api.seed_conversation("Trip planning", false);
//!
//! // Make the next REST call fail
//! api.fail_next("backend down");
//!
//! // After the test, verify what the controller asked for
//! assert_eq!(api.call_count("get_conversation"), 1);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::api::{
    ApiError, ChatApi, Conversation, ConversationDetail, CreateConversation, HealthStatus,
    ModelInfo, UpdateConversation,
};
use crate::messages::{ChatMessage, ConversationId, DEFAULT_MODEL};

// ============================================================================
// Backing Store
// ============================================================================

#[derive(Debug, Default)]
struct Store {
    /// Conversations, most recently created first
    conversations: Vec<Conversation>,
    history: HashMap<ConversationId, Vec<ChatMessage>>,
    models: Vec<ModelInfo>,
    calls: HashMap<&'static str, usize>,
    fail_next: Option<String>,
}

// ============================================================================
// In-Memory API
// ============================================================================

/// [`ChatApi`] backed by a mutex-guarded in-memory store
///
/// Clones share the same store, so a test can keep a handle while the
/// controller owns another.
#[derive(Clone, Debug, Default)]
pub struct InMemoryApi {
    store: Arc<Mutex<Store>>,
}

impl InMemoryApi {
    /// Create an empty backend with no models
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend offering a couple of models
    #[must_use]
    pub fn with_standard_models() -> Self {
        let api = Self::new();
        api.set_models(vec![
            model("gemini", "gemini-2.5-flash"),
            model("openai", "gpt-4o"),
        ]);
        api
    }

    /// Replace the model list
    pub fn set_models(&self, models: Vec<ModelInfo>) {
        self.store.lock().models = models;
    }

    /// Add a conversation and return its id
    pub fn seed_conversation(&self, title: &str, is_group: bool) -> ConversationId {
        let conversation = new_conversation(&CreateConversation {
            title: Some(title.to_string()),
            is_group: Some(is_group),
            ..Default::default()
        });
        let id = conversation.id.clone();
        let mut store = self.store.lock();
        store.conversations.insert(0, conversation);
        store.history.insert(id.clone(), Vec::new());
        id
    }

    /// Append a message to a conversation's history
    pub fn push_history(&self, id: &ConversationId, message: ChatMessage) {
        self.store
            .lock()
            .history
            .entry(id.clone())
            .or_default()
            .push(message);
    }

    /// Make the next call fail with a 500 carrying `body`
    pub fn fail_next(&self, body: impl Into<String>) {
        self.store.lock().fail_next = Some(body.into());
    }

    /// How many times an operation was called (by trait method name)
    #[must_use]
    pub fn call_count(&self, operation: &str) -> usize {
        self.store.lock().calls.get(operation).copied().unwrap_or(0)
    }

    /// Snapshot of the stored conversations
    #[must_use]
    pub fn conversations(&self) -> Vec<Conversation> {
        self.store.lock().conversations.clone()
    }

    fn begin(&self, operation: &'static str) -> Result<parking_lot::MutexGuard<'_, Store>, ApiError> {
        let mut store = self.store.lock();
        *store.calls.entry(operation).or_insert(0) += 1;
        match store.fail_next.take() {
            Some(body) => Err(ApiError::Status { status: 500, body }),
            None => Ok(store),
        }
    }
}

fn model(provider: &str, name: &str) -> ModelInfo {
    ModelInfo {
        id: format!("{provider}/{name}"),
        name: name.to_string(),
        provider: provider.to_string(),
        supports_streaming: true,
        supports_tools: true,
        context_window: 8192,
    }
}

fn new_conversation(request: &CreateConversation) -> Conversation {
    let now = chrono::Utc::now().to_rfc3339();
    Conversation {
        id: ConversationId(uuid::Uuid::new_v4().to_string()),
        title: request
            .title
            .clone()
            .unwrap_or_else(|| "New Conversation".to_string()),
        model: request
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        system_prompt: request.system_prompt.clone(),
        is_group: request.is_group.unwrap_or(false),
        agent_id: request.agent_id.clone(),
        channel_id: None,
        created_at: now.clone(),
        updated_at: now,
    }
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        body: r#"{"detail":"Conversation not found"}"#.to_string(),
    }
}

#[async_trait]
impl ChatApi for InMemoryApi {
    async fn list_models(&self) -> Result<Vec<ModelInfo>, ApiError> {
        Ok(self.begin("list_models")?.models.clone())
    }

    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        Ok(self.begin("list_conversations")?.conversations.clone())
    }

    async fn get_conversation(&self, id: &ConversationId) -> Result<ConversationDetail, ApiError> {
        let store = self.begin("get_conversation")?;
        let conversation = store
            .conversations
            .iter()
            .find(|c| &c.id == id)
            .cloned()
            .ok_or_else(not_found)?;
        let messages = store.history.get(id).cloned().unwrap_or_default();
        Ok(ConversationDetail {
            conversation,
            messages,
        })
    }

    async fn create_conversation(
        &self,
        request: &CreateConversation,
    ) -> Result<Conversation, ApiError> {
        let mut store = self.begin("create_conversation")?;
        let conversation = new_conversation(request);
        store.history.insert(conversation.id.clone(), Vec::new());
        store.conversations.insert(0, conversation.clone());
        Ok(conversation)
    }

    async fn update_conversation(
        &self,
        id: &ConversationId,
        request: &UpdateConversation,
    ) -> Result<Conversation, ApiError> {
        let mut store = self.begin("update_conversation")?;
        let conversation = store
            .conversations
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(not_found)?;
        if let Some(ref title) = request.title {
            conversation.title.clone_from(title);
        }
        if let Some(ref model) = request.model {
            conversation.model.clone_from(model);
        }
        conversation.updated_at = chrono::Utc::now().to_rfc3339();
        Ok(conversation.clone())
    }

    async fn delete_conversation(&self, id: &ConversationId) -> Result<(), ApiError> {
        let mut store = self.begin("delete_conversation")?;
        let before = store.conversations.len();
        store.conversations.retain(|c| &c.id != id);
        if store.conversations.len() == before {
            return Err(not_found());
        }
        store.history.remove(id);
        Ok(())
    }

    async fn health(&self) -> Result<HealthStatus, ApiError> {
        drop(self.begin("health")?);
        Ok(HealthStatus {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}

//! Session Lifecycle Controller
//!
//! Binds user actions (select, create, send, stop, delete, rename) to the
//! streaming session and the REST API, and keeps [`ChatState`] current.
//!
//! The controller is a single owner: every method takes `&mut self` and
//! one task drives it. A surface typically loops on
//! [`ChatController::next_signal`] alongside its own input:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         line = input.next_line() => controller.send_message(&line?, &model),
//!         Some(_) = controller.next_signal() => render(controller.state()),
//!     }
//! }
//! ```
//!
//! REST failures never escape as errors; they land in
//! [`ChatState::error`] the same way stream errors do.

use std::sync::Arc;

use crate::api::{ApiError, ChatApi, CreateConversation, HealthStatus, UpdateConversation};
use crate::config::ClientConfig;
use crate::events::SessionSignal;
use crate::messages::{ConversationId, OutboundMessage, DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use crate::session::{SendOutcome, SessionClient};
use crate::state::{ChatState, Effect};
use crate::transport::StreamTransport;

/// Settings applied to every outbound message
#[derive(Clone, Debug, PartialEq)]
pub struct ChatSettings {
    /// Model for new conversations
    pub default_model: String,
    /// Sampling temperature
    pub temperature: f64,
    /// System prompt, if any
    pub system_prompt: Option<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: None,
        }
    }
}

/// Drives one chat surface
pub struct ChatController {
    api: Arc<dyn ChatApi>,
    session: SessionClient,
    state: ChatState,
    settings: ChatSettings,
}

impl ChatController {
    /// Create a controller over explicit collaborators
    pub fn new(
        api: Arc<dyn ChatApi>,
        transport: Arc<dyn StreamTransport>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            api,
            session: SessionClient::new(transport, config.transport.clone()),
            state: ChatState::new(),
            settings: config.chat.clone(),
        }
    }

    /// Create a controller talking to the configured backend over HTTP and
    /// WebSocket
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the HTTP client cannot be built for the
    /// configured server URL.
    #[cfg(feature = "websocket")]
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let api = crate::api::HttpApiClient::new(config.server_url())?;
        let transport = crate::transport::WebSocketTransport::new();
        Ok(Self::new(Arc::new(api), Arc::new(transport), config))
    }

    /// Current chat state
    #[must_use]
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    /// The streaming session
    #[must_use]
    pub fn session(&self) -> &SessionClient {
        &self.session
    }

    /// Settings applied to outbound messages
    #[must_use]
    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    /// Replace the outbound message settings
    pub fn set_settings(&mut self, settings: ChatSettings) {
        self.settings = settings;
    }

    // ========================================================================
    // Conversation management
    // ========================================================================

    /// Reload the conversation list
    pub async fn load_conversations(&mut self) {
        match self.api.list_conversations().await {
            Ok(conversations) => self.state.conversations = conversations,
            Err(e) => self.fail("load conversations", &e),
        }
    }

    /// Reload the model list
    ///
    /// Failures leave the list untouched and do not set an error: a backend
    /// with no provider keys legitimately has nothing to offer.
    pub async fn load_models(&mut self) {
        match self.api.list_models().await {
            Ok(models) => self.state.models = models,
            Err(e) => tracing::debug!(error = %e, "Model list unavailable"),
        }
    }

    /// Make `id` the active conversation and open its stream
    pub async fn select_conversation(&mut self, id: &ConversationId) {
        match self.api.get_conversation(id).await {
            Ok(detail) => {
                self.state.active_conversation_id = Some(id.clone());
                self.state.messages = detail.messages;
                self.state.error = None;
                self.connect(id.clone());
            }
            Err(e) => self.fail("select conversation", &e),
        }
    }

    /// Create a conversation, make it active and open its stream
    ///
    /// Returns the new id, or `None` (with [`ChatState::error`] set) if the
    /// backend refused.
    pub async fn create_conversation(
        &mut self,
        model: Option<&str>,
        is_group: Option<bool>,
        agent_id: Option<&str>,
    ) -> Option<ConversationId> {
        let request = CreateConversation {
            model: Some(model.unwrap_or(&self.settings.default_model).to_string()),
            is_group,
            agent_id: agent_id.map(str::to_string),
            ..Default::default()
        };

        match self.api.create_conversation(&request).await {
            Ok(conversation) => {
                let id = conversation.id.clone();
                tracing::info!(conversation_id = %id, "Created conversation");
                self.state.conversations.insert(0, conversation);
                self.state.active_conversation_id = Some(id.clone());
                self.state.messages.clear();
                self.state.error = None;
                self.connect(id.clone());
                Some(id)
            }
            Err(e) => {
                self.fail("create conversation", &e);
                None
            }
        }
    }

    /// Open the agent's existing conversation, or create one bound to it
    pub async fn start_or_load_agent_chat(
        &mut self,
        agent_id: &str,
        model: Option<&str>,
    ) -> Option<ConversationId> {
        let existing = self
            .state
            .conversations
            .iter()
            .find(|c| c.agent_id.as_deref() == Some(agent_id))
            .map(|c| c.id.clone());

        if let Some(id) = existing {
            self.select_conversation(&id).await;
            return (self.state.active_conversation_id.as_ref() == Some(&id)).then_some(id);
        }

        self.create_conversation(model, Some(false), Some(agent_id))
            .await
    }

    /// Delete a conversation; closes the stream if it was active
    pub async fn delete_conversation(&mut self, id: &ConversationId) {
        if let Err(e) = self.api.delete_conversation(id).await {
            self.fail("delete conversation", &e);
            return;
        }

        self.state.conversations.retain(|c| &c.id != id);
        if self.state.active_conversation_id.as_ref() == Some(id) {
            self.session.disconnect();
            self.state.active_conversation_id = None;
            self.state.messages.clear();
            self.state.is_connected = false;
            self.state.is_streaming = false;
            self.state.clear_streaming();
        }
    }

    /// Change a conversation's title
    pub async fn rename_conversation(&mut self, id: &ConversationId, title: &str) {
        let request = UpdateConversation {
            title: Some(title.to_string()),
            ..Default::default()
        };

        match self.api.update_conversation(id, &request).await {
            Ok(_) => {
                if let Some(conversation) = self.state.conversations.iter_mut().find(|c| &c.id == id)
                {
                    conversation.title = title.to_string();
                }
            }
            Err(e) => self.fail("rename conversation", &e),
        }
    }

    /// Backend health
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] of the health request.
    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.api.health().await
    }

    // ========================================================================
    // Streaming
    // ========================================================================

    /// Open the stream for `id`, replacing any current one
    ///
    /// A response still in flight on the old stream is abandoned.
    fn connect(&mut self, id: ConversationId) {
        self.state.is_connected = false;
        self.state.is_streaming = false;
        self.state.clear_streaming();
        self.session.connect(id);
    }

    /// Send a user message on the active conversation
    ///
    /// Returns `None` without touching state if `content` is blank or there
    /// is no active conversation with a session.
    pub fn send_message(&mut self, content: &str, model: &str) -> Option<SendOutcome> {
        if content.trim().is_empty() {
            return None;
        }
        if self.state.active_conversation_id.is_none() || !self.session.has_connection() {
            tracing::debug!("Ignoring send with no active conversation");
            return None;
        }

        self.state.begin_user_turn(content);

        let is_group = self.state.active_conversation().map(|c| c.is_group);
        let message = OutboundMessage::new(content, model)
            .with_temperature(self.settings.temperature)
            .with_system_prompt(self.settings.system_prompt.clone())
            .with_group(is_group);

        Some(self.session.send(message))
    }

    /// Abort the response being streamed
    ///
    /// Closes the stream so the backend stops generating, commits what
    /// arrived so far with a stop marker, and reconnects the same
    /// conversation so the next send works straight away.
    pub fn stop_generation(&mut self) {
        let Some(id) = self.state.active_conversation_id.clone() else {
            return;
        };
        if !self.session.has_connection() {
            return;
        }

        self.session.disconnect();
        self.state
            .commit_stopped(chrono::Utc::now().timestamp_millis());
        tracing::info!(conversation_id = %id, "Generation stopped by user");
        self.connect(id);
    }

    /// Forget the last error
    pub fn clear_error(&mut self) {
        self.state.error = None;
    }

    /// Wait for the next session signal and fold it into the state
    ///
    /// Effects requested by the reducer (conversation refresh after `done`)
    /// run before this returns. Returns the applied signal, or `None` if the
    /// session can produce no more.
    ///
    /// Cancel-safe up to the point a signal is received; cancelling during
    /// a follow-up refresh skips that refresh.
    pub async fn next_signal(&mut self) -> Option<SessionSignal> {
        let signal = self.session.next_signal().await?;
        self.apply(signal.clone()).await;
        Some(signal)
    }

    /// Apply every signal already delivered, without waiting
    ///
    /// Returns how many signals were applied.
    pub async fn drain_pending(&mut self) -> usize {
        let mut applied = 0;
        while let Some(signal) = self.session.try_next_signal() {
            self.apply(signal).await;
            applied += 1;
        }
        applied
    }

    async fn apply(&mut self, signal: SessionSignal) {
        for effect in self.state.apply_signal(signal) {
            match effect {
                Effect::RefreshConversations => self.load_conversations().await,
            }
        }
    }

    fn fail(&mut self, action: &str, error: &ApiError) {
        tracing::warn!(error = %error, "Failed to {action}");
        self.state.error = Some(error.to_string());
    }
}

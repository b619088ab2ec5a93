//! Chat State
//!
//! The materialized view a surface renders, and the reducer that folds
//! stream events into it.
//!
//! `streaming_content`, `streaming_tool_calls` and `streaming_agent_name`
//! are scratch space for the in-flight agent turn. They are only meaningful
//! while `is_streaming` is set and are copied into `messages` when the turn
//! ends; nothing reads them back after that.

use crate::api::{Conversation, ModelInfo};
use crate::events::{SessionSignal, StreamEvent};
use crate::messages::{ChatMessage, ConversationId, ToolCallRecord, STOPPED_MARKER};

/// Follow-up work the reducer asks its owner to perform
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Reload the conversation list (titles and timestamps changed server-side)
    RefreshConversations,
}

/// Observable chat state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChatState {
    /// Known conversations, most recent first
    pub conversations: Vec<Conversation>,
    /// Conversation the session is bound to
    pub active_conversation_id: Option<ConversationId>,
    /// Committed messages of the active conversation
    pub messages: Vec<ChatMessage>,
    /// Models offered by the backend
    pub models: Vec<ModelInfo>,

    /// A response is being streamed
    pub is_streaming: bool,
    /// Text of the in-flight agent turn
    pub streaming_content: String,
    /// Tool calls of the in-flight agent turn
    pub streaming_tool_calls: Vec<ToolCallRecord>,
    /// Agent speaking in the in-flight turn
    pub streaming_agent_name: Option<String>,

    /// The stream is open
    pub is_connected: bool,
    /// Last error, until cleared
    pub error: Option<String>,

    /// `tool_result` events that arrived with no pending tool call
    pub orphan_tool_results: u64,
}

impl ChatState {
    /// Create an empty state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a session signal into the state
    pub fn apply_signal(&mut self, signal: SessionSignal) -> Vec<Effect> {
        match signal {
            SessionSignal::Opened => {
                self.is_connected = true;
                Vec::new()
            }
            SessionSignal::Closed => {
                self.is_connected = false;
                Vec::new()
            }
            SessionSignal::Event(event) => self.apply(event),
        }
    }

    /// Fold one stream event into the state
    pub fn apply(&mut self, event: StreamEvent) -> Vec<Effect> {
        match event {
            StreamEvent::Chunk { delta, agent_name } => {
                self.streaming_content.push_str(&delta);
                if self.streaming_agent_name.is_none() {
                    self.streaming_agent_name = agent_name;
                }
            }

            StreamEvent::AgentTurnStart { agent_name } => {
                self.streaming_content.clear();
                self.streaming_tool_calls.clear();
                self.streaming_agent_name = agent_name;
            }

            StreamEvent::ToolCall {
                tool_name,
                tool_args,
            } => {
                self.streaming_tool_calls
                    .push(ToolCallRecord::pending(tool_name, tool_args));
            }

            StreamEvent::ToolResult { tool_result } => {
                if let Some(call) = self.streaming_tool_calls.last_mut() {
                    call.result = Some(tool_result);
                } else {
                    self.orphan_tool_results += 1;
                    tracing::warn!(
                        orphans = self.orphan_tool_results,
                        "tool_result received with no pending tool_call"
                    );
                }
            }

            StreamEvent::AgentTurnEnd { message_id } => {
                let content = std::mem::take(&mut self.streaming_content);
                let agent_name = self.streaming_agent_name.take();
                self.messages
                    .push(ChatMessage::assistant(message_id, content, agent_name));
                self.streaming_tool_calls.clear();
            }

            StreamEvent::Done {} => {
                self.is_streaming = false;
                self.clear_streaming();
                return vec![Effect::RefreshConversations];
            }

            StreamEvent::Error { error } => {
                self.error = Some(error);
                self.is_streaming = false;
                self.clear_streaming();
            }
        }

        Vec::new()
    }

    /// Drop all in-flight turn scratch
    pub fn clear_streaming(&mut self) {
        self.streaming_content.clear();
        self.streaming_tool_calls.clear();
        self.streaming_agent_name = None;
    }

    /// Record a user message and start waiting for the response
    pub fn begin_user_turn(&mut self, content: &str) {
        self.messages.push(ChatMessage::user(content));
        self.is_streaming = true;
        self.clear_streaming();
        self.error = None;
    }

    /// Commit whatever was streamed so far, marked as stopped
    ///
    /// `id` is a local placeholder; the backend never saw this message
    /// finish.
    pub fn commit_stopped(&mut self, id: i64) {
        let mut content = std::mem::take(&mut self.streaming_content);
        content.push_str(STOPPED_MARKER);
        let agent_name = self.streaming_agent_name.take();

        self.messages
            .push(ChatMessage::assistant(Some(id), content, agent_name));
        self.is_streaming = false;
        self.clear_streaming();
    }

    /// Conversation record of the active conversation, if listed
    #[must_use]
    pub fn active_conversation(&self) -> Option<&Conversation> {
        let id = self.active_conversation_id.as_ref()?;
        self.conversations.iter().find(|c| &c.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::MessageRole;
    use pretty_assertions::assert_eq;

    fn chunk(delta: &str) -> StreamEvent {
        StreamEvent::Chunk {
            delta: delta.into(),
            agent_name: None,
        }
    }

    fn streaming() -> ChatState {
        let mut state = ChatState::new();
        state.begin_user_turn("question");
        state
    }

    #[test]
    fn test_turn_commits_one_message() {
        let mut state = streaming();

        state.apply(StreamEvent::AgentTurnStart { agent_name: None });
        state.apply(chunk("Hi"));
        state.apply(chunk(" there"));
        state.apply(StreamEvent::AgentTurnEnd { message_id: Some(7) });

        let assistant: Vec<_> = state
            .messages
            .iter()
            .filter(|m| m.role == MessageRole::Assistant)
            .collect();
        assert_eq!(assistant.len(), 1);
        assert_eq!(assistant[0].content, "Hi there");
        assert_eq!(assistant[0].id, Some(7));
        assert!(state.streaming_content.is_empty());
        assert!(state.streaming_tool_calls.is_empty());
    }

    #[test]
    fn test_tool_result_pairs_with_last_call() {
        let mut state = streaming();

        state.apply(StreamEvent::ToolCall {
            tool_name: "search".into(),
            tool_args: None,
        });
        state.apply(StreamEvent::ToolResult {
            tool_result: "42 results".into(),
        });

        assert_eq!(state.streaming_tool_calls.len(), 1);
        assert_eq!(state.streaming_tool_calls[0].name, "search");
        assert_eq!(
            state.streaming_tool_calls[0].result.as_deref(),
            Some("42 results")
        );
    }

    #[test]
    fn test_orphan_tool_result_only_counts() {
        let mut state = streaming();
        state.apply(chunk("partial"));
        let before = state.clone();

        let effects = state.apply(StreamEvent::ToolResult {
            tool_result: "nobody asked".into(),
        });

        assert!(effects.is_empty());
        assert_eq!(state.orphan_tool_results, 1);
        state.orphan_tool_results = 0;
        assert_eq!(state, before);
    }

    #[test]
    fn test_chunk_keeps_existing_agent_name() {
        let mut state = streaming();
        state.apply(StreamEvent::AgentTurnStart {
            agent_name: Some("Scout".into()),
        });
        state.apply(StreamEvent::Chunk {
            delta: "x".into(),
            agent_name: Some("Other".into()),
        });
        assert_eq!(state.streaming_agent_name.as_deref(), Some("Scout"));
    }

    #[test]
    fn test_chunk_adopts_agent_name_when_unset() {
        let mut state = streaming();
        state.apply(StreamEvent::Chunk {
            delta: "x".into(),
            agent_name: Some("Scout".into()),
        });
        state.apply(StreamEvent::AgentTurnEnd { message_id: Some(3) });

        assert_eq!(
            state.messages.last().unwrap().agent_name.as_deref(),
            Some("Scout")
        );
    }

    #[test]
    fn test_group_response_commits_each_turn() {
        let mut state = streaming();

        for (id, name) in [(10, "Planner"), (11, "Coder")] {
            state.apply(StreamEvent::AgentTurnStart {
                agent_name: Some(name.into()),
            });
            state.apply(chunk(name));
            state.apply(StreamEvent::AgentTurnEnd { message_id: Some(id) });
        }
        let effects = state.apply(StreamEvent::done());

        assert_eq!(effects, vec![Effect::RefreshConversations]);
        assert!(!state.is_streaming);
        let names: Vec<_> = state
            .messages
            .iter()
            .filter_map(|m| m.agent_name.as_deref())
            .collect();
        assert_eq!(names, vec!["Planner", "Coder"]);
    }

    #[test]
    fn test_error_ends_streaming() {
        let mut state = streaming();
        state.apply(chunk("half"));

        let effects = state.apply(StreamEvent::error("model overloaded"));

        assert!(effects.is_empty());
        assert_eq!(state.error.as_deref(), Some("model overloaded"));
        assert!(!state.is_streaming);
        assert!(state.streaming_content.is_empty());
    }

    #[test]
    fn test_commit_stopped_marks_partial_content() {
        let mut state = streaming();
        state.apply(chunk("partial text"));

        state.commit_stopped(99);

        let last = state.messages.last().unwrap();
        assert_eq!(last.role, MessageRole::Assistant);
        assert!(last.content.contains("partial text"));
        assert!(last.content.ends_with(STOPPED_MARKER));
        assert!(!state.is_streaming);
        assert!(state.streaming_content.is_empty());
    }

    #[test]
    fn test_signals_toggle_connection_flag() {
        let mut state = ChatState::new();
        state.apply_signal(SessionSignal::Opened);
        assert!(state.is_connected);
        state.apply_signal(SessionSignal::Closed);
        assert!(!state.is_connected);
    }
}

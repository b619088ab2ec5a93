//! End-to-end chat lifecycle through the controller
//!
//! Each test drives a fresh [`ChatController`] with the in-memory REST API
//! and the in-process transport, playing the backend from the test body.

use std::sync::Arc;
use std::time::Duration;

use crossclaw_core::events::{NOT_CONNECTED, NOT_INITIALIZED};
use crossclaw_core::messages::{MessageRole, STOPPED_MARKER};
use crossclaw_core::test_utils::InMemoryApi;
use crossclaw_core::transport::{InProcessConnection, InProcessServer, InProcessTransport};
use crossclaw_core::{
    ChatController, ClientConfig, ConnectionState, ConversationId, SendOutcome, SessionClient,
    SessionSignal, StreamEvent, TransportConfig,
};
use pretty_assertions::assert_eq;

const MODEL: &str = "gemini/gemini-2.5-flash";

struct Harness {
    controller: ChatController,
    api: InMemoryApi,
    server: InProcessServer,
}

impl Harness {
    fn new() -> Self {
        let api = InMemoryApi::with_standard_models();
        let (transport, server) = InProcessTransport::new_pair();
        let controller = ChatController::new(
            Arc::new(api.clone()),
            Arc::new(transport),
            &ClientConfig::default(),
        );
        Self {
            controller,
            api,
            server,
        }
    }

    /// Create a conversation and complete its handshake
    async fn open_new(&mut self) -> (ConversationId, InProcessConnection) {
        let id = self
            .controller
            .create_conversation(None, None, None)
            .await
            .expect("in-memory create succeeds");
        let connection = self.accept_and_open().await;
        (id, connection)
    }

    async fn accept_and_open(&mut self) -> InProcessConnection {
        let mut connection = self.server.accept().await.expect("client dialed");
        connection.open();
        assert_eq!(
            self.controller.next_signal().await,
            Some(SessionSignal::Opened)
        );
        connection
    }

    /// Push frames and apply exactly one signal per frame
    async fn push(&mut self, connection: &InProcessConnection, frames: &[&str]) {
        for frame in frames {
            connection.send(*frame).await.expect("client listening");
            self.controller.next_signal().await.expect("signal delivered");
        }
    }

    async fn wait_for_live(&self, expected: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while self.server.live_connections() != expected {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("driver count settles");
    }
}

#[tokio::test]
async fn test_queued_messages_flush_in_order() {
    let (transport, mut server) = InProcessTransport::new_pair();
    let mut session = SessionClient::new(Arc::new(transport), TransportConfig::default());
    session.connect(ConversationId::from("c1"));

    for text in ["first", "second", "third"] {
        let outcome = session.send(crossclaw_core::OutboundMessage::new(text, MODEL));
        assert_eq!(outcome, SendOutcome::Queued);
    }
    assert_eq!(session.queued(), 3);

    let mut connection = server.accept().await.unwrap();
    assert!(connection.endpoint().ends_with("/ws/chat/c1"));
    connection.open();
    assert_eq!(session.next_signal().await, Some(SessionSignal::Opened));
    assert_eq!(session.state(), ConnectionState::Open);

    let mut received = Vec::new();
    for _ in 0..3 {
        let frame: serde_json::Value =
            serde_json::from_str(&connection.recv().await.unwrap()).unwrap();
        received.push(frame["content"].as_str().unwrap().to_string());
    }
    assert_eq!(received, vec!["first", "second", "third"]);
    assert_eq!(session.queued(), 0);
}

#[tokio::test]
async fn test_single_turn_commits_one_message() {
    let mut h = Harness::new();
    let (_, connection) = h.open_new().await;
    assert_eq!(h.controller.send_message("hello", MODEL), Some(SendOutcome::Sent));

    h.push(
        &connection,
        &[
            r#"{"type":"agent_turn_start"}"#,
            r#"{"type":"chunk","delta":"Hi"}"#,
            r#"{"type":"chunk","delta":" there"}"#,
            r#"{"type":"agent_turn_end","message_id":7}"#,
            r#"{"type":"done","conversation_id":"ignored"}"#,
        ],
    )
    .await;

    let state = h.controller.state();
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
    assert!(!state.is_streaming);
}

#[tokio::test]
async fn test_tool_call_pairs_with_result() {
    let mut h = Harness::new();
    let (_, connection) = h.open_new().await;
    h.controller.send_message("find things", MODEL);

    h.push(
        &connection,
        &[
            r#"{"type":"agent_turn_start","agent_name":"Scout"}"#,
            r#"{"type":"tool_call","tool_name":"search","tool_args":{"q":"things"}}"#,
            r#"{"type":"tool_result","tool_result":"42 results"}"#,
        ],
    )
    .await;

    let calls = &h.controller.state().streaming_tool_calls;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "search");
    assert_eq!(calls[0].result.as_deref(), Some("42 results"));
    assert_eq!(
        h.controller.state().streaming_agent_name.as_deref(),
        Some("Scout")
    );
}

#[tokio::test]
async fn test_orphan_tool_result_is_counted_only() {
    let mut h = Harness::new();
    let (_, connection) = h.open_new().await;
    h.controller.send_message("go", MODEL);
    h.push(&connection, &[r#"{"type":"chunk","delta":"partial"}"#])
        .await;
    let before = h.controller.state().clone();

    h.push(&connection, &[r#"{"type":"tool_result","tool_result":"stray"}"#])
        .await;

    let mut after = h.controller.state().clone();
    assert_eq!(after.orphan_tool_results, 1);
    after.orphan_tool_results = 0;
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_malformed_frames_are_dropped() {
    let mut h = Harness::new();
    let (_, connection) = h.open_new().await;
    h.controller.send_message("go", MODEL);

    for frame in ["not json", r#"{"type":"mystery"}"#, r#"{"type":"chunk"}"#] {
        connection.send(frame).await.unwrap();
    }
    h.push(&connection, &[r#"{"type":"chunk","delta":"ok"}"#])
        .await;

    assert_eq!(h.controller.state().streaming_content, "ok");
    assert!(h.controller.state().error.is_none());
}

#[tokio::test]
async fn test_stop_then_resend() {
    let mut h = Harness::new();
    let (id, connection) = h.open_new().await;
    h.controller.send_message("write a long story", MODEL);
    h.push(
        &connection,
        &[
            r#"{"type":"agent_turn_start","agent_name":"Bard"}"#,
            r#"{"type":"chunk","delta":"Once upon a time"}"#,
        ],
    )
    .await;

    h.controller.stop_generation();

    let state = h.controller.state();
    let last = state.messages.last().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
    assert!(last.content.contains("Once upon a time"));
    assert!(last.content.ends_with(STOPPED_MARKER));
    assert_eq!(last.agent_name.as_deref(), Some("Bard"));
    assert!(!state.is_streaming);
    assert!(state.streaming_content.is_empty());
    assert!(state.streaming_tool_calls.is_empty());
    assert!(state.streaming_agent_name.is_none());

    let outcome = h.controller.send_message("a shorter one", MODEL);
    assert!(matches!(
        outcome,
        Some(SendOutcome::Queued | SendOutcome::Sent)
    ));

    // The reconnect dials the same conversation and flushes the resend.
    let mut connection = h.accept_and_open().await;
    assert!(connection.endpoint().ends_with(&format!("/ws/chat/{id}")));
    let frame: serde_json::Value =
        serde_json::from_str(&connection.recv().await.unwrap()).unwrap();
    assert_eq!(frame["content"], "a shorter one");
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let (transport, mut server) = InProcessTransport::new_pair();
    let mut session = SessionClient::new(Arc::new(transport), TransportConfig::default());
    session.connect(ConversationId::from("c1"));
    let mut connection = server.accept().await.unwrap();
    connection.open();
    session.next_signal().await;

    session.disconnect();
    session.disconnect();

    assert!(!session.is_connected());
    assert!(!session.has_connection());
    assert_eq!(session.state(), ConnectionState::Closed);

    session.send(crossclaw_core::OutboundMessage::new("late", MODEL));
    assert_eq!(
        session.next_signal().await,
        Some(SessionSignal::Event(StreamEvent::error(NOT_INITIALIZED)))
    );
}

#[tokio::test]
async fn test_closed_stream_rejects_send() {
    let mut h = Harness::new();
    let (_, connection) = h.open_new().await;

    drop(connection);
    assert_eq!(h.controller.next_signal().await, Some(SessionSignal::Closed));
    assert!(!h.controller.state().is_connected);

    assert_eq!(
        h.controller.send_message("anyone?", MODEL),
        Some(SendOutcome::Rejected)
    );
    h.controller.next_signal().await;
    assert_eq!(h.controller.state().error.as_deref(), Some(NOT_CONNECTED));
    assert!(!h.controller.state().is_streaming);
}

#[tokio::test]
async fn test_session_replacement_isolates_old_stream() {
    let mut h = Harness::new();
    let (_, connection_a) = h.open_new().await;
    let id_b = h.api.seed_conversation("B", false);
    h.controller.load_conversations().await;

    h.controller.select_conversation(&id_b).await;

    // A's server keeps talking; none of it may reach chat state.
    let _ = connection_a
        .send(r#"{"type":"chunk","delta":"from A"}"#)
        .await;
    let _ = connection_a.send(r#"{"type":"error","error":"A broke"}"#).await;

    let connection_b = h.accept_and_open().await;
    assert!(connection_b
        .endpoint()
        .ends_with(&format!("/ws/chat/{id_b}")));
    h.wait_for_live(1).await;

    h.controller.send_message("hello B", MODEL);
    h.push(&connection_b, &[r#"{"type":"chunk","delta":"from B"}"#])
        .await;

    let state = h.controller.state();
    assert_eq!(state.streaming_content, "from B");
    assert!(state.error.is_none());
    assert_eq!(state.active_conversation_id, Some(id_b));
}

#[tokio::test]
async fn test_group_conversation_commits_each_agent() {
    let mut h = Harness::new();
    let id = h
        .controller
        .create_conversation(None, Some(true), None)
        .await
        .unwrap();
    let mut connection = h.accept_and_open().await;
    h.controller.send_message("debate", MODEL);

    let frame: serde_json::Value =
        serde_json::from_str(&connection.recv().await.unwrap()).unwrap();
    assert_eq!(frame["is_group"], true);

    h.push(
        &connection,
        &[
            r#"{"type":"agent_turn_start","agent_name":"Pro"}"#,
            r#"{"type":"chunk","delta":"Yes."}"#,
            r#"{"type":"agent_turn_end","message_id":1}"#,
            r#"{"type":"agent_turn_start","agent_name":"Con"}"#,
            r#"{"type":"chunk","delta":"No."}"#,
            r#"{"type":"agent_turn_end","message_id":2}"#,
            r#"{"type":"done"}"#,
        ],
    )
    .await;

    let replies: Vec<_> = h
        .controller
        .state()
        .messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .map(|m| (m.agent_name.clone().unwrap(), m.content.clone()))
        .collect();
    assert_eq!(
        replies,
        vec![
            ("Pro".to_string(), "Yes.".to_string()),
            ("Con".to_string(), "No.".to_string())
        ]
    );
    assert_eq!(h.controller.state().active_conversation_id, Some(id));
}

#[tokio::test]
async fn test_refused_connection_reports_failure() {
    let mut h = Harness::new();
    h.controller.create_conversation(None, None, None).await;

    h.server.accept().await.unwrap().reject();

    h.controller.next_signal().await;
    h.controller.next_signal().await;
    let state = h.controller.state();
    assert_eq!(state.error.as_deref(), Some("WebSocket connection failed"));
    assert!(!state.is_connected);
}

#[tokio::test]
async fn test_group_tool_call_with_encoded_args_pairs() {
    let mut h = Harness::new();
    h.controller
        .create_conversation(None, Some(true), None)
        .await
        .unwrap();
    let connection = h.accept_and_open().await;
    h.controller.send_message("look it up", MODEL);

    h.push(
        &connection,
        &[
            r#"{"type":"agent_turn_start","agent_name":"Scout"}"#,
            r#"{"type":"tool_call","tool_name":"web_search","tool_args":"{\"q\":\"rust\"}","agent_name":"Scout"}"#,
            r#"{"type":"tool_result","tool_result":"3 hits","agent_name":"Scout"}"#,
        ],
    )
    .await;

    let state = h.controller.state();
    assert_eq!(state.orphan_tool_results, 0);
    assert_eq!(state.streaming_tool_calls.len(), 1);
    assert_eq!(state.streaming_tool_calls[0].name, "web_search");
    assert_eq!(
        state.streaming_tool_calls[0].args,
        Some(serde_json::json!({"q": "rust"}))
    );
    assert_eq!(state.streaming_tool_calls[0].result.as_deref(), Some("3 hits"));

    h.push(
        &connection,
        &[r#"{"type":"agent_turn_end","message_id":null,"agent_name":"Scout"}"#],
    )
    .await;
    let last = h.controller.state().messages.last().unwrap();
    assert_eq!(last.role, MessageRole::Assistant);
    assert_eq!(last.id, None);
    assert_eq!(last.agent_name.as_deref(), Some("Scout"));
}

#[tokio::test]
async fn test_switching_drops_pending_error_of_old_conversation() {
    let mut h = Harness::new();
    let (_, connection_a) = h.open_new().await;
    let id_b = h.api.seed_conversation("B", false);
    h.controller.load_conversations().await;

    drop(connection_a);
    assert_eq!(h.controller.next_signal().await, Some(SessionSignal::Closed));
    assert_eq!(
        h.controller.send_message("anyone?", MODEL),
        Some(SendOutcome::Rejected)
    );

    h.controller.select_conversation(&id_b).await;
    assert!(!h.controller.state().is_streaming);

    let _connection_b = h.accept_and_open().await;
    assert_eq!(h.controller.drain_pending().await, 0);
    let state = h.controller.state();
    assert!(state.error.is_none());
    assert!(!state.is_streaming);
    assert_eq!(state.active_conversation_id, Some(id_b));
}

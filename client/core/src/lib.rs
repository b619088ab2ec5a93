//! CrossClaw Core - Headless Streaming Chat Client
//!
//! This crate owns the client side of a CrossClaw chat: the live streaming
//! session with the backend, the state that session folds into, and the
//! controller binding user actions to both. It has no rendering code; a
//! terminal, GUI or test harness drives it and renders [`ChatState`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         Surface                              │
//! │        (crossclaw CLI, GUI shell, integration tests)         │
//! └───────────────┬──────────────────────────────▲───────────────┘
//!      select / create / send / stop             │ ChatState
//! ┌───────────────▼──────────────────────────────┴───────────────┐
//! │                      ChatController                          │
//! │  ┌──────────────┐   ┌───────────────┐   ┌─────────────────┐  │
//! │  │ SessionClient│──▶│   ChatState   │   │   ChatApi       │  │
//! │  │ (epoch, FIFO)│   │   (reducer)   │   │   (REST)        │  │
//! │  └──────┬───────┘   └───────────────┘   └─────────────────┘  │
//! └─────────┼────────────────────────────────────────────────────┘
//!           │ StreamTransport (WebSocket / in-process)
//!           ▼
//!     /ws/chat/{conversation_id}
//! ```
//!
//! # Module Overview
//!
//! - [`api`]: REST collaborator client (conversations, models, health)
//! - [`config`]: TOML + environment configuration
//! - [`controller`]: Session lifecycle controller
//! - [`events`]: Inbound stream events and session signals
//! - [`messages`]: Chat messages and the outbound wire frame
//! - [`session`]: Streaming session client (connection state, send queue)
//! - [`state`]: Chat state and the stream reducer
//! - [`transport`]: Transport drivers for the streaming endpoint
//! - [`test_utils`]: In-memory doubles for headless testing
//!
//! # Quick Start
//!
//! ```ignore
//! use crossclaw_core::{config::load_config, ChatController};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let mut controller = ChatController::from_config(&config)?;
//!
//!     let id = controller.create_conversation(None, None, None).await;
//!     controller.send_message("hello", "gemini/gemini-2.5-flash");
//!
//!     while let Some(signal) = controller.next_signal().await {
//!         // render controller.state()
//!         if !controller.state().is_streaming {
//!             break;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod config;
pub mod controller;
pub mod events;
pub mod messages;
pub mod session;
pub mod state;
pub mod test_utils;
pub mod transport;

// Re-exports for convenience
pub use api::{ApiError, ChatApi, Conversation, ConversationDetail, HttpApiClient, ModelInfo};
pub use config::{
    load_config, load_config_from_path, ClientConfig, ConfigError, ConfigOverrides, ConfigSource,
};
pub use controller::{ChatController, ChatSettings};
pub use events::{SessionSignal, StreamEvent};
pub use messages::{ChatMessage, ConversationId, MessageRole, OutboundMessage, ToolCallRecord};
pub use session::{ConnectionState, SendOutcome, SessionClient};
pub use state::{ChatState, Effect};
pub use transport::{StreamTransport, TransportConfig, TransportError};

/// URL type used for server addresses
pub use reqwest::Url;

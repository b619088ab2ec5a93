//! CrossClaw CLI - Terminal Chat Client
//!
//! Interactive chat against a CrossClaw backend from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Start a new conversation on the default backend
//! crossclaw --new
//!
//! # Resume a conversation on a remote backend
//! crossclaw --server https://claw.example.com --conversation 4f1c...
//!
//! # New group conversation with a specific model
//! crossclaw --new --group --model openai/gpt-4o
//!
//! # Verbose logging (stderr)
//! RUST_LOG=crossclaw_core=debug crossclaw
//! ```

mod repl;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use crossclaw_core::{
    load_config, load_config_from_path, ChatController, ConfigOverrides, ConversationId, Url,
};

/// Terminal chat client for the CrossClaw assistant backend
#[derive(Parser, Debug)]
#[command(name = "crossclaw")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Backend base URL (http or https)
    #[arg(short = 's', long, value_name = "URL")]
    server: Option<Url>,

    /// Model for new conversations and messages
    #[arg(short = 'm', long, value_name = "PROVIDER/MODEL")]
    model: Option<String>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "CROSSCLAW_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Open an existing conversation on start
    #[arg(long, value_name = "ID", conflicts_with = "new")]
    conversation: Option<String>,

    /// Start a new conversation on start
    #[arg(short = 'n', long)]
    new: bool,

    /// Make the new conversation a group (multi-agent) conversation
    #[arg(short = 'g', long, requires = "new")]
    group: bool,
}

/// Initialize logging to stderr so it never interleaves with chat output
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging();

    let mut config = match args.config {
        Some(ref path) => load_config_from_path(Some(path.clone()))
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => load_config().context("Failed to load config")?,
    };

    let mut overrides = ConfigOverrides::new();
    if let Some(ref server) = args.server {
        overrides = overrides.with_server_url(server.clone());
    }
    if let Some(ref model) = args.model {
        overrides = overrides.with_default_model(model.clone());
    }
    overrides
        .apply(&mut config)
        .context("Invalid command-line options")?;

    tracing::info!(
        server = %config.server_url(),
        model = %config.chat.default_model,
        source = %config.source(),
        "Starting crossclaw"
    );

    let mut controller =
        ChatController::from_config(&config).context("Failed to create API client")?;

    controller.load_conversations().await;
    controller.load_models().await;

    if let Some(id) = args.conversation {
        controller.select_conversation(&ConversationId(id)).await;
    } else if args.new {
        controller
            .create_conversation(None, Some(args.group), None)
            .await;
    }

    repl::run(&mut controller).await
}

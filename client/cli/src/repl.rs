//! Interactive Loop
//!
//! Multiplexes stdin lines and session signals. Slash commands manage
//! conversations; anything else is sent as a chat message.

use std::io::Write;

use anyhow::Result;
use crossclaw_core::{ChatController, ConversationId, SessionSignal, StreamEvent};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  /list             List conversations
  /new [group]      Start a new conversation
  /select <id>      Open a conversation
  /rename <title>   Rename the active conversation
  /delete <id>      Delete a conversation
  /models           List available models
  /stop             Stop the response being generated
  /help             Show this help
  /quit             Exit
Anything else is sent as a message.";

/// One line of user input
#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    /// `/list`
    List,
    /// `/new`, `/new group`
    New {
        /// Create a group conversation
        group: bool,
    },
    /// `/select <id>`
    Select(String),
    /// `/rename <title>`
    Rename(String),
    /// `/delete <id>`
    Delete(String),
    /// `/models`
    Models,
    /// `/stop`
    Stop,
    /// `/help`
    Help,
    /// `/quit`, `/exit`
    Quit,
    /// Plain text
    Message(String),
    /// Blank line
    Empty,
    /// Malformed slash command, with the reason
    Invalid(String),
}

impl Command {
    /// Parse a line of input
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Message(line.to_string());
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name {
            "list" | "ls" => Self::List,
            "new" => Self::New {
                group: arg == "group",
            },
            "select" | "open" => required(arg, "/select needs a conversation id", Self::Select),
            "rename" => required(arg, "/rename needs a title", Self::Rename),
            "delete" | "rm" => required(arg, "/delete needs a conversation id", Self::Delete),
            "models" => Self::Models,
            "stop" => Self::Stop,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => Self::Invalid(format!("unknown command /{other} (try /help)")),
        }
    }
}

fn required(arg: &str, reason: &str, make: fn(String) -> Command) -> Command {
    if arg.is_empty() {
        Command::Invalid(reason.to_string())
    } else {
        make(arg.to_string())
    }
}

/// Run the interactive loop until `/quit` or end of input
pub async fn run(controller: &mut ChatController) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shown_error = None;

    println!("crossclaw: type /help for commands");
    report_error(controller, &mut shown_error);
    print_active(controller);
    prompt()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle(controller, Command::parse(&line)).await {
                    break;
                }
                report_error(controller, &mut shown_error);
                if !controller.state().is_streaming {
                    prompt()?;
                }
            }
            Some(signal) = controller.next_signal() => {
                render(&signal)?;
                let ended = matches!(&signal, SessionSignal::Event(event) if event.is_terminal());
                let errored = report_error(controller, &mut shown_error);
                if (ended || errored) && !controller.state().is_streaming {
                    prompt()?;
                }
            }
        }
    }

    Ok(())
}

/// Apply a command; returns `false` to exit
async fn handle(controller: &mut ChatController, command: Command) -> bool {
    match command {
        Command::Empty => {}
        Command::Quit => return false,
        Command::Help => println!("{HELP}"),
        Command::Invalid(reason) => println!("{reason}"),
        Command::List => {
            controller.load_conversations().await;
            print_conversations(controller);
        }
        Command::New { group } => {
            if let Some(id) = controller.create_conversation(None, Some(group), None).await {
                println!("new conversation {id}");
            }
        }
        Command::Select(id) => {
            controller.select_conversation(&ConversationId(id)).await;
            print_history(controller);
        }
        Command::Rename(title) => match controller.state().active_conversation_id.clone() {
            Some(id) => controller.rename_conversation(&id, &title).await,
            None => println!("no active conversation"),
        },
        Command::Delete(id) => controller.delete_conversation(&ConversationId(id)).await,
        Command::Models => {
            controller.load_models().await;
            for model in &controller.state().models {
                println!("  {:<40} {}", model.id, model.provider);
            }
        }
        Command::Stop => {
            if controller.state().is_streaming {
                controller.stop_generation();
                println!("\n(stopped)");
            }
        }
        Command::Message(text) => {
            let model = controller.settings().default_model.clone();
            if controller.send_message(&text, &model).is_none() {
                println!("no active conversation: /new or /select <id> first");
            }
        }
    }
    true
}

fn render(signal: &SessionSignal) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    match signal {
        SessionSignal::Opened => tracing::debug!("stream open"),
        SessionSignal::Closed => writeln!(out, "\n(disconnected)")?,
        SessionSignal::Event(event) => match event {
            StreamEvent::AgentTurnStart {
                agent_name: Some(name),
            } => write!(out, "\n[{name}] ")?,
            StreamEvent::AgentTurnStart { agent_name: None } => writeln!(out)?,
            StreamEvent::Chunk { delta, .. } => write!(out, "{delta}")?,
            StreamEvent::ToolCall {
                tool_name,
                tool_args,
            } => {
                let args = tool_args
                    .as_ref()
                    .map(serde_json::Value::to_string)
                    .unwrap_or_default();
                writeln!(out, "\n  -> {tool_name}({args})")?;
            }
            StreamEvent::ToolResult { tool_result } => writeln!(out, "  <- {tool_result}")?,
            StreamEvent::AgentTurnEnd { .. } => writeln!(out)?,
            StreamEvent::Done {} => writeln!(out)?,
            StreamEvent::Error { .. } => {}
        },
    }
    out.flush()
}

/// Print the state error once per occurrence; returns whether it printed
fn report_error(controller: &ChatController, shown: &mut Option<String>) -> bool {
    let current = controller.state().error.clone();
    let fresh = current.is_some() && current != *shown;
    if let (true, Some(error)) = (fresh, current.as_ref()) {
        eprintln!("\nerror: {error}");
    }
    *shown = current;
    fresh
}

fn print_active(controller: &ChatController) {
    if let Some(conversation) = controller.state().active_conversation() {
        println!("conversation: {} ({})", conversation.title, conversation.id);
        print_history(controller);
    }
}

fn print_history(controller: &ChatController) {
    for message in &controller.state().messages {
        let speaker = message
            .agent_name
            .as_deref()
            .unwrap_or(role_label(message.role));
        println!("[{speaker}] {}", message.content);
    }
}

fn role_label(role: crossclaw_core::MessageRole) -> &'static str {
    match role {
        crossclaw_core::MessageRole::User => "you",
        crossclaw_core::MessageRole::Assistant => "assistant",
        crossclaw_core::MessageRole::System => "system",
        crossclaw_core::MessageRole::Tool => "tool",
    }
}

fn print_conversations(controller: &ChatController) {
    let active = controller.state().active_conversation_id.as_ref();
    for conversation in &controller.state().conversations {
        let marker = if Some(&conversation.id) == active { "*" } else { " " };
        let group = if conversation.is_group { " [group]" } else { "" };
        println!(
            "{marker} {}  {}{group}  ({})",
            conversation.id, conversation.title, conversation.model
        );
    }
}

fn prompt() -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    write!(out, "> ")?;
    out.flush()
}

//! Plain-text rendering of session state for the terminal front-end.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::agentic::controllers::{SessionEvent, SessionPhase};
use crate::agentic::models::{
    Agent, Attachment, Conversation, ErrorEntry, ErrorLevel, Message, Notification,
    NotificationVariant, Sender,
};

pub const HELP: &str = "\
Commands:
  /login <user> <pass>   sign in
  /logout                sign out
  /agents                list agents
  /agent <id>            switch agent (clears the chat)
  /new                   start a new chat
  /history               list saved conversations
  /open <n>              open conversation n
  /delete <n>            delete conversation n
  /attach <path>...      attach files (max 5)
  /paste <path>...       paste images from files
  /detach <n>            remove pending attachment n
  /private               toggle private mode
  /thinking <n>          show or hide the thoughts of message n
  /show                  reprint the conversation
  /errors                recent warnings and errors
  /quit                  exit
Anything else is sent as a message.";

/// One-line rendering of an event, or `None` when it needs no output.
pub fn render_event(event: &SessionEvent, agent_name: &str) -> Option<String> {
    match event {
        SessionEvent::LoggedIn { user_id } => Some(format!("Logged in as {user_id}")),
        SessionEvent::LoggedOut => Some("Logged out".to_string()),
        SessionEvent::AgentsLoaded { count } => Some(format!("{count} agents available")),
        SessionEvent::AgentSelected { .. } => None,
        SessionEvent::ConversationsChanged { count } => {
            Some(format!("{count} conversations in history"))
        }
        SessionEvent::ConversationLoaded {
            conversation_id,
            message_count,
            fallback,
        } => Some(if *fallback {
            format!("Opened {conversation_id} without its messages")
        } else {
            format!("Opened {conversation_id} ({message_count} messages)")
        }),
        SessionEvent::MessageAppended { message } => Some(render_message(message, agent_name, false)),
        SessionEvent::ThinkingUpdated {
            thought, is_done, ..
        } => Some(if *is_done {
            format!("  ... {thought} (finishing)")
        } else {
            format!("  ... {thought}")
        }),
        SessionEvent::ThinkingCleared { .. } => None,
        SessionEvent::ChatCleared => Some("-- new chat --".to_string()),
        SessionEvent::ClearingChanged { .. } => None,
        SessionEvent::AttachmentsChanged { count } => Some(format!("{count} attachment(s) pending")),
        SessionEvent::PrivateModeChanged { enabled } => Some(if *enabled {
            "Private mode on".to_string()
        } else {
            "Private mode off".to_string()
        }),
        SessionEvent::NotificationRaised(notification) => Some(render_notification(notification)),
    }
}

pub fn render_message(message: &Message, agent_name: &str, expanded: bool) -> String {
    let speaker = match message.sender {
        Sender::User => "you",
        Sender::Agent => agent_name,
    };
    let mut out = format!("[{} {speaker}] {}", clock(message.timestamp), message.content);

    for attachment in &message.attachments {
        let _ = write!(out, "\n  + {}", render_attachment(attachment));
    }
    if message.error {
        let _ = write!(
            out,
            "\n  ! {}",
            message.error_message.as_deref().unwrap_or("message failed")
        );
    }
    if let Some(thoughts) = &message.thinking {
        let secs = message.thinking_time.unwrap_or_default();
        if expanded {
            let _ = write!(out, "\n  thought for {secs}s:");
            for thought in thoughts {
                let _ = write!(out, "\n    - {thought}");
            }
        } else {
            let _ = write!(out, "\n  (thought for {secs}s, {} steps)", thoughts.len());
        }
    }
    out
}

pub fn render_attachment(attachment: &Attachment) -> String {
    let kind = if attachment.is_image() { "image" } else { "file" };
    match attachment.preview_url() {
        Some(url) => format!("{} ({kind}, {url})", attachment.display_name()),
        None => format!("{} ({kind})", attachment.display_name()),
    }
}

pub fn render_pending(pending: &[Attachment]) -> String {
    if pending.is_empty() {
        return "No attachments".to_string();
    }
    pending
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{:>2}. {}", i + 1, render_attachment(a)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_agents(agents: &[Agent], selected: Option<&str>) -> String {
    if agents.is_empty() {
        return "No agents available".to_string();
    }
    agents
        .iter()
        .map(|agent| {
            let marker = if selected == Some(agent.id.as_str()) { '*' } else { ' ' };
            format!(
                "{marker} {} {:<16} {} - {}",
                agent.icon.glyph(),
                agent.id,
                agent.name,
                agent.description
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_conversations(conversations: &[Conversation], current: Option<&str>) -> String {
    if conversations.is_empty() {
        return "No saved conversations".to_string();
    }
    conversations
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let marker = if current == Some(c.id.as_str()) { '*' } else { ' ' };
            let lock = if c.is_private { " [private]" } else { "" };
            format!(
                "{marker}{:>2}. {} {}{lock}: {}",
                i + 1,
                c.timestamp.format("%Y-%m-%d %H:%M"),
                c.agent_name,
                preview(&c.last_message, 48)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_notification(notification: &Notification) -> String {
    let tag = match notification.variant {
        NotificationVariant::Default => "info",
        NotificationVariant::Destructive => "error",
    };
    format!(
        "[{tag}] {}: {}",
        notification.title, notification.description
    )
}

pub fn render_errors(entries: &[ErrorEntry]) -> String {
    if entries.is_empty() {
        return "No warnings or errors".to_string();
    }
    entries
        .iter()
        .map(|entry| {
            let level = match entry.level {
                ErrorLevel::Error => "ERROR",
                ErrorLevel::Warning => "WARN ",
            };
            let at = DateTime::<Utc>::from(entry.timestamp).format("%H:%M:%S");
            let mut line = format!("{at} {level} {} {}", entry.target, entry.message);
            let mut fields: Vec<_> = entry.fields.iter().collect();
            fields.sort();
            for (key, value) in fields {
                let _ = write!(line, " {key}={value}");
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_status(phase: SessionPhase, agent: Option<&Agent>, private: bool) -> String {
    let agent = agent.map_or("no agent", |a| a.name.as_str());
    let phase = match phase {
        SessionPhase::NoConversation => "idle",
        SessionPhase::Composing => "composing",
        SessionPhase::Sending => "sending",
        SessionPhase::ThinkingActive => "thinking",
        SessionPhase::ViewingHistory => "history",
        SessionPhase::ClearingTransition => "clearing",
    };
    if private {
        format!("{agent} | {phase} | private")
    } else {
        format!("{agent} | {phase}")
    }
}

fn clock(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

fn preview(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() > max_chars {
        let cut: String = line.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        line.to_string()
    }
}

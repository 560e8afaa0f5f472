//! Terminal input parsing and output formatting for the chat loop.
//!
//! Pure functions so the chat handler stays a thin IO shell.

use parley_core::{
    ConversationId, Message, MessageRole, PlaybackPhase, PlaybackSnapshot, SessionEvent,
};

pub const HELP: &str = "\
Commands:
  /stop    silence the current reply
  /reset   abandon the current reply, keep the conversation
  /status  show conversation and playback state
  /end     end the conversation and forget it
  /quit    leave, keeping the conversation for next time";

/// One line typed by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Say(String),
    Stop,
    Reset,
    Status,
    End,
    Quit,
    Help,
    Unknown(String),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };
        match command.to_ascii_lowercase().as_str() {
            "stop" => Self::Stop,
            "reset" => Self::Reset,
            "status" => Self::Status,
            "end" => Self::End,
            "quit" | "exit" | "q" => Self::Quit,
            "help" | "?" => Self::Help,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Text to print for a session event, if any.
///
/// Tokens are printed without a newline so the reply builds up in place.
pub fn format_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Ready {
            conversation_id,
            resumed: true,
        } => Some(format!("Resumed conversation {conversation_id}\n")),
        SessionEvent::Ready {
            conversation_id,
            resumed: false,
        } => Some(format!("Started conversation {conversation_id}\n")),
        SessionEvent::Ended { conversation_id } => {
            Some(format!("Conversation {conversation_id} ended\n"))
        }
        SessionEvent::UserMessage { .. } => None,
        SessionEvent::Token { text, .. } => Some(text.clone()),
        SessionEvent::TurnCompleted { message: Some(_), .. } => Some("\n".to_string()),
        SessionEvent::TurnCompleted { message: None, .. } => Some("(no reply)\n".to_string()),
        SessionEvent::TurnFailed { reason, .. } => Some(format!("\n[reply failed: {reason}]\n")),
    }
}

/// One transcript line, as shown when a conversation is resumed.
pub fn format_message(message: &Message) -> String {
    let speaker = match message.role {
        MessageRole::User => "you",
        MessageRole::Assistant => "them",
    };
    format!("{speaker:>4}: {}", message.content)
}

fn format_phase(phase: PlaybackPhase) -> String {
    match phase {
        PlaybackPhase::Idle => "idle".to_string(),
        PlaybackPhase::Loading(i) => format!("loading chunk {i}"),
        PlaybackPhase::Playing(i) => format!("playing chunk {i}"),
        PlaybackPhase::PlayingFull => "playing whole reply".to_string(),
    }
}

/// Reply to `/status`.
pub fn format_status(
    conversation_id: Option<&ConversationId>,
    user_messages: u32,
    ready_for_assessment: bool,
    playback: &PlaybackSnapshot,
) -> String {
    let conversation = conversation_id.map_or_else(|| "none".to_string(), ToString::to_string);
    let assessment = if ready_for_assessment {
        "ready for assessment"
    } else {
        "not yet ready for assessment"
    };
    format!(
        "conversation: {conversation}\nyour messages: {user_messages} ({assessment})\naudio: {}",
        format_phase(playback.phase)
    )
}

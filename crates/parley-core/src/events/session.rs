//! Conversation session events.

use serde::{Deserialize, Serialize};

use crate::domain::chat::{ConversationId, Message};

/// Events emitted by a `ConversationSession`.
///
/// `turn` identifies the user message a reply belongs to; events for a
/// superseded turn are never emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    // ========== Lifecycle ==========
    /// The session has a conversation and accepts messages.
    Ready {
        conversation_id: ConversationId,
        /// Whether a saved conversation was resumed rather than created.
        resumed: bool,
    },

    /// The conversation was ended locally.
    Ended { conversation_id: ConversationId },

    // ========== Turns ==========
    /// A user message was appended optimistically.
    UserMessage { turn: u64, message: Message },

    /// A fragment of the assistant reply arrived.
    Token { turn: u64, text: String },

    /// The reply completed. `message` is the finalized assistant message, or
    /// `None` when the reply carried no text.
    TurnCompleted {
        turn: u64,
        message: Option<Message>,
    },

    /// The reply failed; the partial text was discarded.
    TurnFailed { turn: u64, reason: String },
}

impl SessionEvent {
    /// The turn this event belongs to, for turn-scoped events.
    #[must_use]
    pub const fn turn(&self) -> Option<u64> {
        match self {
            Self::UserMessage { turn, .. }
            | Self::Token { turn, .. }
            | Self::TurnCompleted { turn, .. }
            | Self::TurnFailed { turn, .. } => Some(*turn),
            Self::Ready { .. } | Self::Ended { .. } => None,
        }
    }
}

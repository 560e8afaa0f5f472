//! Chat domain types.
//!
//! These types represent a persona conversation and its messages in the
//! domain model, independent of any transport concerns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum number of user-authored messages before a conversation can be
/// submitted for assessment.
pub const MIN_USER_MESSAGES_FOR_ASSESSMENT: u32 = 5;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a server-assigned identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Opaque server-assigned conversation identifier.
    ConversationId
);

string_id!(
    /// Identifier of a persisted assistant message (used for whole-clip audio).
    MessageId
);

string_id!(
    /// Identifier correlating chunk fetches to one in-progress synthesis job.
    PendingId
);

/// The role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    /// Parse a role from its wire representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }

    /// Convert role to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single transcript entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message stamped with the current time.
    pub fn now(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A conversation as seen by the client: identity, transcript and the count
/// of user-authored messages.
///
/// Messages are append-only. The user count never decreases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    id: ConversationId,
    messages: Vec<Message>,
    user_message_count: u32,
}

impl Conversation {
    /// Start an empty conversation.
    #[must_use]
    pub const fn new(id: ConversationId) -> Self {
        Self {
            id,
            messages: Vec::new(),
            user_message_count: 0,
        }
    }

    /// Restore a conversation from a server transcript.
    ///
    /// `reported_user_count` is the server's own count when it provides one;
    /// the larger of it and the locally counted user messages wins.
    #[must_use]
    pub fn restore(
        id: ConversationId,
        messages: Vec<Message>,
        reported_user_count: Option<u32>,
    ) -> Self {
        let counted = count_user_messages(&messages);
        Self {
            id,
            messages,
            user_message_count: reported_user_count.map_or(counted, |n| n.max(counted)),
        }
    }

    #[must_use]
    pub const fn id(&self) -> &ConversationId {
        &self.id
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub const fn user_message_count(&self) -> u32 {
        self.user_message_count
    }

    /// Append a user message and bump the user count.
    pub fn push_user(&mut self, content: impl Into<String>) -> &Message {
        self.user_message_count = self.user_message_count.saturating_add(1);
        self.push(Message::now(MessageRole::User, content))
    }

    /// Append a finalized assistant reply.
    pub fn push_assistant(&mut self, content: impl Into<String>) -> &Message {
        self.push(Message::now(MessageRole::Assistant, content))
    }

    /// Whether enough user turns exist to request an assessment.
    #[must_use]
    pub const fn ready_for_assessment(&self) -> bool {
        self.user_message_count >= MIN_USER_MESSAGES_FOR_ASSESSMENT
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }
}

fn count_user_messages(messages: &[Message]) -> u32 {
    let count = messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        assert_eq!(MessageRole::parse("user"), Some(MessageRole::User));
        assert_eq!(MessageRole::parse("assistant"), Some(MessageRole::Assistant));
        assert_eq!(MessageRole::parse("system"), None);
        assert_eq!(MessageRole::Assistant.to_string(), "assistant");
    }

    #[test]
    fn push_user_increments_count() {
        let mut conv = Conversation::new(ConversationId::new("c-1"));
        conv.push_user("hi");
        conv.push_assistant("hello");
        conv.push_user("how are you?");

        assert_eq!(conv.user_message_count(), 2);
        assert_eq!(conv.messages().len(), 3);
        assert_eq!(conv.messages()[1].role, MessageRole::Assistant);
    }

    #[test]
    fn restore_prefers_larger_count() {
        let messages = vec![
            Message::now(MessageRole::User, "a"),
            Message::now(MessageRole::Assistant, "b"),
        ];
        let conv = Conversation::restore(ConversationId::new("c"), messages.clone(), Some(4));
        assert_eq!(conv.user_message_count(), 4);

        let conv = Conversation::restore(ConversationId::new("c"), messages, None);
        assert_eq!(conv.user_message_count(), 1);
    }

    #[test]
    fn assessment_requires_five_user_messages() {
        let mut conv = Conversation::new(ConversationId::new("c"));
        for i in 0..4 {
            conv.push_user(format!("turn {i}"));
        }
        assert!(!conv.ready_for_assessment());
        conv.push_user("fifth");
        assert!(conv.ready_for_assessment());
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = ConversationId::new("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        assert_eq!(id.to_string(), "abc");
    }
}

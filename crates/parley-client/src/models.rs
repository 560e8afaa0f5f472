//! Wire types for the conversation server.
//!
//! These types are internal to `parley-client`. Consumers see the core
//! domain types they are converted into.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parley_core::{ConversationId, ConversationSnapshot, Message, MessageRole};

/// Body of `POST /conversations/`.
#[derive(Debug, Serialize)]
pub struct CreateConversationRequest<'a> {
    /// Optional on the server; omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<&'a str>,
    pub scenario_id: &'a str,
}

/// Body of `POST /conversations/{id}/stream/`.
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub content: &'a str,
}

/// Server ids are UUID strings, but older deployments used integers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Text(String),
    Number(i64),
}

impl From<WireId> for ConversationId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => Self::new(s),
            WireId::Number(n) => Self::new(n.to_string()),
        }
    }
}

/// Minimal shape of a created conversation.
#[derive(Debug, Deserialize)]
pub struct ConversationCreated {
    pub id: WireId,
}

/// `GET /conversations/{id}/`.
#[derive(Debug, Deserialize)]
pub struct ConversationDetail {
    pub id: WireId,
    #[serde(default)]
    pub messages: Vec<WireMessage>,
    #[serde(default, alias = "userMessageCount")]
    pub user_message_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(default, alias = "text")]
    pub content: Option<String>,
    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,
}

impl WireMessage {
    /// Convert to a transcript message. System and tool messages are not
    /// part of the user-visible transcript and yield `None`.
    fn into_message(self) -> Option<Message> {
        let role = MessageRole::parse(&self.role)?;
        Some(Message {
            role,
            content: self.content.unwrap_or_default(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
        })
    }
}

impl From<ConversationDetail> for ConversationSnapshot {
    fn from(detail: ConversationDetail) -> Self {
        Self {
            id: detail.id.into(),
            messages: detail
                .messages
                .into_iter()
                .filter_map(WireMessage::into_message)
                .collect(),
            user_message_count: detail.user_message_count,
        }
    }
}

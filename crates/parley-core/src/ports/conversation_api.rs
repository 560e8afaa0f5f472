//! Conversation API port definition.
//!
//! Creating and fetching conversations is owned by the server; the session
//! only needs these two operations to establish its identity.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::chat::{ConversationId, Message};

/// Errors from the conversation API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Not authorized")]
    Unauthorized,

    #[error("Request failed with status {status}")]
    Status { status: u16 },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },
}

/// A server-side transcript used to resume a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSnapshot {
    pub id: ConversationId,
    pub messages: Vec<Message>,
    /// The server's count of user messages, when reported.
    pub user_message_count: Option<u32>,
}

/// Port for conversation identity operations.
#[async_trait]
pub trait ConversationApi: Send + Sync {
    /// Create a new conversation for an activity and persona.
    async fn create_conversation(
        &self,
        activity_id: &str,
        character_id: &str,
    ) -> Result<ConversationId, ApiError>;

    /// Fetch an existing conversation's transcript.
    async fn fetch_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<ConversationSnapshot, ApiError>;
}

//! Audio retrieval port: numbered chunks and whole clips.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::chat::{ConversationId, MessageId, PendingId};

/// Result of a single chunk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkResponse {
    /// The chunk's encoded audio.
    Ready(Bytes),

    /// The server is still synthesizing this chunk.
    NotReady,
}

/// Hard failures from the audio endpoints.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AudioSourceError {
    #[error("Audio request failed with status {status}")]
    Status { status: u16 },

    #[error("Network error: {message}")]
    Network { message: String },
}

/// Port for fetching synthesized audio.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Fetch one numbered chunk of a pending synthesis job.
    async fn fetch_chunk(
        &self,
        conversation_id: &ConversationId,
        pending_id: &PendingId,
        chunk_index: u32,
    ) -> Result<ChunkResponse, AudioSourceError>;

    /// Fetch the whole clip for a persisted assistant message.
    async fn fetch_full_clip(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Result<Bytes, AudioSourceError>;
}

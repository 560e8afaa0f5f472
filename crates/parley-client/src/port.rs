//! Port trait implementations for `ParleyClient`.
//!
//! Implements the core-owned [`ConversationApi`], [`StreamTransport`] and
//! [`AudioSource`] traits, converting internal client errors into the error
//! type each port defines.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use parley_core::{
    ApiError, AudioSource, AudioSourceError, ByteStream, ChunkResponse, ConversationApi,
    ConversationId, ConversationSnapshot, MessageId, PendingId, StreamTransport, TransportError,
};

use crate::client::ParleyClient;
use crate::error::ClientError;
use crate::http::HttpBackend;

// ============================================================================
// Error Mapping
// ============================================================================

/// Convert a client error from a conversation call into an [`ApiError`].
fn map_api_error(err: ClientError, conversation_id: Option<&ConversationId>) -> ApiError {
    match err {
        ClientError::Status { status: 404, url } => ApiError::NotFound(
            conversation_id.map_or(url, |id| id.to_string()),
        ),
        ClientError::Status {
            status: 401 | 403, ..
        } => ApiError::Unauthorized,
        ClientError::Status { status, .. } => ApiError::Status { status },
        ClientError::Network(e) => ApiError::Network {
            message: e.to_string(),
        },
        ClientError::InvalidResponse { message } => ApiError::InvalidResponse { message },
        ClientError::InvalidUrl(e) => ApiError::InvalidResponse {
            message: e.to_string(),
        },
        e @ ClientError::InvalidBaseUrl { .. } => ApiError::InvalidResponse {
            message: e.to_string(),
        },
        ClientError::JsonParse(e) => ApiError::InvalidResponse {
            message: e.to_string(),
        },
    }
}

/// Convert a client error from the reply stream into a [`TransportError`].
fn map_transport_error(err: ClientError) -> TransportError {
    match err {
        ClientError::Status { status, .. } => TransportError::Status { status },
        ClientError::Network(e) => TransportError::Network {
            message: e.to_string(),
        },
        ClientError::InvalidUrl(e) => TransportError::Network {
            message: e.to_string(),
        },
        e @ ClientError::InvalidBaseUrl { .. } => TransportError::Network {
            message: e.to_string(),
        },
        ClientError::InvalidResponse { message } => TransportError::Decode { message },
        ClientError::JsonParse(e) => TransportError::Decode {
            message: e.to_string(),
        },
    }
}

/// Convert a client error from an audio fetch into an [`AudioSourceError`].
fn map_audio_error(err: ClientError) -> AudioSourceError {
    match err {
        ClientError::Status { status, .. } => AudioSourceError::Status { status },
        other => AudioSourceError::Network {
            message: other.to_string(),
        },
    }
}

// ============================================================================
// Port Implementations
// ============================================================================

#[async_trait]
impl<B: HttpBackend> ConversationApi for ParleyClient<B> {
    async fn create_conversation(
        &self,
        activity_id: &str,
        character_id: &str,
    ) -> Result<ConversationId, ApiError> {
        self.create(activity_id, character_id)
            .await
            .map_err(|e| map_api_error(e, None))
    }

    async fn fetch_conversation(
        &self,
        id: &ConversationId,
    ) -> Result<ConversationSnapshot, ApiError> {
        self.fetch(id).await.map_err(|e| map_api_error(e, Some(id)))
    }
}

#[async_trait]
impl<B: HttpBackend> StreamTransport for ParleyClient<B> {
    async fn open_stream(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<ByteStream, TransportError> {
        let body = self
            .open_reply(conversation_id, text)
            .await
            .map_err(map_transport_error)?;
        Ok(body
            .map(|chunk| chunk.map_err(map_transport_error))
            .boxed())
    }
}

#[async_trait]
impl<B: HttpBackend> AudioSource for ParleyClient<B> {
    async fn fetch_chunk(
        &self,
        conversation_id: &ConversationId,
        pending_id: &PendingId,
        chunk_index: u32,
    ) -> Result<ChunkResponse, AudioSourceError> {
        self.chunk(conversation_id, pending_id, chunk_index)
            .await
            .map_err(map_audio_error)
    }

    async fn fetch_full_clip(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Result<Bytes, AudioSourceError> {
        self.full_clip(conversation_id, message_id)
            .await
            .map_err(map_audio_error)
    }
}

//! Fetching synthesized speech.

use bytes::Bytes;
use parley_core::{ChunkResponse, ConversationId, MessageId, PendingId};
use tracing::debug;

use super::ParleyClient;
use crate::error::{ClientError, ClientResult};
use crate::http::{HttpBackend, RawBody};
use crate::url::{chunk_url, full_clip_url};

/// Statuses the server uses for a chunk that has not been synthesized yet.
const NOT_READY_STATUSES: [u16; 4] = [202, 204, 404, 425];

/// Interpret a chunk response. An empty success body also means "not yet".
fn chunk_response(raw: RawBody, url: &str) -> ClientResult<ChunkResponse> {
    if NOT_READY_STATUSES.contains(&raw.status) {
        return Ok(ChunkResponse::NotReady);
    }
    if !(200..300).contains(&raw.status) {
        return Err(ClientError::Status {
            status: raw.status,
            url: url.to_string(),
        });
    }
    if raw.bytes.is_empty() {
        Ok(ChunkResponse::NotReady)
    } else {
        Ok(ChunkResponse::Ready(raw.bytes))
    }
}

impl<B: HttpBackend> ParleyClient<B> {
    /// Fetch one chunk of a streamed reply's audio.
    pub(crate) async fn chunk(
        &self,
        conversation_id: &ConversationId,
        pending_id: &PendingId,
        chunk_index: u32,
    ) -> ClientResult<ChunkResponse> {
        let url = chunk_url(
            &self.base_url,
            conversation_id.as_str(),
            pending_id.as_str(),
            chunk_index,
        );
        let raw = self.backend.get_bytes(&url).await?;
        debug!(%pending_id, chunk_index, status = raw.status, "Chunk response");
        chunk_response(raw, url.as_str())
    }

    /// Fetch the whole clip for a stored assistant message, applying the
    /// configured voice and speed.
    pub(crate) async fn full_clip(
        &self,
        conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> ClientResult<Bytes> {
        let url = full_clip_url(
            &self.base_url,
            conversation_id.as_str(),
            message_id.as_str(),
            self.voice,
            self.speed,
        );
        let raw = self.backend.get_bytes(&url).await?;
        if !(200..300).contains(&raw.status) {
            return Err(ClientError::Status {
                status: raw.status,
                url: url.to_string(),
            });
        }
        if raw.bytes.is_empty() {
            return Err(ClientError::InvalidResponse {
                message: format!("empty audio for message {message_id}"),
            });
        }
        Ok(raw.bytes)
    }
}

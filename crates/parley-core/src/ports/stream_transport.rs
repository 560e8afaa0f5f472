//! Token stream transport port.
//!
//! The transport only opens the request and hands back raw bytes; framing
//! and decoding belong to [`crate::services::stream::decoder`].

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;

use crate::domain::chat::ConversationId;

/// Raw reply bytes as they arrive from the wire.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Failures while opening or reading a reply stream.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Stream request failed with status {status}")]
    Status { status: u16 },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Failed to decode stream: {message}")]
    Decode { message: String },
}

/// Port for opening one reply stream per user message.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Send `text` to the conversation and return the reply byte stream.
    async fn open_stream(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<ByteStream, TransportError>;
}

#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod events;
pub mod ports;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::{
    AudioPlaybackHandle, AudioSignal, Conversation, ConversationId,
    MIN_USER_MESSAGES_FOR_ASSESSMENT, Message, MessageId, MessageRole, PendingId, StreamEvent,
};
pub use events::SessionEvent;
pub use ports::{
    ApiError, AudioSink, AudioSinkError, AudioSource, AudioSourceError, ByteStream, ChunkResponse,
    CompletionSender, ConversationApi, ConversationSnapshot, NullSink, PlaybackCompletion,
    SinkEvent, StaticToken, StreamTransport, TokenProvider, TransportError,
};
pub use services::{
    AudioChunkScheduler, ChunkFetch, ChunkFetcher, ConversationSession, OfferOutcome,
    PlaybackPhase, PlaybackSnapshot, RetryPolicy, SessionConfig, SessionError, StreamHandle,
    TokenStreamReceiver,
};

// Only exercised by the integration tests under tests/
#[cfg(test)]
use mockall as _;

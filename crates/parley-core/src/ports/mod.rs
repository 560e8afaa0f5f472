//! Port definitions (trait abstractions) for external systems.
//!
//! Ports define the interfaces that the core expects from infrastructure.
//! They contain no implementation details and use only domain types.
//!
//! # Design Rules
//!
//! - No `reqwest` or audio-device types in any signature
//! - Errors are port-owned enums; adapters map their own errors at the boundary
//! - Audio sinks are synchronous; only their completion is awaited

pub mod audio_sink;
pub mod audio_source;
pub mod conversation_api;
pub mod stream_transport;
pub mod token_provider;

pub use audio_sink::{
    AudioSink, AudioSinkError, CompletionSender, NullSink, PlaybackCompletion, SinkEvent,
};
pub use audio_source::{AudioSource, AudioSourceError, ChunkResponse};
pub use conversation_api::{ApiError, ConversationApi, ConversationSnapshot};
pub use stream_transport::{ByteStream, StreamTransport, TransportError};
pub use token_provider::{StaticToken, TokenProvider};

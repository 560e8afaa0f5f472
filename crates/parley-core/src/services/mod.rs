//! Core services - the streaming and playback engine.
//!
//! Services orchestrate between ports and domain logic. They never see a
//! concrete adapter; everything external arrives as an `Arc<dyn Port>`.

pub mod audio;
mod session;
pub mod stream;

pub use audio::{
    AudioChunkScheduler, ChunkFetch, ChunkFetcher, OfferOutcome, PlaybackMachine, PlaybackPhase,
    PlaybackSnapshot, RetryPolicy, Step,
};
pub use session::{ConversationSession, SessionConfig, SessionError};
pub use stream::{StreamDecoder, StreamHandle, TokenStreamReceiver, decode_events};

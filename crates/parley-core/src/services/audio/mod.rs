//! Audio playback: chunk fetching, sequencing and the scheduler that drives
//! the output sink.

mod fetcher;
mod machine;
mod scheduler;

pub use fetcher::{ChunkFetch, ChunkFetcher, RetryPolicy};
pub use machine::{PlaybackMachine, PlaybackPhase, PlaybackSnapshot, Step};
pub use scheduler::{AudioChunkScheduler, OfferOutcome};

#![doc = include_str!("../README.md")]
#![deny(unused_crate_dependencies)]

// Dev-dependency used only by integration tests.
#[cfg(test)]
use async_trait as _;

mod directory;
mod error;

#[cfg(feature = "speaker")]
mod audio_thread;
#[cfg(feature = "speaker")]
mod playback;
#[cfg(feature = "speaker")]
mod speaker;

pub use directory::DirectorySink;
pub use error::VoiceError;
#[cfg(feature = "speaker")]
pub use speaker::SpeakerSink;

//! Audio output sink port.
//!
//! A sink holds at most one loaded buffer. `play()` starts it and hands back
//! a [`PlaybackCompletion`] that resolves with the sink's "ended" or "error"
//! notification. `pause()` silences the sink immediately; any outstanding
//! completion resolves as interrupted.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::oneshot;

/// Errors raised synchronously by a sink.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AudioSinkError {
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Nothing loaded to play")]
    NothingLoaded,
}

/// Notification emitted by a sink when the current buffer stops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// The buffer played to the end.
    Ended,

    /// Playback failed part-way.
    Error(String),
}

/// Resolves once the sink reports the outcome of a `play()` call.
#[derive(Debug)]
pub struct PlaybackCompletion {
    rx: oneshot::Receiver<SinkEvent>,
}

/// Sending half held by the sink implementation.
pub type CompletionSender = oneshot::Sender<SinkEvent>;

impl PlaybackCompletion {
    /// Create a linked sender/completion pair.
    #[must_use]
    pub fn channel() -> (CompletionSender, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// A completion that has already ended.
    #[must_use]
    pub fn ended() -> Self {
        let (tx, completion) = Self::channel();
        let _ = tx.send(SinkEvent::Ended);
        completion
    }

    /// Wait for the sink's notification.
    ///
    /// A sink that drops the sender without reporting (paused, shut down)
    /// yields an error event.
    pub async fn wait(self) -> SinkEvent {
        self.rx
            .await
            .unwrap_or_else(|_| SinkEvent::Error("playback interrupted".to_string()))
    }
}

/// Port for the single audio output shared by a session.
pub trait AudioSink: Send + Sync {
    /// Replace the loaded buffer.
    fn load(&self, audio: Bytes) -> Result<(), AudioSinkError>;

    /// Start playing the loaded buffer.
    fn play(&self) -> Result<PlaybackCompletion, AudioSinkError>;

    /// Stop output immediately. Idempotent.
    fn pause(&self);
}

/// Sink that discards audio and reports every buffer as ended at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AudioSink for NullSink {
    fn load(&self, _audio: Bytes) -> Result<(), AudioSinkError> {
        Ok(())
    }

    fn play(&self) -> Result<PlaybackCompletion, AudioSinkError> {
        Ok(PlaybackCompletion::ended())
    }

    fn pause(&self) {}
}

//! Typed events decoded from a reply stream.

use super::audio::AudioSignal;

/// One decoded record from a reply stream.
///
/// Exactly one terminal event ([`StreamEvent::Done`] or
/// [`StreamEvent::Error`]) closes a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental fragment of reply text.
    Token(String),

    /// Audio for this reply is available (whole clip or chunked).
    AudioReady(AudioSignal),

    /// The reply completed normally.
    Done,

    /// The reply failed; the payload is a user-presentable reason.
    Error(String),
}

impl StreamEvent {
    /// Whether this event closes the stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error(_))
    }
}

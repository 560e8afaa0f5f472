//! Audio output error types.

use parley_core::AudioSinkError;

/// Errors that can occur while producing audio output.
#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// Failed to open the audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStreamError(String),

    /// The clip could not be decoded.
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// `play()` was called before anything was loaded.
    #[error("Nothing loaded to play")]
    NothingLoaded,

    /// The audio thread exited or panicked.
    #[error("Audio thread is no longer running")]
    AudioThreadDied,

    /// IO error (clip directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<VoiceError> for AudioSinkError {
    fn from(err: VoiceError) -> Self {
        match err {
            VoiceError::Decode(message) => Self::Decode(message),
            VoiceError::NothingLoaded => Self::NothingLoaded,
            other @ (VoiceError::OutputStreamError(_)
            | VoiceError::AudioThreadDied
            | VoiceError::Io(_)) => Self::Unavailable(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_onto_sink_errors() {
        assert_eq!(
            AudioSinkError::from(VoiceError::Decode("bad frame".into())),
            AudioSinkError::Decode("bad frame".into())
        );
        assert_eq!(
            AudioSinkError::from(VoiceError::NothingLoaded),
            AudioSinkError::NothingLoaded
        );
        assert_eq!(
            AudioSinkError::from(VoiceError::AudioThreadDied),
            AudioSinkError::Unavailable("Audio thread is no longer running".into())
        );
    }
}

//! [`AudioSink`] on the default output device.

use bytes::Bytes;
use parley_core::{AudioSink, AudioSinkError, PlaybackCompletion};

use crate::audio_thread::AudioThreadHandle;
use crate::error::VoiceError;

/// Plays clips through the speakers.
///
/// Opening the sink claims the default output device; dropping it releases
/// the device and interrupts anything still playing.
pub struct SpeakerSink {
    audio: AudioThreadHandle,
}

impl SpeakerSink {
    /// Open the default output device.
    pub fn open() -> Result<Self, VoiceError> {
        Ok(Self {
            audio: AudioThreadHandle::spawn()?,
        })
    }
}

impl AudioSink for SpeakerSink {
    fn load(&self, audio: Bytes) -> Result<(), AudioSinkError> {
        Ok(self.audio.load(audio)?)
    }

    fn play(&self) -> Result<PlaybackCompletion, AudioSinkError> {
        self.audio.play().map_err(|e| {
            tracing::warn!(error = %e, "Speaker could not play clip");
            AudioSinkError::from(e)
        })
    }

    fn pause(&self) {
        self.audio.stop();
    }
}

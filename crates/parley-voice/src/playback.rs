//! Speaker playback via `rodio`.
//!
//! Plays one clip at a time on the default output device. Each `play()`
//! gets a fresh sink and a watcher thread that reports the natural end of
//! the clip; `stop()` silences the sink and the watcher stays quiet, so the
//! caller's completion resolves as interrupted.

use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use bytes::Bytes;
use parley_core::{CompletionSender, PlaybackCompletion, SinkEvent};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use crate::error::VoiceError;

/// Audio playback on the default output device.
///
/// `OutputStream` is `!Send` on some platforms; this type is only ever
/// owned by the audio thread (see [`AudioThreadHandle`](crate::audio_thread::AudioThreadHandle)).
pub struct AudioPlayback {
    /// rodio output stream (must be kept alive).
    _stream: OutputStream,

    /// Handle used to create sinks.
    stream_handle: OutputStreamHandle,

    /// The clip `play()` will start.
    loaded: Option<Bytes>,

    /// Current playback sink (if any).
    sink: Option<Arc<Sink>>,

    /// Set while the current clip may still report `Ended`.
    active: Option<Arc<AtomicBool>>,
}

impl AudioPlayback {
    /// Open the default output device.
    pub fn new() -> Result<Self, VoiceError> {
        let (stream, stream_handle) = OutputStream::try_default()
            .map_err(|e| VoiceError::OutputStreamError(e.to_string()))?;

        tracing::info!("Audio playback initialized on default output device");

        Ok(Self {
            _stream: stream,
            stream_handle,
            loaded: None,
            sink: None,
            active: None,
        })
    }

    /// Replace the loaded clip. Does not affect what is playing.
    pub fn load(&mut self, audio: Bytes) {
        self.loaded = Some(audio);
    }

    /// Stop whatever is playing and start the loaded clip.
    pub fn play(&mut self) -> Result<PlaybackCompletion, VoiceError> {
        let audio = self.loaded.clone().ok_or(VoiceError::NothingLoaded)?;
        self.stop();

        let source =
            Decoder::new(Cursor::new(audio)).map_err(|e| VoiceError::Decode(e.to_string()))?;
        let sink = Arc::new(
            Sink::try_new(&self.stream_handle)
                .map_err(|e| VoiceError::OutputStreamError(e.to_string()))?,
        );
        sink.append(source);

        let active = Arc::new(AtomicBool::new(true));
        let (tx, completion) = PlaybackCompletion::channel();
        Self::spawn_completion_watcher(Arc::clone(&sink), Arc::clone(&active), tx)?;

        self.sink = Some(sink);
        self.active = Some(active);
        tracing::debug!("Clip playback started");
        Ok(completion)
    }

    /// Block a helper thread until the sink drains, then report `Ended`
    /// unless playback was stopped first.
    fn spawn_completion_watcher(
        sink: Arc<Sink>,
        active: Arc<AtomicBool>,
        tx: CompletionSender,
    ) -> Result<(), VoiceError> {
        thread::Builder::new()
            .name("parley-playback-watch".into())
            .spawn(move || {
                sink.sleep_until_end();
                // A stopped clip drops `tx`, which reads as interrupted.
                if active.swap(false, Ordering::SeqCst) {
                    tracing::debug!("Clip finished naturally");
                    let _ = tx.send(SinkEvent::Ended);
                }
            })?;
        Ok(())
    }

    /// Stop any active playback immediately.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.store(false, Ordering::SeqCst);
        }
        if let Some(sink) = self.sink.take() {
            sink.stop();
            tracing::debug!("Audio playback stopped");
        }
    }
}

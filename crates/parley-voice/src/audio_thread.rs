//! Dedicated audio output thread, isolating `!Send` rodio resources from the
//! async runtime.
//!
//! `rodio::OutputStream` is `!Send` on some platforms. Rather than using
//! `unsafe impl Send/Sync`, the playback state is confined to a single OS
//! thread and driven through [`AudioCommand`]s. [`AudioThreadHandle`] is the
//! `Send + Sync` proxy the sink holds.

use std::sync::mpsc;
use std::thread;

use bytes::Bytes;
use parley_core::PlaybackCompletion;

use crate::error::VoiceError;
use crate::playback::AudioPlayback;

// ── Commands ───────────────────────────────────────────────────────

/// A command sent to the audio thread.
enum AudioCommand {
    /// Replace the loaded clip (fire-and-forget).
    Load { audio: Bytes },

    /// Start the loaded clip.
    Play {
        reply: mpsc::Sender<Result<PlaybackCompletion, VoiceError>>,
    },

    /// Stop any active playback immediately (fire-and-forget).
    Stop,

    /// Shut down the audio thread, releasing the output device.
    Shutdown,
}

// ── Handle (Send + Sync proxy) ─────────────────────────────────────

/// `Send + Sync` handle to the dedicated audio thread.
///
/// Request–reply methods block the caller until the audio thread responds,
/// which takes microseconds plus the decoder setup.
pub struct AudioThreadHandle {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl AudioThreadHandle {
    /// Spawn the audio thread and open the output device on it.
    ///
    /// Device errors are reported back through a one-shot init channel.
    pub fn spawn() -> Result<Self, VoiceError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), VoiceError>>();

        let thread = thread::Builder::new()
            .name("parley-audio".into())
            .spawn(move || Self::run(&cmd_rx, &init_tx))?;

        init_rx.recv().map_err(|_| VoiceError::AudioThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }

    pub fn load(&self, audio: Bytes) -> Result<(), VoiceError> {
        self.cmd_tx
            .send(AudioCommand::Load { audio })
            .map_err(|_| VoiceError::AudioThreadDied)
    }

    pub fn play(&self) -> Result<PlaybackCompletion, VoiceError> {
        let (reply, rx) = mpsc::channel();
        self.cmd_tx
            .send(AudioCommand::Play { reply })
            .map_err(|_| VoiceError::AudioThreadDied)?;
        rx.recv().map_err(|_| VoiceError::AudioThreadDied)?
    }

    pub fn stop(&self) {
        let _ = self.cmd_tx.send(AudioCommand::Stop);
    }

    // ── Audio thread event loop ────────────────────────────────────

    /// Body of the audio thread. Owns `AudioPlayback` for its entire
    /// lifetime.
    fn run(
        cmd_rx: &mpsc::Receiver<AudioCommand>,
        init_tx: &mpsc::Sender<Result<(), VoiceError>>,
    ) {
        let mut playback = match AudioPlayback::new() {
            Ok(p) => p,
            Err(e) => {
                let _ = init_tx.send(Err(e));
                return;
            }
        };

        if init_tx.send(Ok(())).is_err() {
            return;
        }

        while let Ok(cmd) = cmd_rx.recv() {
            match cmd {
                AudioCommand::Load { audio } => playback.load(audio),
                AudioCommand::Play { reply } => {
                    let _ = reply.send(playback.play());
                }
                AudioCommand::Stop => playback.stop(),
                AudioCommand::Shutdown => break,
            }
        }

        playback.stop();
        tracing::debug!("Audio thread shutting down");
    }
}

impl Drop for AudioThreadHandle {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

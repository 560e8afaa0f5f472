//! Sink that writes each played clip to a directory instead of a device.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use parley_core::{AudioSink, AudioSinkError, PlaybackCompletion};
use tracing::{debug, info, warn};

use crate::error::VoiceError;

const CLIP_PREFIX: &str = "clip-";

/// Writes clips as `clip-0001.mp3`, `clip-0002.wav`, ... and reports each as
/// ended as soon as it is on disk.
///
/// Numbering continues after clips already present in the directory.
pub struct DirectorySink {
    dir: PathBuf,
    loaded: Mutex<Option<Bytes>>,
    last_index: AtomicU32,
}

impl DirectorySink {
    /// Use `dir` for clips, creating it if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, VoiceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let last_index = highest_clip_index(&dir)?;
        debug!(dir = %dir.display(), last_index, "Clip directory ready");
        Ok(Self {
            dir,
            loaded: Mutex::new(None),
            last_index: AtomicU32::new(last_index),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_clip(&self, audio: &[u8]) -> Result<PathBuf, VoiceError> {
        let index = self.last_index.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self
            .dir
            .join(format!("{CLIP_PREFIX}{index:04}.{}", extension_for(audio)));
        fs::write(&path, audio)?;
        Ok(path)
    }
}

/// Pick a file extension from the clip's magic bytes. The server sends MP3
/// unless told otherwise.
fn extension_for(audio: &[u8]) -> &'static str {
    if audio.starts_with(b"RIFF") {
        "wav"
    } else if audio.starts_with(b"OggS") {
        "ogg"
    } else {
        "mp3"
    }
}

/// Highest `N` among `clip-N.*` files in `dir`, or 0.
fn highest_clip_index(dir: &Path) -> Result<u32, VoiceError> {
    let mut highest = 0;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let index = name
            .to_str()
            .and_then(|n| n.strip_prefix(CLIP_PREFIX))
            .and_then(|rest| rest.split('.').next())
            .and_then(|digits| digits.parse::<u32>().ok());
        if let Some(index) = index {
            highest = highest.max(index);
        }
    }
    Ok(highest)
}

impl AudioSink for DirectorySink {
    fn load(&self, audio: Bytes) -> Result<(), AudioSinkError> {
        *self.loaded.lock().unwrap_or_else(PoisonError::into_inner) = Some(audio);
        Ok(())
    }

    fn play(&self) -> Result<PlaybackCompletion, AudioSinkError> {
        let audio = self
            .loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(AudioSinkError::NothingLoaded)?;

        match self.write_clip(&audio) {
            Ok(path) => {
                info!(path = %path.display(), bytes = audio.len(), "Wrote clip");
                Ok(PlaybackCompletion::ended())
            }
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Could not write clip");
                Err(e.into())
            }
        }
    }

    fn pause(&self) {}
}

//! Playback sequencing state machine.
//!
//! # Design
//!
//! - Pure synchronous state machine (no async, no IO, no tracing)
//! - Every transition returns a [`Step`] telling the driver what to do next
//! - Events that do not match the current phase return [`Step::Ignored`]
//!
//! ```text
//! Idle ─start(chunked)─▶ Loading(0) ─ready─▶ Playing(0) ─finished─▶ Loading(1) … ─▶ Idle
//!   │                        └──unavailable──────────────────────────▶ Loading(1)
//!   └─start(full clip)─▶ PlayingFull ─finished─▶ Idle
//! ```

use std::collections::BTreeSet;

use crate::domain::audio::AudioPlaybackHandle;
use crate::domain::chat::{ConversationId, MessageId, PendingId};

/// Where the sequencer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    /// Fetching chunk `i`.
    Loading(u32),
    /// Chunk `i` is in the sink.
    Playing(u32),
    /// The whole-clip fallback is being fetched or played.
    PlayingFull,
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    FetchChunk {
        conversation_id: ConversationId,
        pending_id: PendingId,
        index: u32,
    },
    FetchFullClip {
        conversation_id: ConversationId,
        message_id: MessageId,
    },
    /// The run reached `Idle`.
    Finished,
    /// The event did not apply to the current phase.
    Ignored,
}

/// Observable copy of the machine's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    /// Run identity; bumps on every start or stop.
    pub generation: u64,
    pub phase: PlaybackPhase,
    /// Last chunk handed to the sink, `None` before the first.
    pub current_index: Option<u32>,
    pub attempted: Vec<u32>,
    pub total_chunks: Option<u32>,
    /// Buffers played in this run, chunks or whole clip.
    pub played: u32,
}

impl PlaybackSnapshot {
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.phase, PlaybackPhase::Idle)
    }
}

/// Sequencer for one playback handle at a time.
#[derive(Debug, Default)]
pub struct PlaybackMachine {
    phase: PlaybackPhase,
    current_index: Option<u32>,
    attempted: BTreeSet<u32>,
    handle: Option<AudioPlaybackHandle>,
    played: u32,
}

impl PlaybackMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    #[must_use]
    pub const fn current_index(&self) -> Option<u32> {
        self.current_index
    }

    #[must_use]
    pub const fn handle(&self) -> Option<&AudioPlaybackHandle> {
        self.handle.as_ref()
    }

    #[must_use]
    pub const fn played(&self) -> u32 {
        self.played
    }

    #[must_use]
    pub fn is_attempted(&self, index: u32) -> bool {
        self.attempted.contains(&index)
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self.phase, PlaybackPhase::Idle)
    }

    /// Reset per-handle state and begin sequencing `handle`.
    pub fn start(&mut self, handle: AudioPlaybackHandle) -> Step {
        self.attempted.clear();
        self.current_index = None;
        self.played = 0;

        let full_clip = match &handle {
            AudioPlaybackHandle::FullClip {
                conversation_id,
                message_id,
            } => Some(Step::FetchFullClip {
                conversation_id: conversation_id.clone(),
                message_id: message_id.clone(),
            }),
            AudioPlaybackHandle::Chunked { .. } => None,
        };
        self.handle = Some(handle);

        match full_clip {
            Some(step) => {
                self.phase = PlaybackPhase::PlayingFull;
                step
            }
            None => self.enter_loading(0),
        }
    }

    /// Fold a repeated signal for the render already loaded into this run.
    ///
    /// Returns `false` when `handle` addresses a different render. A larger
    /// total extends a run that is still going. Attempted chunks are never
    /// replayed.
    pub fn absorb_repeat(&mut self, handle: &AudioPlaybackHandle) -> bool {
        let running = !self.is_idle();
        let Some(current) = self.handle.as_mut() else {
            return false;
        };
        if !current.same_render(handle) {
            return false;
        }
        if let (
            AudioPlaybackHandle::Chunked { total_chunks, .. },
            AudioPlaybackHandle::Chunked {
                total_chunks: offered,
                ..
            },
        ) = (current, handle)
            && running
            && *offered > *total_chunks
        {
            *total_chunks = *offered;
        }
        true
    }

    /// Chunk `index` was fetched and is about to be loaded into the sink.
    pub fn chunk_ready(&mut self, index: u32) -> bool {
        if self.phase != PlaybackPhase::Loading(index) {
            return false;
        }
        self.phase = PlaybackPhase::Playing(index);
        self.current_index = Some(index);
        true
    }

    /// The sink accepted the buffer and started playing it.
    pub const fn buffer_started(&mut self) {
        self.played += 1;
    }

    /// Chunk `index` could not be fetched; skip it.
    pub fn chunk_unavailable(&mut self, index: u32) -> Step {
        if self.phase != PlaybackPhase::Loading(index) {
            return Step::Ignored;
        }
        self.attempted.insert(index);
        self.enter_loading(index + 1)
    }

    /// The sink reported "ended" or "error" for chunk `index`.
    pub fn chunk_finished(&mut self, index: u32) -> Step {
        if self.phase != PlaybackPhase::Playing(index) {
            return Step::Ignored;
        }
        self.attempted.insert(index);
        self.enter_loading(index + 1)
    }

    /// The whole clip was fetched and is about to be played.
    pub const fn full_clip_ready(&self) -> bool {
        matches!(self.phase, PlaybackPhase::PlayingFull)
    }

    /// The whole clip ended, failed, or could not be fetched.
    pub fn full_clip_finished(&mut self) -> Step {
        if self.phase != PlaybackPhase::PlayingFull {
            return Step::Ignored;
        }
        self.phase = PlaybackPhase::Idle;
        Step::Finished
    }

    /// Force `Idle` and drop the handle.
    pub fn stop(&mut self) {
        *self = Self::default();
    }

    #[must_use]
    pub fn snapshot(&self, generation: u64) -> PlaybackSnapshot {
        PlaybackSnapshot {
            generation,
            phase: self.phase,
            current_index: self.current_index,
            attempted: self.attempted.iter().copied().collect(),
            total_chunks: self.total_chunks(),
            played: self.played,
        }
    }

    fn total_chunks(&self) -> Option<u32> {
        match &self.handle {
            Some(AudioPlaybackHandle::Chunked { total_chunks, .. }) => Some(total_chunks.get()),
            _ => None,
        }
    }

    /// Move to `Loading(index)`, skipping indices that were already attempted.
    fn enter_loading(&mut self, mut index: u32) -> Step {
        let Some(AudioPlaybackHandle::Chunked {
            conversation_id,
            pending_id,
            total_chunks,
        }) = &self.handle
        else {
            self.phase = PlaybackPhase::Idle;
            return Step::Finished;
        };

        while index < total_chunks.get() && self.attempted.contains(&index) {
            index += 1;
        }
        if index >= total_chunks.get() {
            self.phase = PlaybackPhase::Idle;
            return Step::Finished;
        }

        self.phase = PlaybackPhase::Loading(index);
        Step::FetchChunk {
            conversation_id: conversation_id.clone(),
            pending_id: pending_id.clone(),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU32;

    use super::*;

    fn chunked(total: u32) -> AudioPlaybackHandle {
        AudioPlaybackHandle::Chunked {
            conversation_id: ConversationId::new("c"),
            pending_id: PendingId::new("p"),
            total_chunks: NonZeroU32::new(total).unwrap(),
        }
    }

    fn fetch_index(step: &Step) -> u32 {
        match step {
            Step::FetchChunk { index, .. } => *index,
            other => panic!("expected a chunk fetch, got {other:?}"),
        }
    }

    #[test]
    fn start_enters_loading_zero() {
        let mut machine = PlaybackMachine::new();
        let step = machine.start(chunked(3));
        assert_eq!(fetch_index(&step), 0);
        assert_eq!(machine.phase(), PlaybackPhase::Loading(0));
        assert_eq!(machine.current_index(), None);
    }

    #[test]
    fn sequencing_skips_unavailable_chunks() {
        let mut machine = PlaybackMachine::new();
        let mut step = machine.start(chunked(5));
        let mut played = Vec::new();
        while let Step::FetchChunk { index, .. } = step {
            step = if index == 2 {
                machine.chunk_unavailable(index)
            } else {
                assert!(machine.chunk_ready(index));
                machine.buffer_started();
                played.push(index);
                machine.chunk_finished(index)
            };
        }

        assert_eq!(step, Step::Finished);
        assert_eq!(played, vec![0, 1, 3, 4]);
        assert!(machine.is_idle());
        assert_eq!(machine.played(), 4);
        assert!((0..5).all(|i| machine.is_attempted(i)));
    }

    #[test]
    fn out_of_phase_events_are_ignored() {
        let mut machine = PlaybackMachine::new();
        machine.start(chunked(2));
        assert!(!machine.chunk_ready(1));
        assert_eq!(machine.chunk_finished(0), Step::Ignored);
        assert_eq!(machine.full_clip_finished(), Step::Ignored);
        assert_eq!(machine.phase(), PlaybackPhase::Loading(0));
    }

    #[test]
    fn full_clip_is_a_single_step() {
        let mut machine = PlaybackMachine::new();
        let step = machine.start(AudioPlaybackHandle::FullClip {
            conversation_id: ConversationId::new("c"),
            message_id: MessageId::new("m"),
        });
        assert!(matches!(step, Step::FetchFullClip { .. }));
        assert_eq!(machine.phase(), PlaybackPhase::PlayingFull);
        assert!(machine.full_clip_ready());
        assert_eq!(machine.played(), 0);
        machine.buffer_started();
        assert_eq!(machine.full_clip_finished(), Step::Finished);
        assert_eq!(machine.played(), 1);
        assert!(machine.is_idle());
    }

    #[test]
    fn stop_resets_everything() {
        let mut machine = PlaybackMachine::new();
        machine.start(chunked(3));
        machine.chunk_ready(0);
        machine.stop();

        let snapshot = machine.snapshot(7);
        assert_eq!(snapshot.phase, PlaybackPhase::Idle);
        assert_eq!(snapshot.generation, 7);
        assert!(snapshot.attempted.is_empty());
        assert_eq!(snapshot.total_chunks, None);
        assert!(machine.handle().is_none());
    }

    #[test]
    fn ready_chunk_is_not_counted_until_the_sink_starts_it() {
        let mut machine = PlaybackMachine::new();
        machine.start(chunked(2));
        assert!(machine.chunk_ready(0));
        assert_eq!(machine.played(), 0);
        assert_eq!(fetch_index(&machine.chunk_finished(0)), 1);
        assert_eq!(machine.snapshot(1).played, 0);
    }

    #[test]
    fn repeated_signal_keeps_progress() {
        let mut machine = PlaybackMachine::new();
        machine.start(chunked(3));
        machine.chunk_ready(0);
        machine.chunk_finished(0);

        assert!(machine.absorb_repeat(&chunked(3)));
        assert_eq!(machine.phase(), PlaybackPhase::Loading(1));
        assert_eq!(machine.snapshot(1).attempted, vec![0]);

        let other = AudioPlaybackHandle::Chunked {
            conversation_id: ConversationId::new("c"),
            pending_id: PendingId::new("q"),
            total_chunks: NonZeroU32::new(3).unwrap(),
        };
        assert!(!machine.absorb_repeat(&other));
    }

    #[test]
    fn repeated_signal_with_larger_total_extends_the_run() {
        let mut machine = PlaybackMachine::new();
        machine.start(chunked(1));
        machine.chunk_ready(0);
        assert!(machine.absorb_repeat(&chunked(2)));
        assert_eq!(machine.snapshot(1).total_chunks, Some(2));
        assert_eq!(fetch_index(&machine.chunk_finished(0)), 1);

        assert!(machine.absorb_repeat(&chunked(1)));
        assert_eq!(machine.snapshot(1).total_chunks, Some(2));
    }

    #[test]
    fn single_chunk_run() {
        let mut machine = PlaybackMachine::new();
        assert_eq!(fetch_index(&machine.start(chunked(1))), 0);
        assert!(machine.chunk_ready(0));
        assert_eq!(machine.chunk_finished(0), Step::Finished);
        assert_eq!(machine.snapshot(1).attempted, vec![0]);
    }
}

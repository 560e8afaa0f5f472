//! Serialized fetch/play driver around [`PlaybackMachine`].
//!
//! Each `start` opens a new run identified by a generation number. The run's
//! task owns the fetch/play loop; every sink call is made under the state
//! lock after checking that the run is still current, so a superseded run
//! can never touch the sink again.
//!
//! # Turn fallback
//!
//! Within one turn a whole-clip handle is the fallback for chunked audio:
//! - it fires at most once per turn,
//! - it is deferred while a chunked run is active and has not played yet,
//!   and fires when that run ends with nothing played,
//! - it is dropped if chunks already played,
//! - chunk handles arriving after it fired are ignored.
//!
//! A chunk signal repeating the render already in the machine never restarts
//! it; a larger total only extends the run.
//!
//! A buffer counts as played once the sink has started it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::fetcher::{ChunkFetch, ChunkFetcher, RetryPolicy};
use super::machine::{PlaybackMachine, PlaybackSnapshot, Step};
use crate::domain::audio::AudioPlaybackHandle;
use crate::ports::audio_sink::{AudioSink, PlaybackCompletion, SinkEvent};
use crate::ports::audio_source::AudioSource;

/// What [`AudioChunkScheduler::offer`] did with a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Started,
    /// Held until the active chunked run ends.
    Deferred,
    Ignored,
}

/// Owns playback order for one session.
#[derive(Clone)]
pub struct AudioChunkScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    fetcher: ChunkFetcher,
    source: Arc<dyn AudioSource>,
    sink: Arc<dyn AudioSink>,
    state: Mutex<RunState>,
    snapshots: watch::Sender<PlaybackSnapshot>,
}

struct RunState {
    generation: u64,
    cancel: CancellationToken,
    machine: PlaybackMachine,
    turn: TurnAudio,
}

#[derive(Debug, Default)]
struct TurnAudio {
    full_clip_fired: bool,
    deferred_full_clip: Option<AudioPlaybackHandle>,
    chunks_played: u32,
    silenced: bool,
}

enum Played {
    Started(PlaybackCompletion),
    /// The sink refused the buffer; handled like "ended".
    Failed,
    Stale,
}

impl AudioChunkScheduler {
    pub fn new(
        source: Arc<dyn AudioSource>,
        sink: Arc<dyn AudioSink>,
        policy: RetryPolicy,
    ) -> Self {
        let (snapshots, _) = watch::channel(PlaybackSnapshot::default());
        Self {
            inner: Arc::new(Inner {
                fetcher: ChunkFetcher::new(Arc::clone(&source), policy),
                source,
                sink,
                state: Mutex::new(RunState {
                    generation: 0,
                    cancel: CancellationToken::new(),
                    machine: PlaybackMachine::new(),
                    turn: TurnAudio::default(),
                }),
                snapshots,
            }),
        }
    }

    /// Stop any current run and start sequencing `handle`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, handle: AudioPlaybackHandle) {
        let mut st = self.inner.lock();
        Inner::start_locked(&self.inner, &mut st, handle);
    }

    /// Offer a handle for the current turn, applying the fallback rules.
    pub fn offer(&self, handle: AudioPlaybackHandle) -> OfferOutcome {
        let mut st = self.inner.lock();

        if st.turn.silenced || st.turn.full_clip_fired {
            debug!(chunked = handle.is_chunked(), "Audio handle ignored for this turn");
            return OfferOutcome::Ignored;
        }

        if handle.is_chunked() {
            if st.machine.absorb_repeat(&handle) {
                debug!(
                    generation = st.generation,
                    "Repeated chunk signal, keeping the current run"
                );
                self.inner.publish(&st);
                return OfferOutcome::Ignored;
            }
            Inner::start_locked(&self.inner, &mut st, handle);
            return OfferOutcome::Started;
        }

        let chunked_active = !st.machine.is_idle()
            && st
                .machine
                .handle()
                .is_some_and(AudioPlaybackHandle::is_chunked);
        let played = st.turn.chunks_played
            + if chunked_active {
                st.machine.played()
            } else {
                0
            };

        if played > 0 {
            debug!(played, "Chunks already played, whole clip not needed");
            OfferOutcome::Ignored
        } else if chunked_active {
            debug!("Deferring whole clip until the chunked run ends");
            st.turn.deferred_full_clip = Some(handle);
            OfferOutcome::Deferred
        } else {
            st.turn.full_clip_fired = true;
            Inner::start_locked(&self.inner, &mut st, handle);
            OfferOutcome::Started
        }
    }

    /// Stop playback and reset the per-turn fallback state.
    pub fn begin_turn(&self) {
        let mut st = self.inner.lock();
        self.inner.stop_locked(&mut st);
        st.turn = TurnAudio::default();
    }

    /// Pause the sink and force `Idle`. Idempotent.
    ///
    /// Audio offered later in the same turn is ignored.
    pub fn stop(&self) {
        let mut st = self.inner.lock();
        self.inner.stop_locked(&mut st);
        st.turn.silenced = true;
        st.turn.deferred_full_clip = None;
    }

    #[must_use]
    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    /// Watch playback state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.inner.snapshots.subscribe()
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, st: &RunState) {
        self.snapshots
            .send_replace(st.machine.snapshot(st.generation));
    }

    fn invalidate(&self, st: &mut RunState) {
        let interrupted_chunked = !st.machine.is_idle()
            && st
                .machine
                .handle()
                .is_some_and(AudioPlaybackHandle::is_chunked);
        if interrupted_chunked {
            st.turn.chunks_played += st.machine.played();
        }

        st.cancel.cancel();
        st.cancel = CancellationToken::new();
        st.generation += 1;
        self.sink.pause();
    }

    fn start_locked(this: &Arc<Self>, st: &mut RunState, handle: AudioPlaybackHandle) {
        this.invalidate(st);
        let chunked = handle.is_chunked();
        let step = st.machine.start(handle);
        this.publish(st);
        info!(generation = st.generation, chunked, "Playback run started");

        tokio::spawn(drive(
            Arc::clone(this),
            st.generation,
            st.cancel.clone(),
            step,
        ));
    }

    fn stop_locked(&self, st: &mut RunState) {
        self.invalidate(st);
        st.machine.stop();
        self.publish(st);
        debug!(generation = st.generation, "Playback stopped");
    }

    /// Apply a machine transition if `generation` is still current.
    fn transition(&self, generation: u64, f: impl FnOnce(&mut PlaybackMachine) -> Step) -> Step {
        let mut st = self.lock();
        if st.generation != generation {
            return Step::Ignored;
        }
        let step = f(&mut st.machine);
        debug!(generation, phase = ?st.machine.phase(), "Playback transition");
        self.publish(&st);
        step
    }

    /// Load and play a buffer if the run is still current and `admit` accepts.
    fn play(
        &self,
        generation: u64,
        audio: Bytes,
        admit: impl FnOnce(&mut PlaybackMachine) -> bool,
    ) -> Played {
        let mut st = self.lock();
        if st.generation != generation || !admit(&mut st.machine) {
            return Played::Stale;
        }
        self.publish(&st);

        match self.sink.load(audio).and_then(|()| self.sink.play()) {
            Ok(completion) => {
                st.machine.buffer_started();
                self.publish(&st);
                Played::Started(completion)
            }
            Err(e) => {
                warn!(generation, error = %e, "Sink rejected audio, skipping");
                Played::Failed
            }
        }
    }

    /// Close out a run; may chain into a deferred whole clip.
    fn finish_run(&self, generation: u64) -> Option<Step> {
        let mut st = self.lock();
        if st.generation != generation {
            return None;
        }

        let chunked = st
            .machine
            .handle()
            .is_some_and(AudioPlaybackHandle::is_chunked);
        let played = st.machine.played();
        if chunked {
            st.turn.chunks_played += played;
        }
        self.publish(&st);
        info!(generation, played, "Playback run finished");

        if chunked
            && st.turn.chunks_played == 0
            && !st.turn.full_clip_fired
            && let Some(full_clip) = st.turn.deferred_full_clip.take()
        {
            warn!(generation, "No chunk played, falling back to whole clip");
            st.turn.full_clip_fired = true;
            let step = st.machine.start(full_clip);
            self.publish(&st);
            return Some(step);
        }
        None
    }
}

/// Wait for the sink to finish the current buffer. Returns `false` if the
/// run was cancelled first.
async fn await_completion(cancel: &CancellationToken, completion: PlaybackCompletion) -> bool {
    tokio::select! {
        biased;

        () = cancel.cancelled() => false,

        event = completion.wait() => {
            if let SinkEvent::Error(reason) = event {
                warn!(%reason, "Sink reported an error, moving on");
            }
            true
        }
    }
}

async fn drive(inner: Arc<Inner>, generation: u64, cancel: CancellationToken, mut step: Step) {
    loop {
        step = match step {
            Step::FetchChunk {
                conversation_id,
                pending_id,
                index,
            } => {
                let fetched = tokio::select! {
                    biased;

                    () = cancel.cancelled() => return,

                    fetched = inner.fetcher.fetch(&conversation_id, &pending_id, index) => fetched,
                };

                match fetched {
                    ChunkFetch::Ready(audio) => {
                        match inner.play(generation, audio, |m| m.chunk_ready(index)) {
                            Played::Started(completion) => {
                                if !await_completion(&cancel, completion).await {
                                    return;
                                }
                            }
                            Played::Failed => {}
                            Played::Stale => return,
                        }
                        inner.transition(generation, |m| m.chunk_finished(index))
                    }
                    ChunkFetch::Unavailable => {
                        inner.transition(generation, |m| m.chunk_unavailable(index))
                    }
                }
            }

            Step::FetchFullClip {
                conversation_id,
                message_id,
            } => {
                let fetched = tokio::select! {
                    biased;

                    () = cancel.cancelled() => return,

                    fetched = inner.source.fetch_full_clip(&conversation_id, &message_id) => fetched,
                };

                match fetched {
                    Ok(audio) => match inner.play(generation, audio, |m| m.full_clip_ready()) {
                        Played::Started(completion) => {
                            if !await_completion(&cancel, completion).await {
                                return;
                            }
                        }
                        Played::Failed => {}
                        Played::Stale => return,
                    },
                    Err(e) => {
                        error!(generation, message_id = %message_id, error = %e, "Whole-clip fetch failed");
                    }
                }
                inner.transition(generation, PlaybackMachine::full_clip_finished)
            }

            Step::Finished => match inner.finish_run(generation) {
                Some(next) => next,
                None => return,
            },

            Step::Ignored => return,
        };
    }
}

impl std::fmt::Debug for AudioChunkScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        f.debug_struct("AudioChunkScheduler")
            .field("generation", &snapshot.generation)
            .field("phase", &snapshot.phase)
            .finish_non_exhaustive()
    }
}

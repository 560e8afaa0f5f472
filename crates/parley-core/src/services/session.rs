//! Conversation session: identity, transcript and per-turn orchestration.
//!
//! The session owns one [`TokenStreamReceiver`] and one
//! [`AudioChunkScheduler`]. Each `send` opens a new turn; the turn number is
//! checked under the state lock on every stream event, so events from a
//! superseded turn (new message, reset, end) are dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::audio::{AudioChunkScheduler, PlaybackSnapshot, RetryPolicy};
use super::stream::{StreamHandle, TokenStreamReceiver};
use crate::domain::chat::{
    Conversation, ConversationId, MIN_USER_MESSAGES_FOR_ASSESSMENT, Message,
};
use crate::domain::stream::StreamEvent;
use crate::events::SessionEvent;
use crate::ports::{ApiError, AudioSink, AudioSource, ConversationApi, StreamTransport};

/// Errors surfaced by [`ConversationSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("No active conversation")]
    NoConversation,

    /// Neither resuming nor creating a conversation worked.
    #[error("Could not start a conversation: {create}")]
    Initialization {
        /// Why the saved conversation could not be resumed, if one was given.
        resume: Option<ApiError>,
        #[source]
        create: ApiError,
    },
}

/// Session tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Retry policy for audio chunk fetches.
    pub retry: RetryPolicy,
    /// User messages required before an assessment may be requested.
    pub assessment_threshold: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            assessment_threshold: MIN_USER_MESSAGES_FOR_ASSESSMENT,
        }
    }
}

#[derive(Default)]
struct SessionState {
    conversation: Option<Conversation>,
    /// In-progress assistant reply; never part of the transcript.
    streaming: String,
    turn: u64,
    stream: Option<StreamHandle>,
}

/// Orchestrates one user's conversation with a persona.
pub struct ConversationSession {
    api: Arc<dyn ConversationApi>,
    receiver: TokenStreamReceiver,
    scheduler: AudioChunkScheduler,
    config: SessionConfig,
    state: Arc<Mutex<SessionState>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ConversationSession {
    /// Build a session and the channel its events are reported on.
    pub fn new(
        api: Arc<dyn ConversationApi>,
        transport: Arc<dyn StreamTransport>,
        source: Arc<dyn AudioSource>,
        sink: Arc<dyn AudioSink>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let session = Self {
            api,
            receiver: TokenStreamReceiver::new(transport),
            scheduler: AudioChunkScheduler::new(source, sink, config.retry),
            config,
            state: Arc::new(Mutex::new(SessionState::default())),
            events,
        };
        (session, rx)
    }

    /// Resume `saved_id` if given and reachable, otherwise create a new
    /// conversation for the activity and persona.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Initialization`] when both resuming and
    /// creating fail; the session then has no conversation.
    pub async fn initialize(
        &self,
        saved_id: Option<ConversationId>,
        activity_id: &str,
        character_id: &str,
    ) -> Result<ConversationId, SessionError> {
        let mut resume_error = None;

        if let Some(saved_id) = saved_id {
            match self.api.fetch_conversation(&saved_id).await {
                Ok(snapshot) => {
                    let conversation = Conversation::restore(
                        snapshot.id,
                        snapshot.messages,
                        snapshot.user_message_count,
                    );
                    return Ok(self.install(conversation, true));
                }
                Err(e) => {
                    warn!(conversation_id = %saved_id, error = %e, "Could not resume conversation, creating a new one");
                    resume_error = Some(e);
                }
            }
        }

        match self
            .api
            .create_conversation(activity_id, character_id)
            .await
        {
            Ok(id) => Ok(self.install(Conversation::new(id), false)),
            Err(create) => {
                error!(activity_id, character_id, error = %create, "Could not create conversation");
                Err(SessionError::Initialization {
                    resume: resume_error,
                    create,
                })
            }
        }
    }

    /// Send a user message and open a reply stream for it.
    ///
    /// Returns the new turn number. Any in-flight reply and its audio are
    /// abandoned. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Empty or whitespace-only text and a missing conversation are rejected
    /// without touching the session.
    pub fn send(&self, text: &str) -> Result<u64, SessionError> {
        if text.trim().is_empty() {
            return Err(SessionError::EmptyMessage);
        }

        let mut st = lock_state(&self.state);
        let Some(conversation) = st.conversation.as_mut() else {
            return Err(SessionError::NoConversation);
        };
        let conversation_id = conversation.id().clone();
        let message = conversation.push_user(text).clone();

        if let Some(previous) = st.stream.take() {
            previous.cancel();
        }
        st.turn += 1;
        st.streaming.clear();
        let turn = st.turn;

        self.scheduler.begin_turn();
        self.emit(SessionEvent::UserMessage { turn, message });

        let on_event = self.turn_handler(turn, conversation_id.clone());
        st.stream = Some(self.receiver.open(conversation_id, text, on_event));
        info!(turn, "Turn opened");
        Ok(turn)
    }

    /// Stop playback, drop the conversation locally and report `Ended`.
    /// Idempotent; nothing is sent to the server.
    pub fn end(&self) {
        let mut st = lock_state(&self.state);
        self.interrupt(&mut st);
        if let Some(conversation) = st.conversation.take() {
            info!(conversation_id = %conversation.id(), "Conversation ended");
            self.emit(SessionEvent::Ended {
                conversation_id: conversation.id().clone(),
            });
        }
    }

    /// Abandon the in-flight reply and its audio, keeping the conversation.
    pub fn reset(&self) {
        let mut st = lock_state(&self.state);
        self.interrupt(&mut st);
        debug!(turn = st.turn, "Session reset");
    }

    /// Silence audio for the current turn.
    pub fn stop_playback(&self) {
        self.scheduler.stop();
    }

    #[must_use]
    pub fn conversation_id(&self) -> Option<ConversationId> {
        lock_state(&self.state)
            .conversation
            .as_ref()
            .map(|c| c.id().clone())
    }

    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        lock_state(&self.state)
            .conversation
            .as_ref()
            .map(|c| c.messages().to_vec())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn user_message_count(&self) -> u32 {
        lock_state(&self.state)
            .conversation
            .as_ref()
            .map_or(0, Conversation::user_message_count)
    }

    /// Whether enough user messages exist to request an assessment.
    #[must_use]
    pub fn ready_for_assessment(&self) -> bool {
        self.user_message_count() >= self.config.assessment_threshold
    }

    /// The reply text received so far for the current turn.
    #[must_use]
    pub fn streaming_text(&self) -> String {
        lock_state(&self.state).streaming.clone()
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        lock_state(&self.state)
            .stream
            .as_ref()
            .is_some_and(|s| !s.is_finished())
    }

    #[must_use]
    pub const fn scheduler(&self) -> &AudioChunkScheduler {
        &self.scheduler
    }

    /// Watch playback state changes.
    #[must_use]
    pub fn playback(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.scheduler.subscribe()
    }

    fn install(&self, conversation: Conversation, resumed: bool) -> ConversationId {
        let mut st = lock_state(&self.state);
        self.interrupt(&mut st);

        let conversation_id = conversation.id().clone();
        info!(
            conversation_id = %conversation_id,
            resumed,
            messages = conversation.messages().len(),
            "Conversation ready"
        );
        st.conversation = Some(conversation);
        self.emit(SessionEvent::Ready {
            conversation_id: conversation_id.clone(),
            resumed,
        });
        conversation_id
    }

    /// Invalidate the current turn: cancel its stream, stop its audio and
    /// discard its partial reply.
    fn interrupt(&self, st: &mut SessionState) {
        if let Some(stream) = st.stream.take() {
            stream.cancel();
        }
        st.turn += 1;
        st.streaming.clear();
        self.scheduler.stop();
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    fn turn_handler(
        &self,
        turn: u64,
        conversation_id: ConversationId,
    ) -> impl FnMut(StreamEvent) + Send + 'static {
        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let scheduler = self.scheduler.clone();

        move |event| {
            let mut st = lock_state(&state);
            if st.turn != turn {
                debug!(turn, "Dropping event for a superseded turn");
                return;
            }

            match event {
                StreamEvent::Token(text) => {
                    st.streaming.push_str(&text);
                    let _ = events.send(SessionEvent::Token { turn, text });
                }
                StreamEvent::AudioReady(signal) => {
                    match signal.into_handle(conversation_id.clone()) {
                        Some(handle) => {
                            let outcome = scheduler.offer(handle);
                            debug!(turn, ?outcome, "Audio offered to scheduler");
                        }
                        None => {
                            warn!(turn, "Ignoring chunk metadata without a usable chunk count");
                        }
                    }
                }
                StreamEvent::Done => {
                    st.stream = None;
                    let reply = std::mem::take(&mut st.streaming);
                    let message = if reply.is_empty() {
                        None
                    } else {
                        st.conversation
                            .as_mut()
                            .map(|c| c.push_assistant(reply).clone())
                    };
                    info!(turn, has_text = message.is_some(), "Turn completed");
                    let _ = events.send(SessionEvent::TurnCompleted { turn, message });
                }
                StreamEvent::Error(reason) => {
                    st.stream = None;
                    st.streaming.clear();
                    warn!(turn, %reason, "Turn failed");
                    let _ = events.send(SessionEvent::TurnFailed { turn, reason });
                }
            }
        }
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        let mut st = lock_state(&self.state);
        if let Some(stream) = st.stream.take() {
            stream.cancel();
        }
        st.turn += 1;
        self.scheduler.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialization_error_reports_create_failure() {
        let err = SessionError::Initialization {
            resume: Some(ApiError::NotFound("old".into())),
            create: ApiError::Status { status: 503 },
        };
        assert_eq!(
            err.to_string(),
            "Could not start a conversation: Request failed with status 503"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn default_config_uses_assessment_minimum() {
        let config = SessionConfig::default();
        assert_eq!(config.assessment_threshold, MIN_USER_MESSAGES_FOR_ASSESSMENT);
        assert_eq!(config.retry.attempts, 3);
    }
}

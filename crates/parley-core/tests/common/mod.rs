//! Hand-written fakes shared by the integration tests.
//!
//! Each fake records what it was asked to do so tests can assert on ordering
//! without real audio hardware or network access.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use mockall::mock;
use parley_core::{
    ApiError, AudioSink, AudioSinkError, AudioSource, AudioSourceError, ByteStream, ChunkResponse,
    CompletionSender, ConversationApi, ConversationId, ConversationSnapshot, MessageId, PendingId,
    PlaybackCompletion, SinkEvent, StreamTransport, TransportError,
};

pub const WAIT: Duration = Duration::from_secs(2);

// ── Conversation API ───────────────────────────────────────────────

mock! {
    pub Api {}

    #[async_trait]
    impl ConversationApi for Api {
        async fn create_conversation(
            &self,
            activity_id: &str,
            character_id: &str,
        ) -> Result<ConversationId, ApiError>;

        async fn fetch_conversation(
            &self,
            id: &ConversationId,
        ) -> Result<ConversationSnapshot, ApiError>;
    }
}

/// An API that always creates conversation `id`.
pub fn creating_api(id: &'static str) -> MockApi {
    let mut api = MockApi::new();
    api.expect_create_conversation()
        .returning(move |_, _| Ok(ConversationId::new(id)));
    api
}

// ── Audio source ───────────────────────────────────────────────────

/// How the fake source answers requests for one chunk.
#[derive(Debug, Clone)]
pub enum ChunkScript {
    /// Never becomes ready.
    Missing,
    /// Fails with a server error every time.
    Broken,
}

/// Serves `"{pending_id}:{index}"` for every chunk unless scripted otherwise.
#[derive(Default)]
pub struct FakeAudioSource {
    scripts: Mutex<HashMap<u32, ChunkScript>>,
    full_clip_fails: Mutex<bool>,
    chunk_requests: Mutex<Vec<(String, u32)>>,
    full_clip_requests: Mutex<Vec<String>>,
}

impl FakeAudioSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, index: u32, script: ChunkScript) {
        self.scripts.lock().unwrap().insert(index, script);
    }

    pub fn fail_full_clips(&self) {
        *self.full_clip_fails.lock().unwrap() = true;
    }

    pub fn chunk_requests(&self) -> Vec<(String, u32)> {
        self.chunk_requests.lock().unwrap().clone()
    }

    pub fn full_clip_requests(&self) -> Vec<String> {
        self.full_clip_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSource for FakeAudioSource {
    async fn fetch_chunk(
        &self,
        _conversation_id: &ConversationId,
        pending_id: &PendingId,
        chunk_index: u32,
    ) -> Result<ChunkResponse, AudioSourceError> {
        self.chunk_requests
            .lock()
            .unwrap()
            .push((pending_id.to_string(), chunk_index));

        match self.scripts.lock().unwrap().get(&chunk_index) {
            Some(ChunkScript::Missing) => Ok(ChunkResponse::NotReady),
            Some(ChunkScript::Broken) => Err(AudioSourceError::Status { status: 500 }),
            None => Ok(ChunkResponse::Ready(Bytes::from(format!(
                "{pending_id}:{chunk_index}"
            )))),
        }
    }

    async fn fetch_full_clip(
        &self,
        _conversation_id: &ConversationId,
        message_id: &MessageId,
    ) -> Result<Bytes, AudioSourceError> {
        self.full_clip_requests
            .lock()
            .unwrap()
            .push(message_id.to_string());

        if *self.full_clip_fails.lock().unwrap() {
            return Err(AudioSourceError::Network {
                message: "offline".into(),
            });
        }
        Ok(Bytes::from(format!("full:{message_id}")))
    }
}

// ── Audio sink ─────────────────────────────────────────────────────

/// One call made on the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Load(String),
    Play,
    Pause,
}

/// Records sink calls. In manual mode a played buffer only ends when the
/// test calls [`RecordingSink::finish_current`].
pub struct RecordingSink {
    manual: bool,
    refuse: bool,
    calls: Mutex<Vec<SinkCall>>,
    loaded: Mutex<Option<String>>,
    played: Mutex<Vec<String>>,
    pending: Mutex<VecDeque<CompletionSender>>,
}

impl RecordingSink {
    fn with_mode(manual: bool, refuse: bool) -> Arc<Self> {
        Arc::new(Self {
            manual,
            refuse,
            calls: Mutex::new(Vec::new()),
            loaded: Mutex::new(None),
            played: Mutex::new(Vec::new()),
            pending: Mutex::new(VecDeque::new()),
        })
    }

    /// Every buffer ends as soon as it starts.
    pub fn auto() -> Arc<Self> {
        Self::with_mode(false, false)
    }

    /// Buffers end only when the test says so.
    pub fn manual() -> Arc<Self> {
        Self::with_mode(true, false)
    }

    /// Accepts every load but fails every `play()`.
    pub fn refusing() -> Arc<Self> {
        Self::with_mode(false, true)
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn played(&self) -> Vec<String> {
        self.played.lock().unwrap().clone()
    }

    /// Report the outcome of the oldest outstanding `play()`.
    pub fn finish_current(&self, event: SinkEvent) {
        let tx = self
            .pending
            .lock()
            .unwrap()
            .pop_front()
            .expect("nothing is playing");
        let _ = tx.send(event);
    }

    /// Wait until at least `n` buffers have been played.
    pub async fn wait_for_plays(&self, n: usize) {
        tokio::time::timeout(WAIT, async {
            while self.played.lock().unwrap().len() < n {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("expected {n} plays, got {:?}", self.played()));
    }
}

impl AudioSink for RecordingSink {
    fn load(&self, audio: Bytes) -> Result<(), AudioSinkError> {
        let label = String::from_utf8_lossy(&audio).into_owned();
        self.calls.lock().unwrap().push(SinkCall::Load(label.clone()));
        *self.loaded.lock().unwrap() = Some(label);
        Ok(())
    }

    fn play(&self) -> Result<PlaybackCompletion, AudioSinkError> {
        let label = self
            .loaded
            .lock()
            .unwrap()
            .clone()
            .ok_or(AudioSinkError::NothingLoaded)?;
        self.calls.lock().unwrap().push(SinkCall::Play);
        if self.refuse {
            return Err(AudioSinkError::Decode(format!("cannot play {label}")));
        }
        self.played.lock().unwrap().push(label);

        if self.manual {
            let (tx, completion) = PlaybackCompletion::channel();
            self.pending.lock().unwrap().push_back(tx);
            Ok(completion)
        } else {
            Ok(PlaybackCompletion::ended())
        }
    }

    fn pause(&self) {
        self.calls.lock().unwrap().push(SinkCall::Pause);
        // Dropping the senders resolves outstanding completions as interrupted.
        self.pending.lock().unwrap().clear();
    }
}

// ── Stream transport ───────────────────────────────────────────────

/// The reply body served for one `open_stream` call.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Serve these raw reads, then end the body.
    Body(Vec<String>),
    /// Serve these raw reads, then stay open forever.
    Hang(Vec<String>),
    /// Refuse to open.
    Fail(TransportError),
}

impl Reply {
    pub fn lines(lines: &[&str]) -> Self {
        Self::Body(lines.iter().map(|l| format!("{l}\n")).collect())
    }

    pub fn hanging(lines: &[&str]) -> Self {
        Self::Hang(lines.iter().map(|l| format!("{l}\n")).collect())
    }
}

/// Serves scripted replies in order and records each request.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeTransport {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl StreamTransport for FakeTransport {
    async fn open_stream(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> Result<ByteStream, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((conversation_id.to_string(), text.to_string()));

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::lines(&[r#"{"done":true}"#]));

        let to_stream = |reads: Vec<String>| {
            futures_util::stream::iter(reads.into_iter().map(|r| Ok(Bytes::from(r))))
        };

        match reply {
            Reply::Body(reads) => Ok(to_stream(reads).boxed()),
            Reply::Hang(reads) => Ok(to_stream(reads)
                .chain(futures_util::stream::pending())
                .boxed()),
            Reply::Fail(e) => Err(e),
        }
    }
}

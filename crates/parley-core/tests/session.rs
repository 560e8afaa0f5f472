//! Integration tests for `ConversationSession`.
//!
//! The session runs against a mocked conversation API, a scripted stream
//! transport and the recording audio sink. Events are read back from the
//! session's channel with bounded waits.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{FakeAudioSource, FakeTransport, MockApi, RecordingSink, Reply, WAIT, creating_api};
use parley_core::{
    ApiError, ConversationId, ConversationSession, ConversationSnapshot, Message, MessageRole,
    RetryPolicy, SessionConfig, SessionError, SessionEvent, TransportError,
};
use tokio::sync::mpsc::UnboundedReceiver;

// ── Helpers ────────────────────────────────────────────────────────

struct Harness {
    session: ConversationSession,
    events: UnboundedReceiver<SessionEvent>,
    transport: Arc<FakeTransport>,
    source: Arc<FakeAudioSource>,
    sink: Arc<RecordingSink>,
}

fn harness(api: MockApi, replies: Vec<Reply>) -> Harness {
    let transport = FakeTransport::new(replies);
    let source = FakeAudioSource::new();
    let sink = RecordingSink::auto();
    let config = SessionConfig {
        retry: RetryPolicy::new(2, Duration::ZERO),
        ..SessionConfig::default()
    };
    let (session, events) = ConversationSession::new(
        Arc::new(api),
        Arc::clone(&transport) as _,
        Arc::clone(&source) as _,
        Arc::clone(&sink) as _,
        config,
    );
    Harness {
        session,
        events,
        transport,
        source,
        sink,
    }
}

/// Build a session that already holds conversation `conv`.
async fn ready_harness(replies: Vec<Reply>) -> Harness {
    let mut h = harness(creating_api("conv"), replies);
    h.session.initialize(None, "activity", "persona").await.unwrap();
    drain_events(&mut h.events);
    h
}

fn drain_events(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(e) = rx.try_recv() {
        events.push(e);
    }
    events
}

/// Collect events up to and including the end of `turn`.
async fn until_turn_ends(rx: &mut UnboundedReceiver<SessionEvent>, turn: u64) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("turn did not finish in time")
            .expect("session dropped");
        let done = matches!(
            &event,
            SessionEvent::TurnCompleted { turn: t, .. } | SessionEvent::TurnFailed { turn: t, .. }
                if *t == turn
        );
        events.push(event);
        if done {
            return events;
        }
    }
}

fn roles(messages: &[Message]) -> Vec<(MessageRole, &str)> {
    messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect()
}

// ── Initialization ─────────────────────────────────────────────────

#[tokio::test]
async fn rejected_saved_id_falls_back_to_create() {
    let mut api = MockApi::new();
    api.expect_fetch_conversation()
        .times(1)
        .returning(|id| Err(ApiError::NotFound(id.to_string())));
    api.expect_create_conversation()
        .withf(|activity, persona| activity == "activity" && persona == "persona")
        .times(1)
        .returning(|_, _| Ok(ConversationId::new("fresh")));

    let mut h = harness(api, vec![]);
    let id = h
        .session
        .initialize(Some(ConversationId::new("stale")), "activity", "persona")
        .await
        .unwrap();

    assert_eq!(id.as_str(), "fresh");
    assert_eq!(h.session.conversation_id(), Some(ConversationId::new("fresh")));
    assert_eq!(
        drain_events(&mut h.events),
        vec![SessionEvent::Ready {
            conversation_id: ConversationId::new("fresh"),
            resumed: false,
        }]
    );
}

#[tokio::test]
async fn saved_conversation_is_resumed() {
    let mut api = MockApi::new();
    api.expect_fetch_conversation().times(1).returning(|id| {
        Ok(ConversationSnapshot {
            id: id.clone(),
            messages: vec![
                Message::now(MessageRole::User, "hi"),
                Message::now(MessageRole::Assistant, "hello"),
            ],
            user_message_count: Some(4),
        })
    });
    api.expect_create_conversation().times(0);

    let mut h = harness(api, vec![]);
    h.session
        .initialize(Some(ConversationId::new("saved")), "activity", "persona")
        .await
        .unwrap();

    assert_eq!(h.session.messages().len(), 2);
    assert_eq!(h.session.user_message_count(), 4);
    assert!(!h.session.ready_for_assessment());
    assert!(matches!(
        drain_events(&mut h.events).as_slice(),
        [SessionEvent::Ready { resumed: true, .. }]
    ));
}

#[tokio::test]
async fn both_failures_surface_an_initialization_error() {
    let mut api = MockApi::new();
    api.expect_fetch_conversation()
        .returning(|_| Err(ApiError::Unauthorized));
    api.expect_create_conversation()
        .returning(|_, _| Err(ApiError::Status { status: 503 }));

    let mut h = harness(api, vec![]);
    let err = h
        .session
        .initialize(Some(ConversationId::new("saved")), "activity", "persona")
        .await
        .unwrap_err();

    match err {
        SessionError::Initialization { resume, create } => {
            assert!(matches!(resume, Some(ApiError::Unauthorized)));
            assert!(matches!(create, ApiError::Status { status: 503 }));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(h.session.conversation_id().is_none());
    assert!(matches!(h.session.send("hello"), Err(SessionError::NoConversation)));
    assert!(drain_events(&mut h.events).is_empty());
}

// ── Sending ────────────────────────────────────────────────────────

#[tokio::test]
async fn blank_messages_are_rejected_without_side_effects() {
    let mut h = ready_harness(vec![]).await;

    assert!(matches!(h.session.send(""), Err(SessionError::EmptyMessage)));
    assert!(matches!(h.session.send("   "), Err(SessionError::EmptyMessage)));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(h.session.messages().is_empty());
    assert_eq!(h.session.user_message_count(), 0);
    assert!(h.transport.requests().is_empty());
    assert!(drain_events(&mut h.events).is_empty());
}

#[tokio::test]
async fn tokens_are_committed_as_one_assistant_message() {
    let mut h = ready_harness(vec![Reply::lines(&[
        r#"{"token":"Hel"}"#,
        r#"{"token":"lo"}"#,
        r#"{"done":true}"#,
    ])])
    .await;

    let turn = h.session.send("Hi there").unwrap();
    let events = until_turn_ends(&mut h.events, turn).await;

    let tokens: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            SessionEvent::Token { text, .. } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(tokens, vec!["Hel", "lo"]);
    assert!(matches!(
        events.last(),
        Some(SessionEvent::TurnCompleted { message: Some(m), .. }) if m.content == "Hello"
    ));

    assert_eq!(h.session.streaming_text(), "");
    assert_eq!(
        roles(&h.session.messages()),
        vec![
            (MessageRole::User, "Hi there"),
            (MessageRole::Assistant, "Hello"),
        ]
    );
    assert_eq!(h.session.user_message_count(), 1);
    assert_eq!(
        h.transport.requests(),
        vec![("conv".to_string(), "Hi there".to_string())]
    );
}

#[tokio::test]
async fn stream_error_discards_partial_reply() {
    let mut h = ready_harness(vec![Reply::lines(&[
        r#"{"token":"partial"}"#,
        r#"{"error":"boom"}"#,
    ])])
    .await;

    let turn = h.session.send("question").unwrap();
    let events = until_turn_ends(&mut h.events, turn).await;

    let failures: Vec<_> = events
        .iter()
        .filter(|e| matches!(e, SessionEvent::TurnFailed { .. }))
        .collect();
    assert_eq!(failures.len(), 1);
    assert!(matches!(
        failures[0],
        SessionEvent::TurnFailed { reason, .. } if reason == "boom"
    ));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(drain_events(&mut h.events).is_empty());
    assert_eq!(h.session.streaming_text(), "");
    assert_eq!(
        roles(&h.session.messages()),
        vec![(MessageRole::User, "question")]
    );
}

#[tokio::test]
async fn transport_failure_fails_only_the_turn() {
    let mut h = ready_harness(vec![
        Reply::Fail(TransportError::Status { status: 502 }),
        Reply::lines(&[r#"{"token":"ok"}"#, r#"{"done":true}"#]),
    ])
    .await;

    let first = h.session.send("one").unwrap();
    let events = until_turn_ends(&mut h.events, first).await;
    assert!(matches!(events.last(), Some(SessionEvent::TurnFailed { .. })));

    let second = h.session.send("two").unwrap();
    let events = until_turn_ends(&mut h.events, second).await;
    assert!(matches!(
        events.last(),
        Some(SessionEvent::TurnCompleted { message: Some(_), .. })
    ));
    assert_eq!(h.session.messages().len(), 3);
}

#[tokio::test]
async fn empty_reply_commits_no_message() {
    let mut h = ready_harness(vec![Reply::lines(&[r#"{"done":true}"#])]).await;

    let turn = h.session.send("anyone?").unwrap();
    let events = until_turn_ends(&mut h.events, turn).await;

    assert!(matches!(
        events.last(),
        Some(SessionEvent::TurnCompleted { message: None, .. })
    ));
    assert_eq!(h.session.messages().len(), 1);
}

#[tokio::test]
async fn new_message_supersedes_the_open_stream() {
    let mut h = ready_harness(vec![
        Reply::hanging(&[r#"{"token":"stale"}"#]),
        Reply::lines(&[r#"{"token":"fresh"}"#, r#"{"done":true}"#]),
    ])
    .await;

    let first = h.session.send("first").unwrap();
    let second = h.session.send("second").unwrap();
    assert!(second > first);

    let events = until_turn_ends(&mut h.events, second).await;
    assert!(
        events.iter().all(|e| e.turn() != Some(first) || matches!(e, SessionEvent::UserMessage { .. })),
        "events from the superseded turn leaked: {events:?}"
    );
    assert_eq!(
        roles(&h.session.messages()),
        vec![
            (MessageRole::User, "first"),
            (MessageRole::User, "second"),
            (MessageRole::Assistant, "fresh"),
        ]
    );
}

// ── Audio routing ──────────────────────────────────────────────────

#[tokio::test]
async fn chunk_metadata_drives_playback() {
    let h = ready_harness(vec![Reply::lines(&[
        r#"{"token":"Hi"}"#,
        r#"{"pending_id":"p1","total_chunks":2}"#,
        r#"{"done":true}"#,
    ])])
    .await;

    h.session.send("hello").unwrap();
    h.sink.wait_for_plays(2).await;

    assert_eq!(h.sink.played(), vec!["p1:0", "p1:1"]);
    assert!(h.source.full_clip_requests().is_empty());
}

#[tokio::test]
async fn repeated_chunk_metadata_plays_each_chunk_once() {
    let h = ready_harness(vec![Reply::lines(&[
        r#"{"pending_id":"p1","total_chunks":3}"#,
        r#"{"token":"Hi"}"#,
        r#"{"pending_id":"p1","total_chunks":3}"#,
        r#"{"done":true}"#,
    ])])
    .await;

    h.session.send("hello").unwrap();
    h.sink.wait_for_plays(3).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(h.sink.played(), vec!["p1:0", "p1:1", "p1:2"]);
}

#[tokio::test]
async fn unusable_chunk_metadata_falls_back_to_whole_clip() {
    let h = ready_harness(vec![Reply::lines(&[
        r#"{"token":"Hi"}"#,
        r#"{"pendingId":"p1"}"#,
        r#"{"message_id":"m7"}"#,
        r#"{"done":true}"#,
    ])])
    .await;

    h.session.send("hello").unwrap();
    h.sink.wait_for_plays(1).await;

    assert_eq!(h.sink.played(), vec!["full:m7"]);
    assert!(h.source.chunk_requests().is_empty());
}

// ── Cancellation ───────────────────────────────────────────────────

#[tokio::test]
async fn end_clears_the_conversation_once() {
    let mut h = ready_harness(vec![Reply::hanging(&[r#"{"token":"partial"}"#])]).await;

    h.session.send("hello").unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    h.session.end();
    h.session.end();

    assert!(h.session.conversation_id().is_none());
    assert!(h.session.messages().is_empty());
    assert_eq!(h.session.streaming_text(), "");

    let ended: Vec<_> = drain_events(&mut h.events)
        .into_iter()
        .filter(|e| matches!(e, SessionEvent::Ended { .. }))
        .collect();
    assert_eq!(
        ended,
        vec![SessionEvent::Ended {
            conversation_id: ConversationId::new("conv"),
        }]
    );
    assert!(matches!(h.session.send("again"), Err(SessionError::NoConversation)));
}

#[tokio::test]
async fn reset_keeps_the_conversation() {
    let mut h = ready_harness(vec![Reply::hanging(&[r#"{"token":"partial"}"#])]).await;

    h.session.send("hello").unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(h.session.streaming_text(), "partial");

    h.session.reset();

    assert_eq!(h.session.streaming_text(), "");
    assert_eq!(h.session.conversation_id(), Some(ConversationId::new("conv")));
    assert_eq!(
        roles(&h.session.messages()),
        vec![(MessageRole::User, "hello")]
    );
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!drain_events(&mut h.events)
        .iter()
        .any(|e| matches!(e, SessionEvent::TurnCompleted { .. } | SessionEvent::TurnFailed { .. })));
}

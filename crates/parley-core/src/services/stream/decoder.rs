//! Reply-stream decoder: newline-delimited JSON records → [`StreamEvent`]s.
//!
//! The server frames each record on its own line. Two framings are accepted:
//!
//! ```text
//! NDJSON: {"token":"Hel"}\n
//! SSE:    data: {"token":"Hel"}\n\n
//! ```
//!
//! Bytes are buffered until a full line is available, so records split
//! across network reads (including multi-byte UTF-8 sequences) decode
//! intact. Complete lines that do not parse, or parse into a record with no
//! known field, are dropped.

use std::collections::VecDeque;

use bytes::BytesMut;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{debug, error};

use crate::domain::audio::AudioSignal;
use crate::domain::chat::{MessageId, PendingId};
use crate::domain::stream::StreamEvent;
use crate::ports::stream_transport::ByteStream;

/// SSE terminator used by OpenAI-style servers.
const SSE_DONE: &str = "[DONE]";

/// Wire shape of a single record. Every field is optional so that unknown
/// record kinds deserialize to an empty record instead of failing.
#[derive(Debug, Default, Deserialize)]
struct WireRecord {
    token: Option<String>,
    #[serde(alias = "messageId")]
    message_id: Option<MessageId>,
    #[serde(alias = "pendingId")]
    pending_id: Option<PendingId>,
    #[serde(alias = "totalChunks")]
    total_chunks: Option<u32>,
    done: Option<bool>,
    error: Option<serde_json::Value>,
}

impl WireRecord {
    /// Expand the record into events, in the order a reader expects them:
    /// text first, then audio, then completion.
    fn into_events(self, out: &mut VecDeque<StreamEvent>) -> usize {
        if let Some(reason) = self.error.as_ref().and_then(error_reason) {
            out.push_back(StreamEvent::Error(reason));
            return 1;
        }

        let before = out.len();
        if let Some(token) = self.token {
            out.push_back(StreamEvent::Token(token));
        }
        if let Some(pending_id) = self.pending_id {
            out.push_back(StreamEvent::AudioReady(AudioSignal::Chunked {
                pending_id,
                total_chunks: self.total_chunks,
            }));
        }
        if let Some(message_id) = self.message_id {
            out.push_back(StreamEvent::AudioReady(AudioSignal::FullClip { message_id }));
        }
        if self.done == Some(true) {
            out.push_back(StreamEvent::Done);
        }
        out.len() - before
    }
}

/// Pull a human-readable reason out of an `error` field.
fn error_reason(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(map) => Some(
            map.get("message")
                .and_then(serde_json::Value::as_str)
                .map_or_else(|| value.to_string(), str::to_string),
        ),
        other => Some(other.to_string()),
    }
}

/// Incremental decoder. Feed it bytes with [`push`](Self::push) and drain
/// events with [`next_event`](Self::next_event).
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buf: BytesMut,
    ready: VecDeque<StreamEvent>,
}

impl StreamDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes from the transport.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Next decoded event, if a complete record is buffered.
    pub fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(event) = self.ready.pop_front() {
                return Some(event);
            }
            let line_end = self.buf.iter().position(|&b| b == b'\n')?;
            let line = self.buf.split_to(line_end + 1);
            self.decode_line(&line);
        }
    }

    /// Decode whatever is left after the transport closed. A trailing record
    /// without a newline is still honoured.
    pub fn finish(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let rest = self.buf.split();
        self.decode_line(&rest);
    }

    /// Bytes buffered but not yet decoded.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    fn decode_line(&mut self, raw: &[u8]) {
        let Ok(line) = std::str::from_utf8(raw) else {
            debug!(len = raw.len(), "Dropping non-UTF-8 stream line");
            return;
        };
        let line = line.trim();

        // Blank separators and SSE comments.
        if line.is_empty() || line.starts_with(':') {
            return;
        }

        let payload = if let Some(data) = line.strip_prefix("data:") {
            data.trim()
        } else if line.starts_with("event:") || line.starts_with("id:") || line.starts_with("retry:")
        {
            return;
        } else {
            line
        };

        if payload == SSE_DONE {
            self.ready.push_back(StreamEvent::Done);
            return;
        }

        match serde_json::from_str::<WireRecord>(payload) {
            Ok(record) => {
                if record.into_events(&mut self.ready) == 0 {
                    debug!(payload, "Ignoring unknown stream record");
                }
            }
            Err(e) => {
                debug!(error = %e, "Dropping unparseable stream record");
            }
        }
    }
}

/// State threaded through the `unfold` stream.
struct DecodeState {
    stream: ByteStream,
    decoder: StreamDecoder,
    eof: bool,
    finished: bool,
}

/// Decode a transport byte stream into events.
///
/// The returned stream yields exactly one terminal event and then ends:
/// - an explicit `done`/`error` record is passed through and anything after
///   it on the wire is ignored,
/// - a transport error becomes a single [`StreamEvent::Error`],
/// - end of body without a terminal record yields [`StreamEvent::Done`].
pub fn decode_events(stream: ByteStream) -> impl Stream<Item = StreamEvent> + Send {
    let state = DecodeState {
        stream,
        decoder: StreamDecoder::new(),
        eof: false,
        finished: false,
    };

    futures_util::stream::unfold(state, |mut st| async move {
        if st.finished {
            return None;
        }

        loop {
            if let Some(event) = st.decoder.next_event() {
                if event.is_terminal() {
                    st.finished = true;
                }
                return Some((event, st));
            }

            if st.eof {
                st.finished = true;
                return Some((StreamEvent::Done, st));
            }

            match st.stream.next().await {
                Some(Ok(chunk)) => st.decoder.push(&chunk),
                Some(Err(e)) => {
                    error!(error = %e, "Reply stream failed");
                    st.finished = true;
                    return Some((StreamEvent::Error(e.to_string()), st));
                }
                None => {
                    st.decoder.finish();
                    st.eof = true;
                }
            }
        }
    })
}

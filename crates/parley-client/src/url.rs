//! URL construction helpers for the conversation server.
//!
//! Pure functions over a validated base URL. Every route ends with a slash,
//! matching the server's URL layout, and ids are percent-encoded as path
//! segments.

use url::Url;

use crate::config::TtsVoice;
use crate::error::{ClientError, ClientResult};

/// Parse and validate the configured base URL.
pub fn parse_base_url(raw: &str) -> ClientResult<Url> {
    let url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(ClientError::InvalidBaseUrl {
            url: raw.to_string(),
        });
    }
    Ok(url)
}

/// Append `segments` to the base path and finish with a trailing slash.
fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments).push("");
    }
    url
}

/// `POST {base}/conversations/`
pub fn conversations_url(base: &Url) -> Url {
    join(base, &["conversations"])
}

/// `GET {base}/conversations/{id}/`
pub fn conversation_url(base: &Url, conversation_id: &str) -> Url {
    join(base, &["conversations", conversation_id])
}

/// `POST {base}/conversations/{id}/stream/`
pub fn stream_url(base: &Url, conversation_id: &str) -> Url {
    join(base, &["conversations", conversation_id, "stream"])
}

/// `GET {base}/conversations/{id}/audio/{message_id}/?voice=..&speed=..`
pub fn full_clip_url(
    base: &Url,
    conversation_id: &str,
    message_id: &str,
    voice: Option<TtsVoice>,
    speed: Option<f32>,
) -> Url {
    let mut url = join(base, &["conversations", conversation_id, "audio", message_id]);
    if voice.is_some() || speed.is_some() {
        let mut query = url.query_pairs_mut();
        if let Some(voice) = voice {
            query.append_pair("voice", voice.as_str());
        }
        if let Some(speed) = speed {
            query.append_pair("speed", &speed.to_string());
        }
    }
    url
}

/// `GET {base}/conversations/{id}/audio-chunk/{pending_id}/{index}/`
pub fn chunk_url(base: &Url, conversation_id: &str, pending_id: &str, chunk_index: u32) -> Url {
    join(
        base,
        &[
            "conversations",
            conversation_id,
            "audio-chunk",
            pending_id,
            &chunk_index.to_string(),
        ],
    )
}

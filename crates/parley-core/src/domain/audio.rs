//! Audio handle types shared by the stream decoder and the scheduler.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use super::chat::{ConversationId, MessageId, PendingId};

/// Which audio belongs to one assistant turn, as announced on the token stream.
///
/// This is the raw signal; it becomes an [`AudioPlaybackHandle`] once it is
/// bound to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSignal {
    /// The whole reply is available as one clip.
    FullClip { message_id: MessageId },

    /// The reply is being synthesized in numbered chunks.
    Chunked {
        pending_id: PendingId,
        /// Number of chunks, when the server announced it.
        total_chunks: Option<u32>,
    },
}

impl AudioSignal {
    /// Bind the signal to a conversation.
    ///
    /// Returns `None` for chunk metadata that cannot drive sequencing (no
    /// chunk count, or a count of zero).
    #[must_use]
    pub fn into_handle(self, conversation_id: ConversationId) -> Option<AudioPlaybackHandle> {
        match self {
            Self::FullClip { message_id } => Some(AudioPlaybackHandle::FullClip {
                conversation_id,
                message_id,
            }),
            Self::Chunked {
                pending_id,
                total_chunks,
            } => {
                let total_chunks = NonZeroU32::new(total_chunks?)?;
                Some(AudioPlaybackHandle::Chunked {
                    conversation_id,
                    pending_id,
                    total_chunks,
                })
            }
        }
    }
}

/// Identifies one assistant turn's audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioPlaybackHandle {
    /// A single whole-clip reference.
    FullClip {
        conversation_id: ConversationId,
        message_id: MessageId,
    },

    /// An ordered run of `total_chunks` chunks.
    Chunked {
        conversation_id: ConversationId,
        pending_id: PendingId,
        total_chunks: NonZeroU32,
    },
}

impl AudioPlaybackHandle {
    #[must_use]
    pub const fn conversation_id(&self) -> &ConversationId {
        match self {
            Self::FullClip {
                conversation_id, ..
            }
            | Self::Chunked {
                conversation_id, ..
            } => conversation_id,
        }
    }

    #[must_use]
    pub const fn is_chunked(&self) -> bool {
        matches!(self, Self::Chunked { .. })
    }

    /// Whether both handles address the same chunked render.
    #[must_use]
    pub fn same_render(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Chunked {
                    conversation_id: a_conv,
                    pending_id: a_pending,
                    ..
                },
                Self::Chunked {
                    conversation_id: b_conv,
                    pending_id: b_pending,
                    ..
                },
            ) => a_conv == b_conv && a_pending == b_pending,
            _ => false,
        }
    }
}

//! Domain types for parley.
//!
//! Pure data with no transport or runtime concerns.

pub mod audio;
pub mod chat;
pub mod stream;

pub use audio::{AudioPlaybackHandle, AudioSignal};
pub use chat::{
    Conversation, ConversationId, MIN_USER_MESSAGES_FOR_ASSESSMENT, Message, MessageId,
    MessageRole, PendingId,
};
pub use stream::StreamEvent;

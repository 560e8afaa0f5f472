//! Reply streaming: wire decoding and the per-message receiver.

pub mod decoder;
mod receiver;

pub use decoder::{StreamDecoder, decode_events};
pub use receiver::{StreamHandle, TokenStreamReceiver};

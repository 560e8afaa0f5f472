//! Command handlers.
//!
//! Thin wrappers that parse CLI-specific input, call the session and format
//! output for the terminal. Conversation logic lives in `parley-core`.

pub mod chat;
pub mod forget;

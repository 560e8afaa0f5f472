//! Events reported by core services to their callers.
//!
//! # Structure
//!
//! - `session` - Conversation lifecycle and per-turn progress
//!
//! # Wire Format
//!
//! Events serialize with a `type` tag so adapters can forward them as JSON:
//!
//! ```json
//! { "type": "token", "turn": 3, "text": "Hel" }
//! ```

mod session;

pub use session::SessionEvent;

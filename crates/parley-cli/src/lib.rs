#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod handlers;
pub mod parser;
pub mod presentation;
pub mod store;

// Re-export primary types for convenient access
pub use bootstrap::{AudioOutput, CliConfig, CliContext, bootstrap};
pub use parser::{Cli, Commands};
pub use store::{ConversationStore, SavedConversation};

#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]
// ParleyClient is meant to be used through the core port traits, not its
// internal backend parameter
#![allow(private_interfaces, private_bounds)]

mod client;
mod config;
mod error;
mod http;
mod models;
mod port;
mod url;

// ============================================================================
// Public API
// ============================================================================

// Client
pub use client::{DefaultParleyClient, ParleyClient};

// Configuration
pub use config::{MAX_SPEED, MIN_SPEED, ParleyClientConfig, TtsVoice, UnknownVoice};

// Errors
pub use error::{ClientError, ClientResult};

// Only exercised by the integration tests under tests/
#[cfg(test)]
use axum as _;
#[cfg(test)]
use tokio as _;

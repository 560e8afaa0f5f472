//! Conversation server client.
//!
//! [`ParleyClient`] is generic over an HTTP backend so the request and
//! response handling in the submodules can be exercised against a fake.
//! Production code uses [`DefaultParleyClient`].

mod audio;
mod conversations;
mod stream;

use std::sync::Arc;

use parley_core::TokenProvider;
use url::Url;

use crate::config::{ParleyClientConfig, TtsVoice};
use crate::error::ClientResult;
use crate::http::{HttpBackend, ReqwestBackend};
use crate::url::parse_base_url;

// ============================================================================
// Type Aliases
// ============================================================================

/// Default client using the reqwest HTTP backend.
pub type DefaultParleyClient = ParleyClient<ReqwestBackend>;

// ============================================================================
// Client
// ============================================================================

/// Client for the conversation server's REST and streaming endpoints.
///
/// The generic parameter `B` is an implementation detail; construct
/// production clients with [`DefaultParleyClient::new`] and use them through
/// the core port traits.
pub struct ParleyClient<B: HttpBackend> {
    pub(crate) backend: B,
    pub(crate) base_url: Url,
    pub(crate) voice: Option<TtsVoice>,
    pub(crate) speed: Option<f32>,
}

impl DefaultParleyClient {
    /// Create a client for `config`, authenticating with `tokens`.
    ///
    /// # Errors
    ///
    /// Fails if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ParleyClientConfig, tokens: Arc<dyn TokenProvider>) -> ClientResult<Self> {
        let backend = ReqwestBackend::new(config, tokens)?;
        Self::with_backend(config, backend)
    }
}

impl<B: HttpBackend> ParleyClient<B> {
    /// Create a client over a custom backend.
    pub(crate) fn with_backend(config: &ParleyClientConfig, backend: B) -> ClientResult<Self> {
        Ok(Self {
            backend,
            base_url: parse_base_url(config.base_url())?,
            voice: config.voice,
            speed: config.speed,
        })
    }

    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }
}

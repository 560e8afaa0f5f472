//! HTTP backend abstraction for the conversation server.
//!
//! The client is generic over [`HttpBackend`] so request construction and
//! response handling can be tested without a network. The production
//! implementation uses reqwest. Conversation calls are never retried here;
//! chunk retries belong to the audio scheduler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use parley_core::TokenProvider;
use reqwest::header::ACCEPT;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::config::ParleyClientConfig;
use crate::error::{ClientError, ClientResult};

/// Body chunks of an open reply stream.
pub type BodyStream = BoxStream<'static, ClientResult<Bytes>>;

/// A response body together with its status, for endpoints whose success
/// statuses carry meaning (e.g. "accepted, not ready yet").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBody {
    pub status: u16,
    pub bytes: Bytes,
}

// ============================================================================
// HTTP Backend Trait
// ============================================================================

/// Transport used by [`ParleyClient`](crate::ParleyClient).
///
/// Non-success statuses surface as [`ClientError::Status`] from every method
/// except [`get_bytes`](HttpBackend::get_bytes), which reports them in
/// [`RawBody::status`] so callers can interpret them.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// `GET` a URL and deserialize the JSON body.
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> ClientResult<T>;

    /// `POST` a JSON body and deserialize the JSON response.
    async fn post_json<B: Serialize + Sync, T: DeserializeOwned + Send>(
        &self,
        url: &Url,
        body: &B,
    ) -> ClientResult<T>;

    /// `GET` a URL and return the raw body whatever the status.
    async fn get_bytes(&self, url: &Url) -> ClientResult<RawBody>;

    /// `POST` a JSON body and stream the response body as it arrives.
    async fn post_stream<B: Serialize + Sync>(&self, url: &Url, body: &B)
    -> ClientResult<BodyStream>;
}

// ============================================================================
// Reqwest Backend
// ============================================================================

/// Production HTTP backend using reqwest.
///
/// Every request carries the current bearer token, if any. JSON and audio
/// requests are bounded by the configured timeout; reply streams stay open
/// as long as the server keeps them open.
pub struct ReqwestBackend {
    client: reqwest::Client,
    timeout: Duration,
    tokens: Arc<dyn TokenProvider>,
}

impl ReqwestBackend {
    /// Create a backend for `config`, authenticating with `tokens`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Network`] if the TLS backend cannot be
    /// initialised.
    pub fn new(config: &ParleyClientConfig, tokens: Arc<dyn TokenProvider>) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout,
            tokens,
        })
    }

    /// Attach the bearer token, read fresh for each request.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.tokens.bearer_token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send `request`, turning non-success statuses into errors.
    async fn send_checked(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> ClientResult<reqwest::Response> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        debug!(%url, status = status.as_u16(), "Server responded");

        if status.is_success() {
            Ok(response)
        } else {
            Err(ClientError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            })
        }
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get_json<T: DeserializeOwned + Send>(&self, url: &Url) -> ClientResult<T> {
        let request = self.client.get(url.as_str()).timeout(self.timeout);
        let response = self.send_checked(request, url).await?;
        Self::read_json(response).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned + Send>(
        &self,
        url: &Url,
        body: &B,
    ) -> ClientResult<T> {
        let request = self
            .client
            .post(url.as_str())
            .timeout(self.timeout)
            .json(body);
        let response = self.send_checked(request, url).await?;
        Self::read_json(response).await
    }

    async fn get_bytes(&self, url: &Url) -> ClientResult<RawBody> {
        let request = self.client.get(url.as_str()).timeout(self.timeout);
        let response = self.authorize(request).send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;
        debug!(%url, status, len = bytes.len(), "Fetched audio");
        Ok(RawBody { status, bytes })
    }

    async fn post_stream<B: Serialize + Sync>(
        &self,
        url: &Url,
        body: &B,
    ) -> ClientResult<BodyStream> {
        let request = self
            .client
            .post(url.as_str())
            .header(ACCEPT, "text/event-stream, application/x-ndjson")
            .json(body);
        let response = self.send_checked(request, url).await?;
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed())
    }
}

// ============================================================================
// Fake Backend for Testing
// ============================================================================

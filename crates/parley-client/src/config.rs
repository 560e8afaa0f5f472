//! Public configuration for the conversation server client.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use parley_core::RetryPolicy;

/// Slowest and fastest playback speed the server accepts for whole clips.
pub const MIN_SPEED: f32 = 0.25;
pub const MAX_SPEED: f32 = 4.0;

/// Text-to-speech voices the server can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TtsVoice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl TtsVoice {
    pub const ALL: [Self; 6] = [
        Self::Alloy,
        Self::Echo,
        Self::Fable,
        Self::Onyx,
        Self::Nova,
        Self::Shimmer,
    ];

    /// The value sent in the `voice` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Shimmer => "shimmer",
        }
    }
}

impl fmt::Display for TtsVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognised voice name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown voice '{0}', expected one of: alloy, echo, fable, onyx, nova, shimmer")]
pub struct UnknownVoice(String);

impl FromStr for TtsVoice {
    type Err = UnknownVoice;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| UnknownVoice(s.to_string()))
    }
}

/// Configuration for [`DefaultParleyClient`](crate::DefaultParleyClient).
///
/// # Example
///
/// ```
/// use parley_client::ParleyClientConfig;
/// use std::time::Duration;
///
/// let config = ParleyClientConfig::new()
///     .with_base_url("https://coach.example.com/api")
///     .with_timeout(Duration::from_secs(15))
///     .with_speed(1.25);
/// ```
#[derive(Debug, Clone)]
pub struct ParleyClientConfig {
    /// Base URL of the API, e.g. `http://localhost:8000/api`
    pub(crate) base_url: String,
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Per-request timeout for JSON and audio calls; reply streams have none
    pub(crate) timeout: Duration,
    /// TCP connect timeout for every request
    pub(crate) connect_timeout: Duration,
    /// Attempts per audio chunk, including the first
    pub(crate) chunk_attempts: u32,
    /// Backoff unit between chunk attempts
    pub(crate) chunk_retry_delay: Duration,
    /// Voice override for whole clips
    pub(crate) voice: Option<TtsVoice>,
    /// Playback speed for whole clips
    pub(crate) speed: Option<f32>,
}

impl Default for ParleyClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            user_agent: concat!("parley/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            chunk_attempts: RetryPolicy::DEFAULT_ATTEMPTS,
            chunk_retry_delay: RetryPolicy::DEFAULT_BASE_DELAY,
            voice: None,
            speed: None,
        }
    }
}

impl ParleyClientConfig {
    /// Create a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the API base URL.
    ///
    /// Defaults to `http://localhost:8000/api`.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the timeout for JSON and audio requests.
    ///
    /// Defaults to 30 seconds. Reply streams are never given a total timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Defaults to 10 seconds.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set how often a chunk is requested before it is skipped.
    ///
    /// Defaults to 3 attempts.
    #[must_use]
    pub const fn with_chunk_attempts(mut self, attempts: u32) -> Self {
        self.chunk_attempts = attempts;
        self
    }

    /// Defaults to 250ms; attempt `n` waits `delay * (n - 1)`.
    #[must_use]
    pub const fn with_chunk_retry_delay(mut self, delay: Duration) -> Self {
        self.chunk_retry_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_voice(mut self, voice: TtsVoice) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Set the whole-clip playback speed, clamped to 0.25–4.0.
    ///
    /// Non-finite values leave the server default in place.
    #[must_use]
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.is_finite().then(|| speed.clamp(MIN_SPEED, MAX_SPEED));
        self
    }

    /// The chunk retry policy the session's fetcher should use.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.chunk_attempts, self.chunk_retry_delay)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

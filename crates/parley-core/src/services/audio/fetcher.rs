//! Chunk retrieval with bounded retry.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, error, warn};

use crate::domain::chat::{ConversationId, PendingId};
use crate::ports::audio_source::{AudioSource, ChunkResponse};

/// Retry settings for chunk fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per chunk, including the first.
    pub attempts: u32,
    /// Backoff unit; attempt `n` waits `base_delay * (n - 1)` first.
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 3;
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(250);

    #[must_use]
    pub const fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    /// Delay to wait before the 1-based `attempt`.
    #[must_use]
    pub const fn delay_before(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ATTEMPTS, Self::DEFAULT_BASE_DELAY)
    }
}

/// Outcome of fetching one chunk. Exhaustion is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkFetch {
    Ready(Bytes),
    Unavailable,
}

/// Fetches numbered chunks, absorbing "not ready" and transient failures.
#[derive(Clone)]
pub struct ChunkFetcher {
    source: Arc<dyn AudioSource>,
    policy: RetryPolicy,
}

impl ChunkFetcher {
    pub fn new(source: Arc<dyn AudioSource>, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch chunk `chunk_index`, retrying up to the policy's attempt count.
    pub async fn fetch(
        &self,
        conversation_id: &ConversationId,
        pending_id: &PendingId,
        chunk_index: u32,
    ) -> ChunkFetch {
        let attempts = self.policy.attempts.max(1);
        let mut last_was_not_ready = false;

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(self.policy.delay_before(attempt)).await;
            }

            match self
                .source
                .fetch_chunk(conversation_id, pending_id, chunk_index)
                .await
            {
                Ok(ChunkResponse::Ready(bytes)) => {
                    debug!(chunk_index, attempt, len = bytes.len(), "Chunk fetched");
                    return ChunkFetch::Ready(bytes);
                }
                Ok(ChunkResponse::NotReady) => {
                    debug!(chunk_index, attempt, "Chunk not ready yet");
                    last_was_not_ready = true;
                }
                Err(e) => {
                    error!(chunk_index, attempt, error = %e, "Chunk fetch failed");
                    last_was_not_ready = false;
                }
            }
        }

        if last_was_not_ready {
            warn!(chunk_index, attempts, "Chunk never became ready, skipping");
        } else {
            warn!(chunk_index, attempts, "Chunk unavailable, skipping");
        }
        ChunkFetch::Unavailable
    }
}

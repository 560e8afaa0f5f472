//! One reply stream per user message.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::decoder::decode_events;
use crate::domain::chat::ConversationId;
use crate::domain::stream::StreamEvent;
use crate::ports::stream_transport::StreamTransport;

/// Opens reply streams and feeds decoded events to a callback.
#[derive(Clone)]
pub struct TokenStreamReceiver {
    transport: Arc<dyn StreamTransport>,
}

impl TokenStreamReceiver {
    pub fn new(transport: Arc<dyn StreamTransport>) -> Self {
        Self { transport }
    }

    /// Send `text` and deliver the reply's events to `on_event` in wire order.
    ///
    /// The callback sees at most one terminal event and nothing after it.
    /// A failure to open the request is reported as a single
    /// [`StreamEvent::Error`]. After [`StreamHandle::cancel`] no further
    /// events are delivered.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn open<F>(
        &self,
        conversation_id: ConversationId,
        text: impl Into<String>,
        mut on_event: F,
    ) -> StreamHandle
    where
        F: FnMut(StreamEvent) + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let transport = Arc::clone(&self.transport);
        let text = text.into();

        let task = tokio::spawn(async move {
            let opened = tokio::select! {
                biased;

                () = token.cancelled() => {
                    debug!(conversation_id = %conversation_id, "Stream cancelled before open");
                    return;
                }

                result = transport.open_stream(&conversation_id, &text) => result,
            };

            let bytes = match opened {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!(conversation_id = %conversation_id, error = %e, "Failed to open reply stream");
                    if !token.is_cancelled() {
                        on_event(StreamEvent::Error(e.to_string()));
                    }
                    return;
                }
            };

            let events = decode_events(bytes);
            tokio::pin!(events);

            loop {
                let next = tokio::select! {
                    biased;

                    () = token.cancelled() => {
                        debug!(conversation_id = %conversation_id, "Reply stream cancelled");
                        return;
                    }

                    next = events.next() => next,
                };

                let Some(event) = next else { break };
                // Cancellation may land while the next event is being decoded.
                if token.is_cancelled() {
                    debug!(conversation_id = %conversation_id, "Reply stream cancelled");
                    return;
                }
                let terminal = event.is_terminal();
                on_event(event);
                if terminal {
                    break;
                }
            }
        });

        StreamHandle { cancel, task }
    }
}

/// Handle to an in-flight reply stream.
#[derive(Debug)]
pub struct StreamHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Stop delivering events. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the stream task to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            error!(error = %e, "Reply stream task panicked");
        }
    }
}

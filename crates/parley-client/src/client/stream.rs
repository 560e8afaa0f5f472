//! Opening reply streams.

use parley_core::ConversationId;
use tracing::debug;

use super::ParleyClient;
use crate::error::ClientResult;
use crate::http::{BodyStream, HttpBackend};
use crate::models::SendMessageRequest;
use crate::url::stream_url;

impl<B: HttpBackend> ParleyClient<B> {
    /// Post a user message and return the raw reply body.
    ///
    /// Framing is left to the core stream decoder.
    pub(crate) async fn open_reply(
        &self,
        conversation_id: &ConversationId,
        text: &str,
    ) -> ClientResult<BodyStream> {
        let url = stream_url(&self.base_url, conversation_id.as_str());
        debug!(%conversation_id, chars = text.len(), "Opening reply stream");
        self.backend
            .post_stream(&url, &SendMessageRequest { content: text })
            .await
    }
}

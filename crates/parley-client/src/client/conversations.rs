//! Creating and fetching conversations.

use parley_core::{ConversationId, ConversationSnapshot};
use tracing::{debug, info};

use super::ParleyClient;
use crate::error::ClientResult;
use crate::http::HttpBackend;
use crate::models::{ConversationCreated, ConversationDetail, CreateConversationRequest};
use crate::url::{conversation_url, conversations_url};

impl<B: HttpBackend> ParleyClient<B> {
    /// Create a conversation for an activity and persona.
    ///
    /// An empty `activity_id` is sent as absent.
    pub(crate) async fn create(
        &self,
        activity_id: &str,
        character_id: &str,
    ) -> ClientResult<ConversationId> {
        let url = conversations_url(&self.base_url);
        let activity_id = activity_id.trim();
        let body = CreateConversationRequest {
            activity_id: (!activity_id.is_empty()).then_some(activity_id),
            scenario_id: character_id,
        };

        let created: ConversationCreated = self.backend.post_json(&url, &body).await?;
        let id = ConversationId::from(created.id);
        info!(conversation_id = %id, character_id, "Created conversation");
        Ok(id)
    }

    /// Fetch a conversation's transcript.
    pub(crate) async fn fetch(&self, id: &ConversationId) -> ClientResult<ConversationSnapshot> {
        let url = conversation_url(&self.base_url, id.as_str());
        let detail: ConversationDetail = self.backend.get_json(&url).await?;
        let snapshot = ConversationSnapshot::from(detail);
        debug!(conversation_id = %id, messages = snapshot.messages.len(), "Fetched conversation");
        Ok(snapshot)
    }
}

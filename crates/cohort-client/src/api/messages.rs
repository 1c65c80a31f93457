//! Direct-messages API.

use crate::client::CohortClient;
use crate::error::Result;
use crate::types::{
    Conversation, DirectMessage, ListConversationsResponse, ListMessagesResponse,
    MarkReadResponse, SendMessageRequest,
};

/// Direct-messages API client.
pub struct MessagesApi {
    client: CohortClient,
}

impl MessagesApi {
    pub(crate) fn new(client: CohortClient) -> Self {
        Self { client }
    }

    /// List the caller's conversations.
    pub async fn conversations(&self) -> Result<ListConversationsResponse> {
        self.client.get("conversations").await
    }

    /// Get a conversation by ID.
    pub async fn conversation(&self, id: &str) -> Result<Conversation> {
        self.client.get(&format!("conversations/{}", id)).await
    }

    /// List a conversation's messages.
    pub async fn list(&self, conversation_id: &str) -> Result<ListMessagesResponse> {
        self.client
            .get(&format!("conversations/{}/messages", conversation_id))
            .await
    }

    /// Send a message in a conversation.
    pub async fn send(
        &self,
        conversation_id: &str,
        request: SendMessageRequest,
    ) -> Result<DirectMessage> {
        self.client
            .post(
                &format!("conversations/{}/messages", conversation_id),
                &request,
            )
            .await
    }

    /// Mark every message in a conversation as read.
    pub async fn mark_read(&self, conversation_id: &str) -> Result<MarkReadResponse> {
        self.client
            .post(
                &format!("conversations/{}/read", conversation_id),
                &serde_json::json!({}),
            )
            .await
    }
}

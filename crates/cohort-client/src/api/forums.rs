//! Forums API.

use serde::Serialize;

use crate::client::CohortClient;
use crate::error::Result;
use crate::types::{
    CreateReplyRequest, CreateThreadRequest, ForumReply, ForumThread, ListRepliesResponse,
    ListThreadsResponse,
};

/// Query parameters for listing threads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListThreadsQuery {
    /// Only threads belonging to this group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// Forums API client.
pub struct ForumsApi {
    client: CohortClient,
}

impl ForumsApi {
    pub(crate) fn new(client: CohortClient) -> Self {
        Self { client }
    }

    /// List threads.
    pub async fn threads(&self, query: &ListThreadsQuery) -> Result<ListThreadsResponse> {
        self.client.get_with_query("forums/threads", query).await
    }

    /// Get a thread by ID.
    pub async fn thread(&self, id: &str) -> Result<ForumThread> {
        self.client.get(&format!("forums/threads/{}", id)).await
    }

    /// Open a new thread.
    pub async fn create_thread(&self, request: CreateThreadRequest) -> Result<ForumThread> {
        self.client.post("forums/threads", &request).await
    }

    /// Delete a thread.
    pub async fn delete_thread(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("forums/threads/{}", id)).await
    }

    /// List a thread's replies.
    pub async fn replies(&self, thread_id: &str) -> Result<ListRepliesResponse> {
        self.client
            .get(&format!("forums/threads/{}/replies", thread_id))
            .await
    }

    /// Reply to a thread.
    pub async fn reply(&self, thread_id: &str, request: CreateReplyRequest) -> Result<ForumReply> {
        self.client
            .post(&format!("forums/threads/{}/replies", thread_id), &request)
            .await
    }
}

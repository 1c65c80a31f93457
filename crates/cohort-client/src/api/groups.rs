//! Study-groups API.

use crate::client::CohortClient;
use crate::error::Result;
use crate::types::{
    CreateGroupRequest, GroupMember, ListGroupsResponse, ListMembersResponse, StudyGroup,
    UpdateGroupRequest,
};

/// Study-groups API client.
pub struct GroupsApi {
    client: CohortClient,
}

impl GroupsApi {
    pub(crate) fn new(client: CohortClient) -> Self {
        Self { client }
    }

    /// List all groups visible to the caller.
    pub async fn list(&self) -> Result<ListGroupsResponse> {
        self.client.get("groups").await
    }

    /// Get a group by ID.
    pub async fn get(&self, id: &str) -> Result<StudyGroup> {
        self.client.get(&format!("groups/{}", id)).await
    }

    /// Create a new group.
    pub async fn create(&self, request: CreateGroupRequest) -> Result<StudyGroup> {
        self.client.post("groups", &request).await
    }

    /// Update a group.
    pub async fn update(&self, id: &str, request: UpdateGroupRequest) -> Result<StudyGroup> {
        self.client.patch(&format!("groups/{}", id), &request).await
    }

    /// Delete a group.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("groups/{}", id)).await
    }

    /// Join a group.
    pub async fn join(&self, id: &str) -> Result<GroupMember> {
        self.client
            .post(&format!("groups/{}/members", id), &serde_json::json!({}))
            .await
    }

    /// Leave a group.
    pub async fn leave(&self, id: &str) -> Result<()> {
        self.client
            .delete(&format!("groups/{}/members/me", id))
            .await
    }

    /// List a group's members.
    pub async fn members(&self, id: &str) -> Result<ListMembersResponse> {
        self.client.get(&format!("groups/{}/members", id)).await
    }
}

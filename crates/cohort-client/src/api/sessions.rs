//! Study-sessions API.

use serde::Serialize;

use crate::client::CohortClient;
use crate::error::Result;
use crate::types::{
    CreateStudySessionRequest, ListStudySessionsResponse, StudySession, UpdateStudySessionRequest,
};

/// Query parameters for listing study sessions.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListStudySessionsQuery {
    /// Only sessions belonging to this group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    /// Only sessions that have not started yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upcoming: Option<bool>,
}

/// Study-sessions API client.
pub struct SessionsApi {
    client: CohortClient,
}

impl SessionsApi {
    pub(crate) fn new(client: CohortClient) -> Self {
        Self { client }
    }

    /// List study sessions.
    pub async fn list(&self, query: &ListStudySessionsQuery) -> Result<ListStudySessionsResponse> {
        self.client.get_with_query("sessions", query).await
    }

    /// Get a study session by ID.
    pub async fn get(&self, id: &str) -> Result<StudySession> {
        self.client.get(&format!("sessions/{}", id)).await
    }

    /// Schedule a new study session.
    pub async fn create(&self, request: CreateStudySessionRequest) -> Result<StudySession> {
        self.client.post("sessions", &request).await
    }

    /// Update a study session.
    pub async fn update(
        &self,
        id: &str,
        request: UpdateStudySessionRequest,
    ) -> Result<StudySession> {
        self.client
            .patch(&format!("sessions/{}", id), &request)
            .await
    }

    /// Cancel a study session.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client.delete(&format!("sessions/{}", id)).await
    }

    /// RSVP to a study session.
    pub async fn rsvp(&self, id: &str) -> Result<StudySession> {
        self.client
            .post(&format!("sessions/{}/rsvp", id), &serde_json::json!({}))
            .await
    }
}

//! Achievements API.

use crate::client::CohortClient;
use crate::error::Result;
use crate::types::{ListAchievementsResponse, ListEarnedResponse};

/// Achievements API client.
pub struct AchievementsApi {
    client: CohortClient,
}

impl AchievementsApi {
    pub(crate) fn new(client: CohortClient) -> Self {
        Self { client }
    }

    /// List the achievement catalog.
    pub async fn list(&self) -> Result<ListAchievementsResponse> {
        self.client.get("achievements").await
    }

    /// List the achievements earned by the signed-in student.
    pub async fn mine(&self) -> Result<ListEarnedResponse> {
        self.client.get("achievements/earned").await
    }

    /// List the achievements earned by a student.
    pub async fn earned_by(&self, profile_id: &str) -> Result<ListEarnedResponse> {
        self.client
            .get(&format!("profiles/{}/achievements", profile_id))
            .await
    }
}

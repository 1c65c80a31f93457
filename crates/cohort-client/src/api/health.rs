//! Health API.

use crate::client::CohortClient;
use crate::error::Result;
use crate::types::HealthResponse;

/// Health API client.
pub struct HealthApi {
    client: CohortClient,
}

impl HealthApi {
    pub(crate) fn new(client: CohortClient) -> Self {
        Self { client }
    }

    /// Get the server health status.
    pub async fn get(&self) -> Result<HealthResponse> {
        self.client.get("health").await
    }

    /// Check whether the server is reachable and healthy.
    pub async fn is_healthy(&self) -> bool {
        matches!(self.get().await, Ok(health) if health.status == "ok")
    }
}

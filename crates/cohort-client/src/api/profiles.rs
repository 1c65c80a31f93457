//! Profiles API.

use crate::client::CohortClient;
use crate::error::Result;
use crate::types::{Profile, UpdateProfileRequest};

/// Profiles API client.
pub struct ProfilesApi {
    client: CohortClient,
}

impl ProfilesApi {
    pub(crate) fn new(client: CohortClient) -> Self {
        Self { client }
    }

    /// Get the signed-in profile.
    pub async fn me(&self) -> Result<Profile> {
        self.client.get("profiles/me").await
    }

    /// Get a profile by ID.
    pub async fn get(&self, id: &str) -> Result<Profile> {
        self.client.get(&format!("profiles/{}", id)).await
    }

    /// Update the signed-in profile.
    pub async fn update_me(&self, request: UpdateProfileRequest) -> Result<Profile> {
        self.client.patch("profiles/me", &request).await
    }
}

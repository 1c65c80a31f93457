//! Notifications API.

use crate::client::CohortClient;
use crate::error::Result;
use crate::types::{ListNotificationsResponse, MarkReadResponse, Notification};

/// Notifications API client.
pub struct NotificationsApi {
    client: CohortClient,
}

impl NotificationsApi {
    pub(crate) fn new(client: CohortClient) -> Self {
        Self { client }
    }

    /// List the caller's notifications.
    pub async fn list(&self) -> Result<ListNotificationsResponse> {
        self.client.get("notifications").await
    }

    /// Mark one notification as read.
    pub async fn mark_read(&self, id: &str) -> Result<Notification> {
        self.client
            .post(&format!("notifications/{}/read", id), &serde_json::json!({}))
            .await
    }

    /// Mark every notification as read.
    pub async fn mark_all_read(&self) -> Result<MarkReadResponse> {
        self.client
            .post("notifications/read-all", &serde_json::json!({}))
            .await
    }
}

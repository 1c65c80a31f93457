//! Auth API: login, logout.
//!
//! These endpoints sit outside the credential pipeline: a rejected login or
//! refresh must never trigger another refresh attempt.

use cohort_auth::Credential;

use crate::client::CohortClient;
use crate::error::{Error, Result};
use crate::types::{LoginRequest, LoginResponse};

/// Auth API client.
pub struct AuthApi {
    client: CohortClient,
}

impl AuthApi {
    pub(crate) fn new(client: CohortClient) -> Self {
        Self { client }
    }

    /// Sign in with email and password, storing the returned credential so
    /// subsequent requests are authenticated.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self.client.post_plain("auth/login", &request).await?;

        let credential = Credential::new(
            response.access_token.clone(),
            response.refresh_token.clone(),
            response.expires_in,
        );
        self.client
            .token_store()
            .set(credential)
            .await
            .map_err(Error::from)?;

        tracing::info!("signed in as {}", response.profile.email);
        Ok(response)
    }

    /// Sign out. Server-side revocation is best-effort; the local credential
    /// is always cleared.
    pub async fn logout(&self) -> Result<()> {
        if let Ok(Some(credential)) = self.client.token_store().get().await {
            let url = self.client.url("auth/logout")?;
            let result = self
                .client
                .inner()
                .http
                .post(url)
                .bearer_auth(&credential.access_token)
                .timeout(self.client.inner().timeout)
                .send()
                .await;
            if let Err(err) = result {
                tracing::debug!(error = %err, "server-side logout failed");
            }
        }

        self.client.token_store().clear().await.map_err(Error::from)
    }
}

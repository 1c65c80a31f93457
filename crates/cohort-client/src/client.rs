//! Main client implementation.
//!
//! Every resource request runs through two hooks around the dispatch:
//!
//! - pre-send: [`RefreshCoordinator::bearer_token`] guarantees the request
//!   carries a currently-valid credential (refreshing proactively when it is
//!   about to expire), or none at all when the caller is unauthenticated;
//! - post-response: an unauthorized response triggers one single-flight
//!   refresh and one re-dispatch; a second rejection, or a deactivation
//!   payload, ends the session.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use tokio::sync::broadcast;
use url::Url;

use cohort_auth::{
    HttpRefresher, InvalidationReason, RefreshCoordinator, SessionInvalidated, TokenRefresher,
    TokenStore,
};

use crate::api::{
    AchievementsApi, AuthApi, ForumsApi, GroupsApi, HealthApi, MessagesApi, NotificationsApi,
    ProfilesApi, SessionsApi,
};
use crate::error::{Error, ErrorResponse, Result};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Cohort API client.
///
/// Provides typed access to the study-group platform endpoints. Cloning is
/// cheap and all clones share one refresh coordinator, which is what keeps
/// the single-flight guarantee intact across concurrent requests.
///
/// # Example
///
/// ```no_run
/// use cohort_client::CohortClient;
///
/// # async fn example() -> cohort_client::Result<()> {
/// let client = CohortClient::builder()
///     .base_url("http://localhost:8080")
///     .build()?;
///
/// client.auth().login("ana@example.edu", "secret").await?;
/// let groups = client.groups().list().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CohortClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    /// HTTP client.
    pub(crate) http: reqwest::Client,
    /// Base URL for API requests.
    pub(crate) base_url: Url,
    /// Request timeout.
    pub(crate) timeout: Duration,
    /// Single-flight refresh coordinator; one per client, shared by clones.
    pub(crate) coordinator: Arc<RefreshCoordinator>,
}

impl CohortClient {
    /// Get access to the inner client state (for API implementations).
    pub(crate) fn inner(&self) -> &ClientInner {
        &self.inner
    }

    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The token store backing this client's session.
    pub fn token_store(&self) -> &TokenStore {
        self.inner.coordinator.store()
    }

    /// Register for forced-logout events, so the UI layer can navigate to a
    /// re-authentication screen with the right message.
    pub fn session_events(&self) -> broadcast::Receiver<SessionInvalidated> {
        self.inner.coordinator.subscribe()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the auth API (login, logout, current profile).
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// Access the profiles API.
    pub fn profiles(&self) -> ProfilesApi {
        ProfilesApi::new(self.clone())
    }

    /// Access the study-groups API.
    pub fn groups(&self) -> GroupsApi {
        GroupsApi::new(self.clone())
    }

    /// Access the study-sessions API.
    pub fn sessions(&self) -> SessionsApi {
        SessionsApi::new(self.clone())
    }

    /// Access the forums API.
    pub fn forums(&self) -> ForumsApi {
        ForumsApi::new(self.clone())
    }

    /// Access the direct-messages API.
    pub fn messages(&self) -> MessagesApi {
        MessagesApi::new(self.clone())
    }

    /// Access the achievements API.
    pub fn achievements(&self) -> AchievementsApi {
        AchievementsApi::new(self.clone())
    }

    /// Access the notifications API.
    pub fn notifications(&self) -> NotificationsApi {
        NotificationsApi::new(self.clone())
    }

    /// Access the health API.
    pub fn health(&self) -> HealthApi {
        HealthApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner
            .base_url
            .join(&format!("api/v1/{}", path))
            .map_err(Error::from)
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        let request = self.inner.http.get(url).timeout(self.inner.timeout);
        let response = self.send_with_auth(request).await?;
        self.parse(response).await
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let request = self
            .inner
            .http
            .get(url)
            .query(query)
            .timeout(self.inner.timeout);
        let response = self.send_with_auth(request).await?;
        self.parse(response).await
    }

    /// Make a POST request.
    pub(crate) async fn post<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let request = self
            .inner
            .http
            .post(url)
            .json(body)
            .timeout(self.inner.timeout);
        let response = self.send_with_auth(request).await?;
        self.parse(response).await
    }

    /// Make a PATCH request.
    pub(crate) async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let request = self
            .inner
            .http
            .patch(url)
            .json(body)
            .timeout(self.inner.timeout);
        let response = self.send_with_auth(request).await?;
        self.parse(response).await
    }

    /// Make a DELETE request.
    pub(crate) async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path)?;
        let request = self.inner.http.delete(url).timeout(self.inner.timeout);
        let response = self.send_with_auth(request).await?;

        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }
        Ok(())
    }

    /// Make a POST request outside the credential pipeline.
    ///
    /// Login and refresh calls must never trigger the refresh-and-retry
    /// cycle themselves, or a rejected credential would recurse forever.
    pub(crate) async fn post_plain<T, B>(&self, path: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(path)?;
        let response = self
            .inner
            .http
            .post(url)
            .json(body)
            .timeout(self.inner.timeout)
            .send()
            .await?;
        self.parse(response).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Pre-send / post-response hooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Dispatch a request with the session credential attached, refreshing
    /// and re-dispatching exactly once if the server rejects it.
    pub(crate) async fn send_with_auth(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        // Clone before the credential is attached; the retry gets the fresh
        // token explicitly.
        let retry = request.try_clone();

        let request = self.authorize(request).await?;
        let response = request.send().await?;

        let status = response.status();
        if status != StatusCode::UNAUTHORIZED && status != StatusCode::FORBIDDEN {
            return Ok(response);
        }

        let failure = Self::read_failure(response).await;
        if failure.is_deactivation() {
            // No refresh can fix a disabled account.
            self.inner
                .coordinator
                .invalidate(InvalidationReason::Deactivated, failure.message.clone())
                .await;
            return Err(Error::AccountDeactivated(failure.message));
        }
        if status == StatusCode::FORBIDDEN {
            // Plain forbidden is a permissions problem, not a credential one.
            return Err(Error::Api {
                status: status.as_u16(),
                code: failure.code,
                message: failure.message,
            });
        }

        let Some(retry) = retry else {
            return Err(Error::Auth(failure.message));
        };

        // fresh -> retried: one refresh, one re-dispatch. The coordinator
        // clears the store and signals if the refresh itself fails.
        tracing::debug!("request unauthorized, refreshing and retrying once");
        let token = self.inner.coordinator.force_refresh().await?;
        let retried = retry.bearer_auth(&token).send().await?;

        let retried_status = retried.status();
        if retried_status != StatusCode::UNAUTHORIZED && retried_status != StatusCode::FORBIDDEN {
            return Ok(retried);
        }

        // retried -> terminal.
        let failure = Self::read_failure(retried).await;
        if failure.is_deactivation() {
            self.inner
                .coordinator
                .invalidate(InvalidationReason::Deactivated, failure.message.clone())
                .await;
            return Err(Error::AccountDeactivated(failure.message));
        }
        if retried_status == StatusCode::FORBIDDEN {
            return Err(Error::Api {
                status: retried_status.as_u16(),
                code: failure.code,
                message: failure.message,
            });
        }

        tracing::warn!("request still unauthorized after refresh, ending session");
        self.inner
            .coordinator
            .invalidate(InvalidationReason::Expired, failure.message.clone())
            .await;
        Err(Error::UnauthorizedAfterRetry(failure.message))
    }

    /// Attach the current bearer credential, refreshing first if it is
    /// expired or about to expire. Unauthenticated clients send as-is.
    async fn authorize(&self, request: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        match self.inner.coordinator.bearer_token().await? {
            Some(token) => Ok(request.bearer_auth(token)),
            None => Ok(request),
        }
    }

    /// Best-effort parse of a failed response body.
    async fn read_failure(response: reqwest::Response) -> ErrorResponse {
        let status = response.status().as_u16();
        response
            .json::<ErrorResponse>()
            .await
            .unwrap_or_else(|_| ErrorResponse {
                code: "unknown".to_string(),
                message: format!("HTTP {}", status),
            })
    }

    /// Handle a response, extracting the body or error.
    pub(crate) async fn parse<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let failure = Self::read_failure(response).await;

        if failure.is_deactivation() {
            Error::AccountDeactivated(failure.message)
        } else if status == 404 {
            Error::NotFound(failure.message)
        } else if status == 401 {
            Error::Auth(failure.message)
        } else {
            Error::Api {
                status,
                code: failure.code,
                message: failure.message,
            }
        }
    }
}

/// Builder for creating a [`CohortClient`].
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    user_agent: Option<String>,
    token_store: Option<TokenStore>,
    refresher: Option<Arc<dyn TokenRefresher>>,
    coordinator: Option<Arc<RefreshCoordinator>>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            token_store: None,
            refresher: None,
            coordinator: None,
        }
    }

    /// Set the base URL for the server.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Use a specific token store (e.g. file-backed for persistence across
    /// restarts). Defaults to an in-memory store.
    pub fn token_store(mut self, store: TokenStore) -> Self {
        self.token_store = Some(store);
        self
    }

    /// Use a specific refresh exchange. Defaults to the backend's own
    /// refresh endpoint.
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    /// Share an existing coordinator (takes precedence over `token_store`
    /// and `refresher`).
    pub fn coordinator(mut self, coordinator: Arc<RefreshCoordinator>) -> Self {
        self.coordinator = Some(coordinator);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<CohortClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::Config("base_url is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        // Build default headers
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("cohort-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        let coordinator = match self.coordinator {
            Some(coordinator) => coordinator,
            None => {
                let store = self.token_store.unwrap_or_else(TokenStore::in_memory);
                let refresher: Arc<dyn TokenRefresher> = match self.refresher {
                    Some(refresher) => refresher,
                    None => Arc::new(
                        HttpRefresher::new(&base_url)
                            .map_err(|e| Error::Config(e.to_string()))?,
                    ),
                };
                Arc::new(RefreshCoordinator::new(store, refresher))
            }
        };

        Ok(CohortClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                coordinator,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_base_url() {
        let result = ClientBuilder::new().build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_with_base_url() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8080")
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_builder_normalizes_trailing_slash() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8080/")
            .build()
            .unwrap();

        assert_eq!(client.base_url().as_str(), "http://localhost:8080/");
    }

    #[test]
    fn test_url_building() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8080")
            .build()
            .unwrap();

        let url = client.url("groups").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/groups");

        let url = client.url("/groups").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/groups");
    }

    #[test]
    fn test_clones_share_one_coordinator() {
        let client = ClientBuilder::new()
            .base_url("http://localhost:8080")
            .build()
            .unwrap();
        let clone = client.clone();

        assert!(Arc::ptr_eq(
            &client.inner.coordinator,
            &clone.inner.coordinator
        ));
    }
}

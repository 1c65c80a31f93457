//! Single-flight session refresh.
//!
//! Many in-flight requests can observe an expiring credential at the same
//! time. The coordinator guarantees that at most one refresh exchange is in
//! flight at any moment: the first request to notice becomes the leader and
//! performs the exchange, later arrivals queue behind it and are handed the
//! outcome in arrival order. A failed exchange rejects every queued request
//! with the same error, clears the store, and fires the session-invalidated
//! signal exactly once.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, oneshot};
use url::Url;

use crate::credential::Credential;
use crate::error::{AuthError, Result};
use crate::signal::{InvalidationReason, SessionInvalidated, SessionSignal};
use crate::store::TokenStore;

// ============================================================================
// TokenRefresher
// ============================================================================

/// Remote refresh exchange.
#[async_trait]
pub trait TokenRefresher: Send + Sync + std::fmt::Debug {
    /// Exchange a refresh token for a new credential pair.
    async fn refresh(&self, refresh_token: &str) -> Result<Credential>;
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    expires_in: u64,
}

/// Production refresher that POSTs to the backend's refresh endpoint.
#[derive(Debug)]
pub struct HttpRefresher {
    http: reqwest::Client,
    refresh_url: Url,
}

impl HttpRefresher {
    /// Refresher targeting `<base>/api/v1/auth/refresh`.
    pub fn new(base_url: &Url) -> Result<Self> {
        let refresh_url = base_url
            .join("api/v1/auth/refresh")
            .map_err(|e| AuthError::Network(format!("Invalid base URL: {}", e)))?;
        Ok(Self::with_url(refresh_url))
    }

    /// Refresher with an explicit endpoint URL.
    pub fn with_url(refresh_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            refresh_url,
        }
    }
}

#[async_trait]
impl TokenRefresher for HttpRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
        let response = self
            .http
            .post(self.refresh_url.clone())
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(|e| AuthError::Network(format!("Refresh request failed: {}", e)))?;

        if !response.status().is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AuthError::RefreshFailed(text));
        }

        let body: RefreshResponse = response.json().await.map_err(|e| {
            AuthError::Serialization(format!("Failed to parse refresh response: {}", e))
        })?;

        Ok(Credential::new(
            body.access_token,
            body.refresh_token,
            body.expires_in,
        ))
    }
}

// ============================================================================
// RefreshCoordinator
// ============================================================================

type WaiterResult = std::result::Result<String, AuthError>;

/// Re-entrancy guard plus the queue of requests waiting on the in-flight
/// attempt. The queue is only ever non-empty while `refreshing` is true.
#[derive(Debug, Default)]
struct RefreshState {
    refreshing: bool,
    waiters: VecDeque<oneshot::Sender<WaiterResult>>,
}

/// Coordinates credential refresh across concurrent requests.
///
/// Constructed once per process and shared by handle with every request
/// pipeline; the single-flight guarantee only holds if all requests go
/// through the same instance.
#[derive(Debug)]
pub struct RefreshCoordinator {
    store: TokenStore,
    refresher: Arc<dyn TokenRefresher>,
    signal: SessionSignal,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(store: TokenStore, refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            store,
            refresher,
            signal: SessionSignal::new(),
            state: Mutex::new(RefreshState::default()),
        }
    }

    /// The underlying token store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Register for forced-logout events.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionInvalidated> {
        self.signal.subscribe()
    }

    /// Bearer token to attach to an outgoing request.
    ///
    /// Returns `Ok(None)` when no credential is stored: the request proceeds
    /// unauthenticated and the server's response decides what happens next.
    /// A credential inside the proactive-refresh window is renewed before
    /// the request is dispatched.
    pub async fn bearer_token(&self) -> Result<Option<String>> {
        let Some(credential) = self.store.get().await? else {
            return Ok(None);
        };

        if !self.store.needs_refresh(&credential) {
            return Ok(Some(credential.access_token));
        }

        tracing::debug!("credential expiring, refreshing before dispatch");
        self.refresh_or_join().await.map(Some)
    }

    /// Refresh after the server rejected the current access token, joining
    /// the in-flight attempt if one exists.
    pub async fn force_refresh(&self) -> Result<String> {
        self.refresh_or_join().await
    }

    /// Terminal handling: drop the credential and notify subscribers once.
    pub async fn invalidate(&self, reason: InvalidationReason, message: String) {
        if let Err(err) = self.store.clear().await {
            tracing::warn!(error = %err, "failed to clear credential store");
        }
        self.signal.emit(reason, message);
    }

    async fn refresh_or_join(&self) -> Result<String> {
        // Leader election happens synchronously under the lock; the lock is
        // never held across an await point.
        let waiter = {
            let mut state = self.state.lock();
            if state.refreshing {
                let (tx, rx) = oneshot::channel();
                state.waiters.push_back(tx);
                Some(rx)
            } else {
                state.refreshing = true;
                None
            }
        };

        match waiter {
            Some(rx) => rx.await.map_err(|_| {
                AuthError::RefreshFailed("refresh attempt dropped before settling".to_string())
            })?,
            None => self.lead_refresh().await,
        }
    }

    /// Perform the exchange as the single in-flight leader, then settle the
    /// queue in arrival order.
    async fn lead_refresh(&self) -> Result<String> {
        struct LeadGuard<'a> {
            coordinator: &'a RefreshCoordinator,
            settled: bool,
        }

        impl Drop for LeadGuard<'_> {
            fn drop(&mut self) {
                if self.settled {
                    return;
                }
                // Leader dropped mid-exchange; reject queued requests
                // instead of stranding them.
                for tx in self.coordinator.take_waiters() {
                    let _ = tx.send(Err(AuthError::RefreshFailed(
                        "refresh attempt cancelled".to_string(),
                    )));
                }
            }
        }

        let mut guard = LeadGuard {
            coordinator: self,
            settled: false,
        };

        let outcome = self.exchange().await;

        let waiters = self.take_waiters();
        guard.settled = true;
        for tx in waiters {
            let _ = tx.send(outcome.clone());
        }
        outcome
    }

    fn take_waiters(&self) -> VecDeque<oneshot::Sender<WaiterResult>> {
        let mut state = self.state.lock();
        state.refreshing = false;
        std::mem::take(&mut state.waiters)
    }

    async fn exchange(&self) -> Result<String> {
        let Some(current) = self.store.get().await? else {
            // Logged out between noticing the expiry and leading the refresh.
            return Err(AuthError::RefreshFailed(
                "no refresh token available".to_string(),
            ));
        };

        match self.refresher.refresh(&current.refresh_token).await {
            Ok(mut fresh) => {
                // Some backends omit the refresh token on rotation.
                if fresh.refresh_token.is_empty() {
                    fresh.refresh_token = current.refresh_token;
                }
                let token = fresh.access_token.clone();
                self.store.set(fresh).await?;
                tracing::info!("session credential refreshed");
                Ok(token)
            }
            Err(err) => {
                match &err {
                    AuthError::RefreshFailed(_) => {
                        tracing::warn!(error = %err, "refresh token rejected, ending session");
                        self.invalidate(InvalidationReason::Expired, err.to_string())
                            .await;
                    }
                    AuthError::AccountDeactivated(msg) => {
                        tracing::warn!(error = %err, "account deactivated, ending session");
                        self.invalidate(InvalidationReason::Deactivated, msg.clone())
                            .await;
                    }
                    // Transient failures keep the credential; the caller may
                    // try again later.
                    _ => tracing::warn!(error = %err, "refresh attempt failed"),
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Notify;

    fn expired_credential() -> Credential {
        Credential {
            access_token: "stale".to_string(),
            refresh_token: "refresh-1".to_string(),
            expires_at: 1,
            issued_at: String::new(),
        }
    }

    /// Refresher that resolves immediately with a fixed outcome.
    #[derive(Debug)]
    struct CountingRefresher {
        calls: AtomicU32,
        outcome: std::sync::Mutex<Result<Credential>>,
    }

    impl CountingRefresher {
        fn succeeding(access_token: &str) -> Self {
            Self {
                calls: AtomicU32::new(0),
                outcome: std::sync::Mutex::new(Ok(Credential::new(access_token, "refresh-2", 3600))),
            }
        }

        fn failing(err: AuthError) -> Self {
            Self {
                calls: AtomicU32::new(0),
                outcome: std::sync::Mutex::new(Err(err)),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, _refresh_token: &str) -> Result<Credential> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.lock().unwrap().clone()
        }
    }

    /// Refresher that holds the exchange open until the test releases it,
    /// so concurrent callers can pile up on the in-flight attempt.
    #[derive(Debug)]
    struct GatedRefresher {
        inner: CountingRefresher,
        gate: Notify,
    }

    impl GatedRefresher {
        fn succeeding(access_token: &str) -> Self {
            Self {
                inner: CountingRefresher::succeeding(access_token),
                gate: Notify::new(),
            }
        }

        fn failing(err: AuthError) -> Self {
            Self {
                inner: CountingRefresher::failing(err),
                gate: Notify::new(),
            }
        }

        fn release(&self) {
            self.gate.notify_one();
        }

        fn calls(&self) -> u32 {
            self.inner.calls()
        }
    }

    #[async_trait]
    impl TokenRefresher for GatedRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<Credential> {
            self.gate.notified().await;
            self.inner.refresh(refresh_token).await
        }
    }

    async fn coordinator_with(
        refresher: Arc<dyn TokenRefresher>,
        credential: Option<Credential>,
    ) -> RefreshCoordinator {
        let store = TokenStore::in_memory();
        if let Some(credential) = credential {
            store.set(credential).await.unwrap();
        }
        RefreshCoordinator::new(store, refresher)
    }

    #[tokio::test]
    async fn test_no_credential_attaches_nothing() {
        let refresher = Arc::new(CountingRefresher::succeeding("new"));
        let coordinator = coordinator_with(refresher.clone(), None).await;

        let token = coordinator.bearer_token().await.unwrap();
        assert!(token.is_none());
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_fresh_credential_passes_through() {
        let refresher = Arc::new(CountingRefresher::succeeding("new"));
        let coordinator =
            coordinator_with(refresher.clone(), Some(Credential::new("live", "r", 3600))).await;

        let token = coordinator.bearer_token().await.unwrap();
        assert_eq!(token.as_deref(), Some("live"));
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_expired_credential_is_refreshed_before_dispatch() {
        let refresher = Arc::new(CountingRefresher::succeeding("fresh"));
        let coordinator = coordinator_with(refresher.clone(), Some(expired_credential())).await;

        let token = coordinator.bearer_token().await.unwrap();
        assert_eq!(token.as_deref(), Some("fresh"));
        assert_eq!(refresher.calls(), 1);

        let stored = coordinator.store().get().await.unwrap().unwrap();
        assert_eq!(stored.access_token, "fresh");
        assert_eq!(stored.refresh_token, "refresh-2");
    }

    #[tokio::test]
    async fn test_blank_rotated_refresh_token_keeps_previous() {
        let refresher = Arc::new(CountingRefresher {
            calls: AtomicU32::new(0),
            outcome: std::sync::Mutex::new(Ok(Credential::new("fresh", "", 3600))),
        });
        let coordinator = coordinator_with(refresher, Some(expired_credential())).await;

        coordinator.force_refresh().await.unwrap();
        let stored = coordinator.store().get().await.unwrap().unwrap();
        assert_eq!(stored.refresh_token, "refresh-1");
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_concurrent_requests_share_one_refresh() {
        let refresher = Arc::new(GatedRefresher::succeeding("fresh"));
        let coordinator =
            Arc::new(coordinator_with(refresher.clone(), Some(expired_credential())).await);

        let mut handles = Vec::new();
        for _ in 0..3 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(
                async move { coordinator.bearer_token().await },
            ));
            // Let the task run to its suspension point before the next joins.
            tokio::task::yield_now().await;
        }
        tokio::task::yield_now().await;

        refresher.release();

        for handle in handles {
            let token = handle.await.unwrap().unwrap();
            assert_eq!(token.as_deref(), Some("fresh"));
        }
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_waiters_resolve_in_arrival_order() {
        let refresher = Arc::new(GatedRefresher::succeeding("fresh"));
        let coordinator =
            Arc::new(coordinator_with(refresher.clone(), Some(expired_credential())).await);

        // Leader occupies the in-flight slot first.
        let leader = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.force_refresh().await })
        };
        tokio::task::yield_now().await;

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut waiters = Vec::new();
        for i in 0..3u32 {
            let coordinator = coordinator.clone();
            let order = order.clone();
            waiters.push(tokio::spawn(async move {
                coordinator.force_refresh().await.unwrap();
                order.lock().unwrap().push(i);
            }));
            tokio::task::yield_now().await;
        }

        refresher.release();
        leader.await.unwrap().unwrap();
        for waiter in waiters {
            waiter.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_failure_rejects_queue_and_signals_once() {
        let refresher = Arc::new(GatedRefresher::failing(AuthError::RefreshFailed(
            "refresh token revoked".to_string(),
        )));
        let coordinator =
            Arc::new(coordinator_with(refresher.clone(), Some(expired_credential())).await);
        let mut events = coordinator.subscribe();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(
                async move { coordinator.force_refresh().await },
            ));
            tokio::task::yield_now().await;
        }

        refresher.release();

        for handle in handles {
            let result = handle.await.unwrap();
            assert!(matches!(result, Err(AuthError::RefreshFailed(_))));
        }
        assert_eq!(refresher.calls(), 1);

        // Store cleared, exactly one invalidation event.
        assert!(coordinator.store().get().await.unwrap().is_none());
        let event = events.try_recv().unwrap();
        assert_eq!(event.reason, InvalidationReason::Expired);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_transient_network_failure_keeps_credential() {
        let refresher = Arc::new(CountingRefresher::failing(AuthError::Network(
            "connection reset".to_string(),
        )));
        let coordinator = coordinator_with(refresher, Some(expired_credential())).await;
        let mut events = coordinator.subscribe();

        let result = coordinator.force_refresh().await;
        assert!(matches!(result, Err(AuthError::Network(_))));

        assert!(coordinator.store().get().await.unwrap().is_some());
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_refresh_without_stored_credential_fails() {
        let refresher = Arc::new(CountingRefresher::succeeding("fresh"));
        let coordinator = coordinator_with(refresher.clone(), None).await;

        let result = coordinator.force_refresh().await;
        assert!(matches!(result, Err(AuthError::RefreshFailed(_))));
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn test_sequential_refreshes_are_independent() {
        let refresher = Arc::new(CountingRefresher::succeeding("fresh"));
        let coordinator = coordinator_with(refresher.clone(), Some(expired_credential())).await;

        coordinator.force_refresh().await.unwrap();
        coordinator.force_refresh().await.unwrap();
        assert_eq!(refresher.calls(), 2);
    }
}

//! Error types for the auth crate.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors that can occur while managing the session credential.
///
/// `Clone` so a single refresh failure can be delivered to every request
/// queued on the in-flight attempt.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    /// Network/HTTP error talking to the auth endpoints.
    #[error("Network error: {0}")]
    Network(String),

    /// The refresh token was rejected; the session cannot be recovered.
    #[error("Session refresh failed: {0}")]
    RefreshFailed(String),

    /// The account was disabled server-side; no refresh can fix this.
    #[error("Account deactivated: {0}")]
    AccountDeactivated(String),

    /// Backing storage error.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AuthError {
    /// Whether this failure ends the session and requires re-authentication.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthError::RefreshFailed(_) | AuthError::AccountDeactivated(_)
        )
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        AuthError::Network(e.to_string())
    }
}

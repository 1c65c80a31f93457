//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server returned an error response.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error code from server.
        code: String,
        /// Error message from server.
        message: String,
    },

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The account was disabled server-side; re-authentication cannot help.
    #[error("Account deactivated: {0}")]
    AccountDeactivated(String),

    /// The request was rejected again after a successful refresh and one
    /// retry; the session has been invalidated.
    #[error("Unauthorized after retry: {0}")]
    UnauthorizedAfterRetry(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_)) || matches!(self, Error::Api { status: 404, .. })
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Error::Auth(_) | Error::AccountDeactivated(_) | Error::UnauthorizedAfterRetry(_)
        ) || matches!(self, Error::Api { status: 401, .. })
    }

    /// Check if this error means the session is over and the user must sign
    /// in again.
    pub fn is_session_invalidated(&self) -> bool {
        matches!(
            self,
            Error::AccountDeactivated(_) | Error::UnauthorizedAfterRetry(_)
        )
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Api { status, .. } if *status >= 500)
    }
}

impl From<cohort_auth::AuthError> for Error {
    fn from(e: cohort_auth::AuthError) -> Self {
        match e {
            cohort_auth::AuthError::AccountDeactivated(message) => {
                Error::AccountDeactivated(message)
            }
            other => Error::Auth(other.to_string()),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error response from the server.
#[derive(Debug, serde::Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl ErrorResponse {
    /// Whether this failure says the account itself was disabled, as opposed
    /// to an expired credential.
    ///
    /// Current backends set a structured code; older deployments only set a
    /// human-readable message (Spanish or English), so those two exact
    /// phrasings are still recognized.
    pub(crate) fn is_deactivation(&self) -> bool {
        if self.code == "account_deactivated" {
            return true;
        }
        let message = self.message.to_lowercase();
        message.contains("account deactivated") || message.contains("cuenta desactivada")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deactivation_detection() {
        let structured = ErrorResponse {
            code: "account_deactivated".to_string(),
            message: "disabled".to_string(),
        };
        assert!(structured.is_deactivation());

        let legacy_es = ErrorResponse {
            code: String::new(),
            message: "Cuenta desactivada por el administrador".to_string(),
        };
        assert!(legacy_es.is_deactivation());

        let legacy_en = ErrorResponse {
            code: String::new(),
            message: "Account deactivated".to_string(),
        };
        assert!(legacy_en.is_deactivation());

        let plain = ErrorResponse {
            code: "token_expired".to_string(),
            message: "Token has expired".to_string(),
        };
        assert!(!plain.is_deactivation());
    }

    #[test]
    fn test_session_invalidated_predicate() {
        assert!(Error::AccountDeactivated("x".to_string()).is_session_invalidated());
        assert!(Error::UnauthorizedAfterRetry("x".to_string()).is_session_invalidated());
        assert!(!Error::Auth("x".to_string()).is_session_invalidated());
    }
}

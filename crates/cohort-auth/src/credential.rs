//! The bearer credential pair and its expiry predicates.

use serde::{Deserialize, Serialize};

/// Milliseconds since the unix epoch.
pub(crate) fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Credential pair issued by the Cohort backend.
///
/// The access token is short-lived proof of identity attached to outgoing
/// requests; the refresh token is the longer-lived secret used to mint a new
/// access token without re-entering user credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: String,
    /// Absolute expiry of the access token (unix milliseconds).
    #[serde(default)]
    pub expires_at: u64,
    /// When the credential was issued (ISO 8601), for display.
    #[serde(default)]
    pub issued_at: String,
}

impl Credential {
    /// Build a credential from a token response, stamping expiry and issue
    /// time from the current clock.
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in_secs: u64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at: now_ms() + expires_in_secs * 1000,
            issued_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Whether the access token is past its expiry. An unset expiry counts
    /// as expired.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        if self.expires_at == 0 {
            return true;
        }
        now_ms >= self.expires_at
    }

    /// Whether the access token is expired or will expire within `lead_ms`.
    pub fn expires_within(&self, now_ms: u64, lead_ms: u64) -> bool {
        if self.expires_at == 0 {
            return true;
        }
        now_ms >= self.expires_at.saturating_sub(lead_ms)
    }

    /// Seconds until expiry, zero if already expired.
    pub fn seconds_until_expiry(&self) -> u64 {
        let now = now_ms();
        if self.expires_at > now {
            (self.expires_at - now) / 1000
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential_expiring_at(expires_at: u64) -> Credential {
        Credential {
            access_token: "t".to_string(),
            refresh_token: "r".to_string(),
            expires_at,
            issued_at: String::new(),
        }
    }

    #[test]
    fn test_unset_expiry_counts_as_expired() {
        let credential = credential_expiring_at(0);
        assert!(credential.is_expired(now_ms()));
        assert!(credential.expires_within(now_ms(), 0));
    }

    #[test]
    fn test_expiry_predicates() {
        let now = now_ms();

        let valid = credential_expiring_at(now + 3600 * 1000);
        assert!(!valid.is_expired(now));
        assert!(!valid.expires_within(now, 60 * 1000));

        let expiring = credential_expiring_at(now + 30 * 1000);
        assert!(!expiring.is_expired(now));
        assert!(expiring.expires_within(now, 60 * 1000));

        let expired = credential_expiring_at(now.saturating_sub(1000));
        assert!(expired.is_expired(now));
        assert!(expired.expires_within(now, 60 * 1000));
    }

    #[test]
    fn test_new_stamps_expiry() {
        let credential = Credential::new("a", "r", 3600);
        assert!(!credential.is_expired(now_ms()));
        assert!(credential.seconds_until_expiry() > 3500);
        assert!(!credential.issued_at.is_empty());
    }
}

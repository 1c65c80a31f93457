//! Forced-logout signaling.
//!
//! When the session cannot be recovered (refresh token rejected, account
//! deactivated) the UI layer must send the user back through authentication.
//! [`SessionSignal`] is the registration point it subscribes to.

use tokio::sync::broadcast;

/// Why the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    /// The credential could not be refreshed; the user must sign in again.
    Expired,
    /// The account was disabled server-side.
    Deactivated,
}

impl InvalidationReason {
    /// User-facing description for the re-authentication screen.
    pub fn description(&self) -> &'static str {
        match self {
            InvalidationReason::Expired => "Your session has expired. Please sign in again.",
            InvalidationReason::Deactivated => {
                "Your account has been deactivated. Contact support for help."
            }
        }
    }
}

/// Event delivered to session-invalidated subscribers.
#[derive(Debug, Clone)]
pub struct SessionInvalidated {
    pub reason: InvalidationReason,
    /// Server-provided detail, when available.
    pub message: String,
}

/// Broadcast hook for forced-logout events.
///
/// Emitting without subscribers is fine; the event is simply dropped.
#[derive(Debug, Clone)]
pub struct SessionSignal {
    tx: broadcast::Sender<SessionInvalidated>,
}

impl SessionSignal {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(16);
        Self { tx }
    }

    /// Register a subscriber. May be called any number of times.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionInvalidated> {
        self.tx.subscribe()
    }

    /// Emit one event to every current subscriber.
    pub fn emit(&self, reason: InvalidationReason, message: String) {
        tracing::info!(?reason, "session invalidated");
        let _ = self.tx.send(SessionInvalidated { reason, message });
    }
}

impl Default for SessionSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let signal = SessionSignal::new();
        let mut rx = signal.subscribe();

        signal.emit(InvalidationReason::Expired, "token revoked".to_string());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.reason, InvalidationReason::Expired);
        assert_eq!(event.message, "token revoked");
    }

    #[tokio::test]
    async fn test_emit_without_subscribers_is_harmless() {
        let signal = SessionSignal::new();
        signal.emit(InvalidationReason::Deactivated, String::new());
    }

    #[test]
    fn test_reason_descriptions_differ() {
        assert_ne!(
            InvalidationReason::Expired.description(),
            InvalidationReason::Deactivated.description()
        );
    }
}

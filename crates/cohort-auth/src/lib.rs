//! Session credential management for the Cohort API.
//!
//! Keeps a client's bearer credential fresh across many concurrent outgoing
//! requests without ever issuing duplicate refresh calls, and tells the UI
//! layer when the session cannot be recovered.
//!
//! # Components
//!
//! - [`credential`] — the access/refresh token pair and its expiry predicates
//! - [`store`] — single source of truth for the current credential, with
//!   pluggable durable backing
//! - [`refresh`] — the single-flight refresh coordinator and the remote
//!   refresh exchange
//! - [`signal`] — forced-logout notification hook for the UI layer

pub mod credential;
pub mod error;
pub mod refresh;
pub mod signal;
pub mod store;

pub use credential::Credential;
pub use error::{AuthError, Result};
pub use refresh::{HttpRefresher, RefreshCoordinator, TokenRefresher};
pub use signal::{InvalidationReason, SessionInvalidated, SessionSignal};
pub use store::{CredentialStorage, FileStorage, MemoryStorage, TokenStore};

//! HTTP client SDK for the Cohort study-group platform.
//!
//! This crate provides a typed client for the Cohort server API. Every
//! request runs through a session-credential pipeline: an expiring bearer
//! token is refreshed before dispatch, an unauthorized response triggers a
//! single refresh-and-retry, and unrecoverable failures surface a
//! session-invalidated event the UI layer can subscribe to. Concurrent
//! requests never issue duplicate refresh calls; they converge on the one
//! in-flight attempt (see [`cohort_auth::RefreshCoordinator`]).
//!
//! # Example
//!
//! ```no_run
//! use cohort_client::{CohortClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = CohortClient::builder()
//!     .base_url("http://localhost:8080")
//!     .build()?;
//!
//! // React to forced logout (session expiry, account deactivation).
//! let mut events = client.session_events();
//! tokio::spawn(async move {
//!     if let Ok(event) = events.recv().await {
//!         eprintln!("signed out: {}", event.reason.description());
//!     }
//! });
//!
//! client.auth().login("ana@example.edu", "secret").await?;
//!
//! let groups = client.groups().list().await?;
//! for group in groups.groups {
//!     println!("{} ({})", group.name, group.subject);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **Auth**: login, logout
//! - **Profiles**: own profile, lookup, update
//! - **Groups**: CRUD, membership
//! - **Sessions**: study session CRUD, RSVP
//! - **Forums**: threads and replies
//! - **Messages**: conversations and direct messages
//! - **Achievements**: catalog and earned
//! - **Notifications**: list, mark read
//! - **Health**: server health checks

pub mod api;
pub mod client;
pub mod error;
pub mod types;

pub use client::{ClientBuilder, CohortClient};
pub use error::{Error, Result};
pub use types::*;

// Re-export query types commonly used with list methods
pub use api::{ListStudySessionsQuery, ListThreadsQuery};

// Re-export the auth surface embedders interact with directly
pub use cohort_auth::{
    Credential, InvalidationReason, RefreshCoordinator, SessionInvalidated, TokenStore,
};

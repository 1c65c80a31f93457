//! API endpoint implementations.

mod achievements;
mod auth;
mod forums;
mod groups;
mod health;
mod messages;
mod notifications;
mod profiles;
mod sessions;

pub use achievements::AchievementsApi;
pub use auth::AuthApi;
pub use forums::{ForumsApi, ListThreadsQuery};
pub use groups::GroupsApi;
pub use health::HealthApi;
pub use messages::MessagesApi;
pub use notifications::NotificationsApi;
pub use profiles::ProfilesApi;
pub use sessions::{ListStudySessionsQuery, SessionsApi};

//! Request and response types for the Cohort API.
//!
//! These types mirror the server's API contract.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Login request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response: the credential pair plus the signed-in profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub expires_in: u64,
    pub profile: Profile,
}

// ─────────────────────────────────────────────────────────────────────────────
// Profiles
// ─────────────────────────────────────────────────────────────────────────────

/// A student profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    /// Degree program, if the student filled it in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Creation time (ISO 8601).
    pub created_at: String,
}

/// Request to update the signed-in profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub career: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Study groups
// ─────────────────────────────────────────────────────────────────────────────

/// A study group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyGroup {
    pub id: String,
    pub name: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub owner_id: String,
    pub member_count: usize,
    #[serde(default)]
    pub is_private: bool,
    pub created_at: String,
}

/// Request to create a study group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

/// Request to update a study group.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateGroupRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
}

/// A group member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub profile_id: String,
    pub full_name: String,
    /// "owner" or "member".
    pub role: String,
    pub joined_at: String,
}

/// Response containing a list of groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListGroupsResponse {
    pub groups: Vec<StudyGroup>,
}

/// Response containing a group's members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMembersResponse {
    pub members: Vec<GroupMember>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Study sessions
// ─────────────────────────────────────────────────────────────────────────────

/// A scheduled study session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    pub id: String,
    pub group_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Start time (ISO 8601).
    pub starts_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
    pub attendee_count: usize,
    pub created_by: String,
}

/// Request to schedule a study session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStudySessionRequest {
    pub group_id: String,
    pub title: String,
    pub starts_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
}

/// Request to update a study session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStudySessionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<String>,
}

/// Response containing a list of study sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListStudySessionsResponse {
    pub sessions: Vec<StudySession>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Forums
// ─────────────────────────────────────────────────────────────────────────────

/// A forum thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumThread {
    pub id: String,
    /// Group the thread belongs to; absent for campus-wide threads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub title: String,
    pub body: String,
    pub author_id: String,
    pub reply_count: usize,
    pub created_at: String,
}

/// A reply within a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForumReply {
    pub id: String,
    pub thread_id: String,
    pub body: String,
    pub author_id: String,
    pub created_at: String,
}

/// Request to open a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateThreadRequest {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

/// Request to reply to a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReplyRequest {
    pub body: String,
}

/// Response containing a list of threads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListThreadsResponse {
    pub threads: Vec<ForumThread>,
}

/// Response containing a thread's replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRepliesResponse {
    pub replies: Vec<ForumReply>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Direct messages
// ─────────────────────────────────────────────────────────────────────────────

/// A conversation between two or more students.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub participant_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    pub updated_at: String,
}

/// A direct message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectMessage {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub body: String,
    pub sent_at: String,
    #[serde(default)]
    pub read: bool,
}

/// Request to send a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub body: String,
}

/// Response containing the caller's conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListConversationsResponse {
    pub conversations: Vec<Conversation>,
}

/// Response containing a conversation's messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListMessagesResponse {
    pub messages: Vec<DirectMessage>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Achievements
// ─────────────────────────────────────────────────────────────────────────────

/// An achievement in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    pub id: String,
    pub code: String,
    pub title: String,
    pub description: String,
    pub points: u32,
}

/// An achievement earned by a student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarnedAchievement {
    pub achievement: Achievement,
    pub earned_at: String,
}

/// Response containing the achievement catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListAchievementsResponse {
    pub achievements: Vec<Achievement>,
}

/// Response containing a student's earned achievements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEarnedResponse {
    pub earned: Vec<EarnedAchievement>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Notifications
// ─────────────────────────────────────────────────────────────────────────────

/// A notification for the signed-in student.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    /// Notification kind, e.g. "session_reminder" or "group_invite".
    pub kind: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: String,
}

/// Response containing the caller's notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListNotificationsResponse {
    pub notifications: Vec<Notification>,
}

/// Response to a mark-read operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadResponse {
    /// Number of items marked as read.
    pub updated: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Health
// ─────────────────────────────────────────────────────────────────────────────

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// The authenticated user this engine instance syncs for.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub display_name: String,
    pub token: String,
}

impl Session {
    pub fn new(user_id: Uuid, display_name: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            token: token.into(),
        }
    }
}

/// Conversation metadata as the chat list sees it. `updated_at` tracks the
/// most recent activity; `last_updated_by` is whoever caused it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub id: Uuid,
    pub name: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub updated_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_by: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_group_id: Option<Uuid>,
}

impl ChatSummary {
    /// Sort key for chat lists: most recent activity, falling back to
    /// creation time for chats that never saw a message.
    pub fn activity_at(&self) -> OffsetDateTime {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// One "last seen" watermark row, as fetched from or written to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastOpened {
    pub chat_id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// A study group with enough shape to compute fan-out recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyGroup {
    pub id: Uuid,
    pub name: String,
    pub member_ids: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<Uuid>,
}

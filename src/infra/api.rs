use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::error::SyncError;
use crate::domain::notification::{Notification, NotificationKind};
use crate::domain::presence::{LastOpened, Session, StudyGroup};
use crate::domain::request::{MatchRequest, MatchTarget, RequestStatus, SwipeDirection};

/// A swipe decision as submitted, before the store has assigned it an id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSwipe {
    pub requester_id: Uuid,
    pub target: MatchTarget,
    pub direction: SwipeDirection,
    pub message: Option<String>,
}

/// One per-recipient notification to create. Fan-out calls this once per
/// recipient; each call stands alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_id: Uuid,
    pub message: String,
    pub kind: NotificationKind,
    pub chat_id: Option<Uuid>,
    pub study_group_id: Option<Uuid>,
    pub other_user_id: Option<Uuid>,
}

/// The remote backend as the engine sees it. Storage, auth issuance, and
/// routing all live behind this trait; tests swap in an in-memory fake.
#[async_trait]
pub trait StudyApi: Send + Sync {
    /// Record a swipe durably. Returns the id the store assigned.
    async fn submit_swipe(&self, session: &Session, swipe: &NewSwipe) -> Result<Uuid, SyncError>;

    /// Raw, non-deduplicated requests involving a user.
    async fn swipe_requests(
        &self,
        session: &Session,
        user_id: Uuid,
    ) -> Result<Vec<MatchRequest>, SyncError>;

    async fn set_request_status(
        &self,
        session: &Session,
        request_id: Uuid,
        status: RequestStatus,
    ) -> Result<(), SyncError>;

    async fn send_notification(
        &self,
        session: &Session,
        notification: &NewNotification,
    ) -> Result<(), SyncError>;

    async fn notifications(&self, session: &Session) -> Result<Vec<Notification>, SyncError>;

    async fn delete_notification(&self, session: &Session, id: Uuid) -> Result<(), SyncError>;

    async fn delete_all_notifications(&self, session: &Session) -> Result<(), SyncError>;

    /// Bulk watermark fetch for every chat the user participates in.
    async fn last_opened(
        &self,
        session: &Session,
        user_id: Uuid,
    ) -> Result<Vec<LastOpened>, SyncError>;

    /// Watermark heartbeat write. The timestamp travels in the payload so
    /// the merge step can apply last-writer-wins regardless of arrival order.
    async fn update_last_opened(
        &self,
        session: &Session,
        mark: &LastOpened,
    ) -> Result<(), SyncError>;

    /// Does a direct chat between the two users already exist?
    async fn direct_chat_between(
        &self,
        session: &Session,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Uuid>, SyncError>;

    async fn study_group(&self, session: &Session, group_id: Uuid)
        -> Result<StudyGroup, SyncError>;

    /// Resolve a chat to its owning study group, if any.
    async fn study_group_for_chat(
        &self,
        session: &Session,
        chat_id: Uuid,
    ) -> Result<Option<StudyGroup>, SyncError>;
}

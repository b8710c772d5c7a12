#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use tandem::domain::error::SyncError;
use tandem::domain::notification::{Notification, NotificationKind};
use tandem::domain::presence::{ChatSummary, LastOpened, Session, StudyGroup};
use tandem::domain::request::{MatchRequest, MatchTarget, RequestStatus, SwipeDirection};
use tandem::infra::api::{NewNotification, NewSwipe, StudyApi};

// ---------------------------------------------------------------------------
// Fake backend — in-memory StudyApi with per-endpoint failure injection
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<BackendState>,
}

#[derive(Default)]
struct BackendState {
    requests: Vec<MatchRequest>,
    notifications: Vec<Notification>,
    last_opened: HashMap<(Uuid, Uuid), OffsetDateTime>,
    groups: HashMap<Uuid, StudyGroup>,
    direct_chats: HashMap<(Uuid, Uuid), Uuid>,

    fail_submit: bool,
    fail_swipe_requests: bool,
    fail_notifications: bool,
    fail_delete: bool,
    fail_delete_all: bool,
    fail_last_opened: bool,
    fail_heartbeat: bool,
    fail_send_for: Vec<Uuid>,

    /// Extra latency injected into `notifications`, driven by the tokio
    /// test clock.
    notifications_delay: Option<Duration>,

    send_attempts: Vec<NewNotification>,
    heartbeat_writes: Vec<LastOpened>,
    notification_fetches: Vec<Uuid>,
}

fn chat_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // ---- seeding -----------------------------------------------------

    pub fn seed_group(&self, name: &str, member_ids: Vec<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().groups.insert(
            id,
            StudyGroup {
                id,
                name: name.to_string(),
                member_ids,
                chat_id: None,
            },
        );
        id
    }

    pub fn seed_group_with_chat(&self, name: &str, member_ids: Vec<Uuid>, chat_id: Uuid) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().groups.insert(
            id,
            StudyGroup {
                id,
                name: name.to_string(),
                member_ids,
                chat_id: Some(chat_id),
            },
        );
        id
    }

    pub fn seed_request(
        &self,
        requester_id: Uuid,
        target: MatchTarget,
        direction: SwipeDirection,
        status: RequestStatus,
    ) -> Uuid {
        let id = Uuid::new_v4();
        self.state.lock().unwrap().requests.push(MatchRequest {
            id,
            requester_id,
            target,
            direction,
            status,
            message: None,
            created_at: OffsetDateTime::now_utc(),
        });
        id
    }

    pub fn seed_notification(&self, recipient_id: Uuid, kind: NotificationKind) -> Notification {
        let notification = Notification {
            id: Uuid::new_v4(),
            recipient_id,
            message: "seeded".to_string(),
            kind,
            read: false,
            created_at: OffsetDateTime::now_utc(),
            chat_id: None,
            study_group_id: None,
            other_user_id: None,
        };
        self.state
            .lock()
            .unwrap()
            .notifications
            .push(notification.clone());
        notification
    }

    pub fn seed_notification_full(&self, notification: Notification) {
        self.state.lock().unwrap().notifications.push(notification);
    }

    pub fn seed_direct_chat(&self, user_a: Uuid, user_b: Uuid) -> Uuid {
        let chat_id = Uuid::new_v4();
        self.state
            .lock()
            .unwrap()
            .direct_chats
            .insert(chat_pair(user_a, user_b), chat_id);
        chat_id
    }

    pub fn seed_last_opened(&self, chat_id: Uuid, user_id: Uuid, timestamp: OffsetDateTime) {
        self.state
            .lock()
            .unwrap()
            .last_opened
            .insert((chat_id, user_id), timestamp);
    }

    // ---- failure injection -------------------------------------------

    pub fn fail_submit(&self, fail: bool) {
        self.state.lock().unwrap().fail_submit = fail;
    }

    pub fn fail_swipe_requests(&self, fail: bool) {
        self.state.lock().unwrap().fail_swipe_requests = fail;
    }

    pub fn fail_notifications(&self, fail: bool) {
        self.state.lock().unwrap().fail_notifications = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.state.lock().unwrap().fail_delete = fail;
    }

    pub fn fail_delete_all(&self, fail: bool) {
        self.state.lock().unwrap().fail_delete_all = fail;
    }

    pub fn fail_last_opened(&self, fail: bool) {
        self.state.lock().unwrap().fail_last_opened = fail;
    }

    pub fn fail_heartbeat(&self, fail: bool) {
        self.state.lock().unwrap().fail_heartbeat = fail;
    }

    pub fn fail_send_for(&self, recipient_id: Uuid) {
        self.state.lock().unwrap().fail_send_for.push(recipient_id);
    }

    pub fn delay_notifications(&self, delay: Duration) {
        self.state.lock().unwrap().notifications_delay = Some(delay);
    }

    // ---- inspection --------------------------------------------------

    pub fn requests(&self) -> Vec<MatchRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn stored_notifications(&self, recipient_id: Uuid) -> Vec<Notification> {
        self.state
            .lock()
            .unwrap()
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .cloned()
            .collect()
    }

    pub fn send_attempts(&self) -> Vec<NewNotification> {
        self.state.lock().unwrap().send_attempts.clone()
    }

    pub fn heartbeat_writes(&self, chat_id: Uuid) -> Vec<LastOpened> {
        self.state
            .lock()
            .unwrap()
            .heartbeat_writes
            .iter()
            .filter(|mark| mark.chat_id == chat_id)
            .cloned()
            .collect()
    }

    pub fn notification_fetches(&self) -> Vec<Uuid> {
        self.state.lock().unwrap().notification_fetches.clone()
    }

    pub fn stored_last_opened(&self, chat_id: Uuid, user_id: Uuid) -> Option<OffsetDateTime> {
        self.state
            .lock()
            .unwrap()
            .last_opened
            .get(&(chat_id, user_id))
            .copied()
    }
}

#[async_trait]
impl StudyApi for FakeBackend {
    async fn submit_swipe(&self, _session: &Session, swipe: &NewSwipe) -> Result<Uuid, SyncError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_submit {
            return Err(SyncError::network("submit down"));
        }
        let id = Uuid::new_v4();
        state.requests.push(MatchRequest {
            id,
            requester_id: swipe.requester_id,
            target: swipe.target,
            direction: swipe.direction,
            status: RequestStatus::Pending,
            message: swipe.message.clone(),
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(id)
    }

    async fn swipe_requests(
        &self,
        _session: &Session,
        user_id: Uuid,
    ) -> Result<Vec<MatchRequest>, SyncError> {
        let state = self.state.lock().unwrap();
        if state.fail_swipe_requests {
            return Err(SyncError::network("swipe list down"));
        }
        let involved = |request: &MatchRequest| {
            request.requester_id == user_id
                || request.target == MatchTarget::User(user_id)
                || match request.target {
                    MatchTarget::Group(group_id) => state
                        .groups
                        .get(&group_id)
                        .is_some_and(|group| group.member_ids.contains(&user_id)),
                    MatchTarget::User(_) => false,
                }
        };
        Ok(state.requests.iter().filter(|r| involved(r)).cloned().collect())
    }

    async fn set_request_status(
        &self,
        _session: &Session,
        request_id: Uuid,
        status: RequestStatus,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        let request = state
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or(SyncError::NotFound)?;
        request.status = status;
        Ok(())
    }

    async fn send_notification(
        &self,
        _session: &Session,
        notification: &NewNotification,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        state.send_attempts.push(notification.clone());
        if state.fail_send_for.contains(&notification.recipient_id) {
            return Err(SyncError::network("recipient unreachable"));
        }
        state.notifications.push(Notification {
            id: Uuid::new_v4(),
            recipient_id: notification.recipient_id,
            message: notification.message.clone(),
            kind: notification.kind,
            read: false,
            created_at: OffsetDateTime::now_utc(),
            chat_id: notification.chat_id,
            study_group_id: notification.study_group_id,
            other_user_id: notification.other_user_id,
        });
        Ok(())
    }

    async fn notifications(&self, session: &Session) -> Result<Vec<Notification>, SyncError> {
        // Snapshot before the injected delay: a delayed response carries the
        // server state from when the request arrived, like a real in-flight
        // fetch would.
        let (snapshot, delay) = {
            let mut state = self.state.lock().unwrap();
            state.notification_fetches.push(session.user_id);
            if state.fail_notifications {
                return Err(SyncError::network("notifications down"));
            }
            let snapshot: Vec<Notification> = state
                .notifications
                .iter()
                .filter(|n| n.recipient_id == session.user_id)
                .cloned()
                .collect();
            (snapshot, state.notifications_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(snapshot)
    }

    async fn delete_notification(&self, _session: &Session, id: Uuid) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete {
            return Err(SyncError::network("delete down"));
        }
        let before = state.notifications.len();
        state.notifications.retain(|n| n.id != id);
        if state.notifications.len() == before {
            return Err(SyncError::NotFound);
        }
        Ok(())
    }

    async fn delete_all_notifications(&self, session: &Session) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_delete_all {
            return Err(SyncError::network("delete-all down"));
        }
        state
            .notifications
            .retain(|n| n.recipient_id != session.user_id);
        Ok(())
    }

    async fn last_opened(
        &self,
        _session: &Session,
        user_id: Uuid,
    ) -> Result<Vec<LastOpened>, SyncError> {
        let state = self.state.lock().unwrap();
        if state.fail_last_opened {
            return Err(SyncError::network("last-opened down"));
        }
        Ok(state
            .last_opened
            .iter()
            .filter(|((_, mark_user), _)| *mark_user == user_id)
            .map(|((chat_id, mark_user), timestamp)| LastOpened {
                chat_id: *chat_id,
                user_id: *mark_user,
                timestamp: *timestamp,
            })
            .collect())
    }

    async fn update_last_opened(
        &self,
        _session: &Session,
        mark: &LastOpened,
    ) -> Result<(), SyncError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_heartbeat {
            return Err(SyncError::network("heartbeat down"));
        }
        state.heartbeat_writes.push(mark.clone());
        let slot = state
            .last_opened
            .entry((mark.chat_id, mark.user_id))
            .or_insert(mark.timestamp);
        // Store-side last-writer-wins by payload timestamp.
        if mark.timestamp > *slot {
            *slot = mark.timestamp;
        }
        Ok(())
    }

    async fn direct_chat_between(
        &self,
        _session: &Session,
        user_a: Uuid,
        user_b: Uuid,
    ) -> Result<Option<Uuid>, SyncError> {
        let state = self.state.lock().unwrap();
        Ok(state.direct_chats.get(&chat_pair(user_a, user_b)).copied())
    }

    async fn study_group(
        &self,
        _session: &Session,
        group_id: Uuid,
    ) -> Result<StudyGroup, SyncError> {
        let state = self.state.lock().unwrap();
        state.groups.get(&group_id).cloned().ok_or(SyncError::NotFound)
    }

    async fn study_group_for_chat(
        &self,
        _session: &Session,
        chat_id: Uuid,
    ) -> Result<Option<StudyGroup>, SyncError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .groups
            .values()
            .find(|group| group.chat_id == Some(chat_id))
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn session(display_name: &str) -> Session {
    Session::new(Uuid::new_v4(), display_name, "test-token")
}

pub fn ts(unix_seconds: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(unix_seconds).expect("valid unix timestamp")
}

pub fn chat(
    updated_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
    last_updated_by: Option<Uuid>,
) -> ChatSummary {
    ChatSummary {
        id: Uuid::new_v4(),
        name: None,
        updated_at,
        created_at,
        last_updated_by,
        study_group_id: None,
    }
}

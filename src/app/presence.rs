use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::error::SyncError;
use crate::domain::presence::{ChatSummary, LastOpened, Session};
use crate::infra::api::StudyApi;

/// Per-conversation "last seen" watermarks and the unread rule built on them.
///
/// Opening a chat sets the local watermark immediately and starts a
/// heartbeat that writes it back on a fixed cadence while the chat stays
/// open. Heartbeats live in a registry keyed by chat id with
/// cancel-before-replace semantics; a leaked heartbeat loop is a bug, not
/// an inefficiency.
#[derive(Clone)]
pub struct PresenceTracker {
    api: Arc<dyn StudyApi>,
    watermarks: Arc<DashMap<(Uuid, Uuid), OffsetDateTime>>,
    /// user -> the chat they currently have open
    active: Arc<DashMap<Uuid, Uuid>>,
    /// chat -> its running heartbeat task, tagged with a generation so a
    /// stale handle cannot cancel a newer heartbeat for the same chat
    heartbeats: Arc<DashMap<Uuid, (u64, JoinHandle<()>)>>,
    next_generation: Arc<AtomicU64>,
    heartbeat_interval: Duration,
}

impl PresenceTracker {
    pub fn new(api: Arc<dyn StudyApi>, heartbeat_interval: Duration) -> Self {
        Self {
            api,
            watermarks: Arc::new(DashMap::new()),
            active: Arc::new(DashMap::new()),
            heartbeats: Arc::new(DashMap::new()),
            next_generation: Arc::new(AtomicU64::new(0)),
            heartbeat_interval,
        }
    }

    /// Mark the chat open: optimistic local watermark now, previous chat's
    /// heartbeat cancelled, new heartbeat started. The returned handle stops
    /// the heartbeat on `close()` or drop.
    pub fn open_chat(&self, session: &Session, chat_id: Uuid) -> OpenChatHandle {
        let user_id = session.user_id;
        self.merge_watermark(chat_id, user_id, OffsetDateTime::now_utc());

        if let Some(previous) = self.active.insert(user_id, chat_id) {
            if previous != chat_id {
                if let Some((_, (_, task))) = self.heartbeats.remove(&previous) {
                    task.abort();
                }
            }
        }

        let api = self.api.clone();
        let session = session.clone();
        let watermarks = self.watermarks.clone();
        let interval = self.heartbeat_interval;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                // Timestamp travels in the payload so the store and the
                // local merge apply last-writer-wins, not arrival order.
                let mark = LastOpened {
                    chat_id,
                    user_id,
                    timestamp: OffsetDateTime::now_utc(),
                };
                match api.update_last_opened(&session, &mark).await {
                    Ok(()) => {
                        merge_into(&watermarks, chat_id, user_id, mark.timestamp);
                    }
                    Err(err) => {
                        warn!(chat_id = %chat_id, error = %err, "watermark heartbeat failed");
                    }
                }
            }
        });

        // Rapid re-open of the same chat: the stale task must die first.
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        if let Some((_, replaced)) = self.heartbeats.insert(chat_id, (generation, task)) {
            replaced.abort();
        }
        debug!(chat_id = %chat_id, user_id = %user_id, "chat opened, heartbeat running");

        OpenChatHandle {
            tracker: self.clone(),
            chat_id,
            user_id,
            generation,
            closed: false,
        }
    }

    /// Stop one heartbeat generation and clear the open-chat mark. A handle
    /// outliving a newer `open_chat` of the same chat is a no-op here.
    fn close_generation(&self, chat_id: Uuid, user_id: Uuid, generation: u64) {
        let removed = self
            .heartbeats
            .remove_if(&chat_id, |_, (owner, _)| *owner == generation);
        if let Some((_, (_, task))) = removed {
            task.abort();
            self.active.remove_if(&user_id, |_, open| *open == chat_id);
            debug!(chat_id = %chat_id, user_id = %user_id, "chat closed, heartbeat stopped");
        }
    }

    /// The unread rule: newer activity than the watermark, not currently
    /// open, and not caused by the querying user themself.
    pub fn is_unread(&self, chat: &ChatSummary, user_id: Uuid) -> bool {
        if self
            .active
            .get(&user_id)
            .is_some_and(|open| *open == chat.id)
        {
            return false;
        }
        if chat.last_updated_by == Some(user_id) {
            return false;
        }
        let Some(updated_at) = chat.updated_at else {
            return false;
        };
        let last_opened = self
            .watermarks
            .get(&(chat.id, user_id))
            .map(|entry| *entry)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);
        updated_at > last_opened
    }

    pub fn last_opened_at(&self, chat_id: Uuid, user_id: Uuid) -> Option<OffsetDateTime> {
        self.watermarks.get(&(chat_id, user_id)).map(|entry| *entry)
    }

    /// Bulk-reconcile watermarks from the store (mount, reconnect, poll).
    /// Merge is last-writer-wins by timestamp: a poll never clobbers a
    /// newer local optimistic value.
    pub async fn refresh_all(&self, session: &Session) -> Result<(), SyncError> {
        let marks = self.api.last_opened(session, session.user_id).await?;
        for mark in marks {
            self.merge_watermark(mark.chat_id, mark.user_id, mark.timestamp);
        }
        Ok(())
    }

    fn merge_watermark(&self, chat_id: Uuid, user_id: Uuid, timestamp: OffsetDateTime) {
        merge_into(&self.watermarks, chat_id, user_id, timestamp);
    }
}

fn merge_into(
    watermarks: &DashMap<(Uuid, Uuid), OffsetDateTime>,
    chat_id: Uuid,
    user_id: Uuid,
    timestamp: OffsetDateTime,
) {
    watermarks
        .entry((chat_id, user_id))
        .and_modify(|current| {
            if timestamp > *current {
                *current = timestamp;
            }
        })
        .or_insert(timestamp);
}

/// Most recent activity first. Unread is a decoration on top of this order,
/// never a reordering key.
pub fn sort_by_recent_activity(chats: &mut [ChatSummary]) {
    chats.sort_by_key(|chat| Reverse(chat.activity_at()));
}

/// Cancellation handle for an open conversation's heartbeat.
pub struct OpenChatHandle {
    tracker: PresenceTracker,
    chat_id: Uuid,
    user_id: Uuid,
    generation: u64,
    closed: bool,
}

impl OpenChatHandle {
    pub fn chat_id(&self) -> Uuid {
        self.chat_id
    }

    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.closed {
            self.closed = true;
            self.tracker
                .close_generation(self.chat_id, self.user_id, self.generation);
        }
    }
}

impl Drop for OpenChatHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

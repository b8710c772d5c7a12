use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::warn;
use uuid::Uuid;

use crate::domain::error::SyncError;
use crate::domain::notification::{Notification, NotificationKind, NotificationRoute};
use crate::domain::presence::Session;
use crate::infra::api::StudyApi;

/// Client-side cache of the session user's notifications.
///
/// Deletes apply locally before the remote round-trip and are not rolled
/// back on remote failure; the next successful refresh re-converges with
/// the server. A refresh that started before a local delete cannot
/// resurrect the deleted item (tombstones + mutation sequence).
#[derive(Clone)]
pub struct NotificationCenter {
    api: Arc<dyn StudyApi>,
    inner: Arc<Mutex<Inner>>,
    count: watch::Sender<Option<usize>>,
}

#[derive(Default)]
struct Inner {
    items: Vec<Notification>,
    /// Locally deleted ids an in-flight fetch must not re-add.
    tombstones: HashSet<Uuid>,
    /// Bumped on every local mutation; lets a fetch tell whether it raced one.
    mutation_seq: u64,
}

impl NotificationCenter {
    pub fn new(api: Arc<dyn StudyApi>) -> Self {
        let (count, _) = watch::channel(None);
        Self {
            api,
            inner: Arc::new(Mutex::new(Inner::default())),
            count,
        }
    }

    /// Observe the notification count. `None` means unknown: nothing fetched
    /// yet, or the last fetch failed.
    pub fn subscribe_count(&self) -> watch::Receiver<Option<usize>> {
        self.count.subscribe()
    }

    pub fn count(&self) -> Option<usize> {
        *self.count.borrow()
    }

    /// The cached list, as the UI should render it right now.
    pub fn list(&self) -> Vec<Notification> {
        self.inner.lock().expect("notification cache poisoned").items.clone()
    }

    /// Fetch the authoritative list. On failure the cached list stays
    /// visible and the published count drops to unknown, never to zero.
    pub async fn refresh(&self, session: &Session) -> Result<Vec<Notification>, SyncError> {
        let seq_at_start = self.inner.lock().expect("notification cache poisoned").mutation_seq;

        let fetched = match self.api.notifications(session).await {
            Ok(fetched) => fetched,
            Err(err) => {
                self.count.send_replace(None);
                return Err(err);
            }
        };

        let mut inner = self.inner.lock().expect("notification cache poisoned");
        let items: Vec<Notification> = if inner.mutation_seq == seq_at_start {
            // No local mutation raced this fetch; the server list is the
            // full truth again and the tombstones have served their purpose.
            inner.tombstones.clear();
            fetched
        } else {
            // A delete landed while this fetch was in flight; the response
            // predates it and must not resurrect the deleted items.
            fetched
                .into_iter()
                .filter(|n| !inner.tombstones.contains(&n.id))
                .collect()
        };
        inner.items = items.clone();
        drop(inner);

        self.count.send_replace(Some(items.len()));
        Ok(items)
    }

    /// Optimistic delete: local removal and count decrement first, then the
    /// remote delete. Remote failure is returned but the local removal
    /// stands (documented contract).
    pub async fn delete_one(&self, session: &Session, id: Uuid) -> Result<(), SyncError> {
        {
            let mut inner = self.inner.lock().expect("notification cache poisoned");
            inner.items.retain(|n| n.id != id);
            inner.tombstones.insert(id);
            inner.mutation_seq += 1;
            self.count.send_replace(Some(inner.items.len()));
        }
        self.api.delete_notification(session, id).await
    }

    /// Optimistic clear-all: count goes to zero immediately, independent of
    /// the remote round-trip.
    pub async fn delete_all(&self, session: &Session) -> Result<(), SyncError> {
        {
            let mut inner = self.inner.lock().expect("notification cache poisoned");
            let ids: Vec<Uuid> = inner.items.iter().map(|n| n.id).collect();
            inner.tombstones.extend(ids);
            inner.items.clear();
            inner.mutation_seq += 1;
            self.count.send_replace(Some(0));
        }
        self.api.delete_all_notifications(session).await
    }

    /// Selecting consumes the notification, then routes to the view it
    /// correlates with. The consume is best-effort: a failed remote delete
    /// must not block navigation.
    pub async fn select(
        &self,
        session: &Session,
        notification: &Notification,
    ) -> Result<NotificationRoute, SyncError> {
        if let Err(err) = self.delete_one(session, notification.id).await {
            warn!(notification_id = %notification.id, error = %err, "consume-on-select failed remotely");
        }

        match notification.kind {
            NotificationKind::Message => Ok(notification
                .chat_id
                .map(NotificationRoute::OpenChat)
                .unwrap_or(NotificationRoute::Stay)),
            NotificationKind::Match => Ok(NotificationRoute::OpenReceivedRequests),
            NotificationKind::StudyGroup => {
                if let Some(group_id) = notification.study_group_id {
                    return Ok(NotificationRoute::OpenStudyGroup(group_id));
                }
                // Older rows correlate by chat instead of group; resolve the
                // chat to its owning group before falling back to a person.
                if let Some(chat_id) = notification.chat_id {
                    if let Some(group) = self.api.study_group_for_chat(session, chat_id).await? {
                        return Ok(NotificationRoute::OpenStudyGroup(group.id));
                    }
                }
                let Some(other) = notification.other_user_id else {
                    return Ok(NotificationRoute::Stay);
                };
                // Group notification about a person: open the direct chat
                // only if one already exists.
                match self
                    .api
                    .direct_chat_between(session, session.user_id, other)
                    .await?
                {
                    Some(chat_id) => Ok(NotificationRoute::OpenChat(chat_id)),
                    None => Ok(NotificationRoute::Stay),
                }
            }
        }
    }
}

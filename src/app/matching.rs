use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::app::dedup::dedup_pending;
use crate::domain::error::SyncError;
use crate::domain::notification::NotificationKind;
use crate::domain::presence::Session;
use crate::domain::request::{MatchRequest, MatchTarget, RequestStatus, SwipeDirection};
use crate::infra::api::{NewNotification, NewSwipe, StudyApi};

/// Owns the match-request state machine: swipe submission, per-recipient
/// fan-out, accept/deny, and the deduplicated pending feed.
#[derive(Clone)]
pub struct MatchEngine {
    api: Arc<dyn StudyApi>,
    pending_count: watch::Sender<Option<usize>>,
}

impl MatchEngine {
    pub fn new(api: Arc<dyn StudyApi>) -> Self {
        let (pending_count, _) = watch::channel(None);
        Self { api, pending_count }
    }

    /// Observe the pending-request count. `None` means unknown (the last
    /// refresh failed), never a stale number presented as current.
    pub fn subscribe_pending_count(&self) -> watch::Receiver<Option<usize>> {
        self.pending_count.subscribe()
    }

    /// Record a swipe decision. On `Interested`, fan a `Match` notification
    /// out to every recipient after the request is durably stored.
    ///
    /// A submission error propagates so the caller keeps the same card
    /// actionable; fan-out errors do not — each recipient send stands alone.
    pub async fn submit(
        &self,
        session: &Session,
        target: MatchTarget,
        direction: SwipeDirection,
        message: Option<String>,
    ) -> Result<Uuid, SyncError> {
        let swipe = NewSwipe {
            requester_id: session.user_id,
            target,
            direction,
            message,
        };
        let request_id = self.api.submit_swipe(session, &swipe).await?;
        debug!(request_id = %request_id, requester = %session.user_id, "swipe recorded");

        if direction == SwipeDirection::Interested {
            self.fan_out(session, target).await;
        }
        Ok(request_id)
    }

    /// Accept or deny a pending request. Only the receiving side calls this;
    /// a request that is already resolved is `InvalidTransition`.
    pub async fn resolve(
        &self,
        session: &Session,
        request_id: Uuid,
        decision: RequestStatus,
    ) -> Result<(), SyncError> {
        if !decision.is_terminal() {
            return Err(SyncError::InvalidTransition);
        }

        let rows = self.api.swipe_requests(session, session.user_id).await?;
        let request = rows
            .iter()
            .find(|row| row.id == request_id)
            .ok_or(SyncError::NotFound)?;
        if request.status != RequestStatus::Pending {
            return Err(SyncError::InvalidTransition);
        }

        self.api
            .set_request_status(session, request_id, decision)
            .await?;
        debug!(request_id = %request_id, decision = ?decision, "request resolved");
        Ok(())
    }

    /// Deduplicated pending requests addressed to the session user, and the
    /// count feed update that goes with them.
    pub async fn pending_for(&self, session: &Session) -> Result<Vec<MatchRequest>, SyncError> {
        let rows = match self.api.swipe_requests(session, session.user_id).await {
            Ok(rows) => rows,
            Err(err) => {
                self.pending_count.send_replace(None);
                return Err(err);
            }
        };

        let incoming = rows
            .into_iter()
            .filter(|row| row.requester_id != session.user_id)
            .collect();
        let pending = dedup_pending(incoming);
        self.pending_count.send_replace(Some(pending.len()));
        Ok(pending)
    }

    /// Best-effort notification delivery, one independent attempt per
    /// recipient. The request is already recorded; nothing here rolls back.
    async fn fan_out(&self, session: &Session, target: MatchTarget) {
        let (recipients, group) = match target {
            MatchTarget::User(user_id) => (vec![user_id], None),
            MatchTarget::Group(group_id) => {
                match self.api.study_group(session, group_id).await {
                    Ok(group) => {
                        let members = group
                            .member_ids
                            .iter()
                            .copied()
                            .filter(|id| *id != session.user_id)
                            .collect();
                        (members, Some(group))
                    }
                    Err(err) => {
                        warn!(group_id = %group_id, error = %err, "cannot resolve group for fan-out");
                        return;
                    }
                }
            }
        };

        let message = match &group {
            Some(group) => format!(
                "{} is interested in joining {}",
                session.display_name, group.name
            ),
            None => format!(
                "{} is interested in studying with you",
                session.display_name
            ),
        };

        for recipient in recipients {
            let notification = NewNotification {
                recipient_id: recipient,
                message: message.clone(),
                kind: NotificationKind::Match,
                chat_id: None,
                study_group_id: group.as_ref().map(|g| g.id),
                other_user_id: Some(session.user_id),
            };
            if let Err(err) = self.api.send_notification(session, &notification).await {
                warn!(recipient = %recipient, error = %err, "fan-out notification failed");
            }
        }
    }
}

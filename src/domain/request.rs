use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::error::SyncError;

/// What a swipe is aimed at. Exactly one arm, always — the nullable
/// user-id/group-id pair only exists at the wire layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MatchTarget {
    User(Uuid),
    Group(Uuid),
}

impl MatchTarget {
    /// Split into the `(target_user_id, target_group_id)` wire pair.
    pub fn as_wire(&self) -> (Option<Uuid>, Option<Uuid>) {
        match self {
            Self::User(id) => (Some(*id), None),
            Self::Group(id) => (None, Some(*id)),
        }
    }

    /// Rebuild from the wire pair, rejecting both-set and neither-set rows.
    pub fn from_wire(user_id: Option<Uuid>, group_id: Option<Uuid>) -> Result<Self, SyncError> {
        match (user_id, group_id) {
            (Some(id), None) => Ok(Self::User(id)),
            (None, Some(id)) => Ok(Self::Group(id)),
            _ => Err(SyncError::InvalidTarget),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Interested,
    Pass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Denied,
}

impl RequestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Accepted | Self::Denied)
    }
}

/// A durable swipe decision. Created by the requester, mutated only by the
/// receiving side (accept/deny), never by the requester after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub target: MatchTarget,
    pub direction: SwipeDirection,
    pub status: RequestStatus,
    pub message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl MatchRequest {
    /// Identity used to collapse retried/raced rows into one visible intent.
    pub fn dedup_key(&self) -> (Uuid, MatchTarget) {
        (self.requester_id, self.target)
    }
}

use std::collections::HashSet;

use uuid::Uuid;

use crate::domain::request::{MatchRequest, MatchTarget, RequestStatus, SwipeDirection};

/// Collapse raw request rows into distinct visible intents.
///
/// The same requester can produce multiple rows for the same target
/// (retries, races with concurrent polling). Only `Interested` + `Pending`
/// rows are visible; per (requester, target) the first-seen row wins and
/// insertion order is preserved. The output length is the authoritative
/// pending-request count.
pub fn dedup_pending(rows: Vec<MatchRequest>) -> Vec<MatchRequest> {
    let mut seen: HashSet<(Uuid, MatchTarget)> = HashSet::new();
    rows.into_iter()
        .filter(|row| {
            row.direction == SwipeDirection::Interested && row.status == RequestStatus::Pending
        })
        .filter(|row| seen.insert(row.dedup_key()))
        .collect()
}

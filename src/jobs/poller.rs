use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::app::matching::MatchEngine;
use crate::app::notifications::NotificationCenter;
use crate::app::presence::PresenceTracker;
use crate::domain::presence::Session;

/// Periodic refresh loops that catch server-side changes made by other
/// actors (the other side of a match, a co-member of a group).
///
/// Polling is additive to optimistic local updates: the services it drives
/// merge rather than overwrite. Poll failures are logged and swallowed so
/// last-known-good state stays visible until the next tick.
#[derive(Clone)]
pub struct Poller {
    matching: MatchEngine,
    notifications: NotificationCenter,
    presence: PresenceTracker,
    poll_interval: Duration,
    presence_refresh_interval: Duration,
    handles: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl Poller {
    pub fn new(
        matching: MatchEngine,
        notifications: NotificationCenter,
        presence: PresenceTracker,
        poll_interval: Duration,
        presence_refresh_interval: Duration,
    ) -> Self {
        Self {
            matching,
            notifications,
            presence,
            poll_interval,
            presence_refresh_interval,
            handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Start both loops for a session. Any loops from a previous session are
    /// cancelled first; a poller never outlives a user-id change.
    pub fn start(&self, session: &Session) {
        self.stop();
        info!(user_id = %session.user_id, "polling started");

        let matching = self.matching.clone();
        let notifications = self.notifications.clone();
        let counts_session = session.clone();
        let poll_interval = self.poll_interval;
        let counts = tokio::spawn(async move {
            loop {
                if let Err(err) = notifications.refresh(&counts_session).await {
                    warn!(error = %err, "notification poll failed");
                }
                if let Err(err) = matching.pending_for(&counts_session).await {
                    warn!(error = %err, "pending-request poll failed");
                }
                tokio::time::sleep(poll_interval).await;
            }
        });

        let presence = self.presence.clone();
        let presence_session = session.clone();
        let presence_interval = self.presence_refresh_interval;
        let watermarks = tokio::spawn(async move {
            loop {
                if let Err(err) = presence.refresh_all(&presence_session).await {
                    warn!(error = %err, "watermark poll failed");
                }
                tokio::time::sleep(presence_interval).await;
            }
        });

        let mut handles = self.handles.lock().expect("poller handles poisoned");
        handles.push(counts);
        handles.push(watermarks);
    }

    /// Cancel every running loop. Idempotent.
    pub fn stop(&self) {
        let mut handles = self.handles.lock().expect("poller handles poisoned");
        if handles.is_empty() {
            return;
        }
        for handle in handles.drain(..) {
            handle.abort();
        }
        info!("polling stopped");
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        // Only the last clone tears the loops down.
        if Arc::strong_count(&self.handles) == 1 {
            self.stop();
        }
    }
}

pub mod app;
pub mod config;
pub mod domain;
pub mod infra;
pub mod jobs;

use std::sync::Arc;
use std::time::Duration;

use crate::app::matching::MatchEngine;
use crate::app::notifications::NotificationCenter;
use crate::app::presence::PresenceTracker;
use crate::config::SyncConfig;
use crate::infra::api::StudyApi;
use crate::jobs::poller::Poller;

/// The wired-up engine: every service sharing one backend handle.
#[derive(Clone)]
pub struct SyncState {
    pub matching: MatchEngine,
    pub notifications: NotificationCenter,
    pub presence: PresenceTracker,
    pub poller: Poller,
}

impl SyncState {
    pub fn new(api: Arc<dyn StudyApi>, config: &SyncConfig) -> Self {
        let matching = MatchEngine::new(api.clone());
        let notifications = NotificationCenter::new(api.clone());
        let presence = PresenceTracker::new(
            api,
            Duration::from_secs(config.heartbeat_interval_seconds),
        );
        let poller = Poller::new(
            matching.clone(),
            notifications.clone(),
            presence.clone(),
            Duration::from_secs(config.poll_interval_seconds),
            Duration::from_secs(config.presence_refresh_seconds),
        );
        Self {
            matching,
            notifications,
            presence,
            poller,
        }
    }
}

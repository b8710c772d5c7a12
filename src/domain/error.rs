use std::fmt;

/// Error taxonomy for the sync engine.
///
/// Background pollers log and swallow these; user-initiated calls surface
/// them to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// No valid session, or the backend rejected the bearer token.
    Unauthenticated,
    /// Transport failure or a 5xx from the backend.
    Network(String),
    /// A request row names both or neither of user/group targets.
    InvalidTarget,
    /// Accept/deny attempted on a request that is not Pending.
    InvalidTransition,
    /// The referenced request, chat, group, or user no longer exists.
    NotFound,
}

impl SyncError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "not authenticated"),
            Self::Network(message) => write!(f, "network error: {}", message),
            Self::InvalidTarget => write!(f, "request must target exactly one of user or group"),
            Self::InvalidTransition => write!(f, "request is already resolved"),
            Self::NotFound => write!(f, "not found"),
        }
    }
}

impl std::error::Error for SyncError {}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

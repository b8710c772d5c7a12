pub mod dedup;
pub mod matching;
pub mod notifications;
pub mod presence;

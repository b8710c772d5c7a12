use anyhow::{anyhow, Result};
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct SyncConfig {
    pub api_base_url: String,
    pub session_user_id: Uuid,
    pub session_display_name: String,
    pub session_token: String,
    pub poll_interval_seconds: u64,
    pub heartbeat_interval_seconds: u64,
    pub presence_refresh_seconds: u64,
    pub http_timeout_seconds: u64,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        let api_base_url = env_or_err("API_BASE_URL")?;
        Url::parse(&api_base_url).map_err(|err| anyhow!("invalid API_BASE_URL: {}", err))?;

        Ok(Self {
            api_base_url,
            session_user_id: env_or_parse_with("SESSION_USER_ID", Uuid::parse_str)?,
            session_display_name: env_or_err("SESSION_DISPLAY_NAME")?,
            session_token: env_or_err("SESSION_TOKEN")?,
            poll_interval_seconds: env_or_parse("POLL_INTERVAL_SECONDS", "30")?,
            heartbeat_interval_seconds: env_or_parse("HEARTBEAT_INTERVAL_SECONDS", "3")?,
            presence_refresh_seconds: env_or_parse("PRESENCE_REFRESH_SECONDS", "30")?,
            http_timeout_seconds: env_or_parse("HTTP_TIMEOUT_SECONDS", "10")?,
        })
    }
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_or_parse_with<T, E>(key: &str, parse: impl Fn(&str) -> Result<T, E>) -> Result<T>
where
    E: std::fmt::Display,
{
    let value = env_or_err(key)?;
    parse(&value).map_err(|err| anyhow!("invalid {}: {}", key, err))
}

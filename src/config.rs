use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use url::Url;

pub const APP_NAME: &str = "Echo Sync";

/// Settings key under which title overrides are persisted as one JSON object.
pub const TITLE_OVERRIDES_KEY: &str = "conversation_title_overrides";

/// Title shown when neither an override nor a server title exists.
pub const DEFAULT_TITLE: &str = "New Conversation";

const DEFAULT_API_URL: &str = "http://localhost:3000/api/";
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub api_base_url: Url,
    pub api_token: Option<String>,
    /// Upper bound for one send round trip; a send never stays in flight longer.
    pub send_timeout: Duration,
    pub database_path: PathBuf,
}

impl SyncConfig {
    pub fn new(api_base_url: Url, database_path: PathBuf) -> Self {
        Self {
            api_base_url,
            api_token: None,
            send_timeout: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
            database_path,
        }
    }

    pub fn from_env() -> Result<Self> {
        let raw_url =
            std::env::var("ECHO_SYNC_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let api_base_url = parse_base_url(&raw_url)?;

        let api_token = std::env::var("ECHO_SYNC_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let send_timeout = match std::env::var("ECHO_SYNC_SEND_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(
                raw.parse()
                    .with_context(|| format!("Invalid ECHO_SYNC_SEND_TIMEOUT_SECS: {}", raw))?,
            ),
            Err(_) => Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
        };

        Ok(Self {
            api_base_url,
            api_token,
            send_timeout,
            database_path: Self::database_path()?,
        })
    }

    fn database_path() -> Result<PathBuf> {
        let data_dir = match std::env::var("XDG_DATA_HOME") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => {
                let home = std::env::var("HOME").context("Neither XDG_DATA_HOME nor HOME is set")?;
                PathBuf::from(home).join(".local/share")
            }
        };
        Ok(data_dir.join("echo-sync").join("echo-sync.db"))
    }
}

/// Relative endpoint joins drop the last path segment unless the base ends in '/'.
fn parse_base_url(raw: &str) -> Result<Url> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).with_context(|| format!("Invalid ECHO_SYNC_API_URL: {}", raw))
}

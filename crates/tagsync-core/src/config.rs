//! Run configuration.
//!
//! Values come from the environment, with a `.env` file in the working
//! directory loaded first. CLI flags are applied on top by the binary.

use std::path::PathBuf;
use std::time::Duration;

use tagsync_observability::redact_text;
use tagsync_stash::DEFAULT_PAGE_DELAY;

use crate::error::{Result, SyncError};
use crate::gateway::GatewayPolicy;

pub const DEFAULT_STATE_DIR: &str = ".tagsync";
const CACHE_FILE: &str = "tags.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub api_key: Option<String>,
}

impl Endpoint {
    pub fn describe(&self) -> String {
        let key = self
            .api_key
            .as_deref()
            .map(redact_text)
            .unwrap_or_else(|| "none".to_string());
        format!("{} (api key {key})", self.url)
    }
}

#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote taxonomy. Only required by commands that read it.
    pub stashbox: Option<Endpoint>,
    /// Local catalog. `fetch-tags` runs without it.
    pub stashapp: Option<Endpoint>,
    pub state_dir: PathBuf,
    pub gateway: GatewayPolicy,
    pub page_delay: Duration,
}

impl SyncConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let stashapp = non_empty("STASHAPP_URL").map(|url| Endpoint {
            url,
            api_key: non_empty("STASHAPP_API_KEY"),
        });
        let stashbox = non_empty("STASHBOX_ENDPOINT").map(|url| Endpoint {
            url,
            api_key: non_empty("STASHBOX_API_KEY"),
        });

        let state_dir = non_empty("TAGSYNC_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR));

        let mut gateway = GatewayPolicy::default();
        if let Some(raw) = non_empty("TAGSYNC_RETRY_ATTEMPTS") {
            gateway.max_attempts = parse_number("TAGSYNC_RETRY_ATTEMPTS", &raw)?;
        }
        if let Some(raw) = non_empty("TAGSYNC_RETRY_BACKOFF_SECS") {
            gateway.backoff = Duration::from_secs(parse_number("TAGSYNC_RETRY_BACKOFF_SECS", &raw)?);
        }
        let page_delay = match non_empty("TAGSYNC_PAGE_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_number("TAGSYNC_PAGE_DELAY_MS", &raw)?),
            None => DEFAULT_PAGE_DELAY,
        };

        Ok(Self {
            stashbox,
            stashapp,
            state_dir,
            gateway,
            page_delay,
        })
    }

    pub fn require_stashbox(&self) -> Result<&Endpoint> {
        self.stashbox.as_ref().ok_or_else(|| missing("STASHBOX_ENDPOINT"))
    }

    pub fn require_stashapp(&self) -> Result<&Endpoint> {
        self.stashapp.as_ref().ok_or_else(|| missing("STASHAPP_URL"))
    }

    pub fn cache_path(&self) -> PathBuf {
        self.state_dir.join(CACHE_FILE)
    }

    pub fn logs_dir(&self) -> PathBuf {
        tagsync_observability::canonical_logs_dir_from_root(&self.state_dir)
    }
}

fn missing(key: &str) -> SyncError {
    SyncError::Config(format!("`{key}` is not set (environment or .env)"))
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| SyncError::Config(format!("`{key}` must be a number, got `{raw}`")))
}

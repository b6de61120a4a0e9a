use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::types::Destination;

/// Default spool location when the config file does not name one.
const DEFAULT_SPOOL_PATH: &str = "./spool.db";

/// Default scheduler tick, in minutes.
const DEFAULT_TICK_INTERVAL_MINUTES: u64 = 1;

/// Default staleness interval for a channel, in minutes.
const DEFAULT_POLL_INTERVAL_MINUTES: u64 = 10;

/// Upper bound for any configured interval: one year, in minutes.
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Default maximum number of spool connections.
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 4;

/// A single announcement configuration: one YouTube channel forwarded to one
/// Discord webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// YouTube channel id whose feed is read.
    pub channel_id: String,

    /// Discord webhook URL new videos are posted to.
    pub webhook_url: String,

    /// Role to ping on announcements.
    #[serde(default)]
    pub role_id: Option<String>,

    /// Overrides the global staleness interval for this channel.
    #[serde(default)]
    pub poll_interval_minutes: Option<u64>,
}

impl ChannelConfig {
    pub fn destination(&self) -> Destination {
        Destination {
            webhook_url: self.webhook_url.clone(),
            role_id: self
                .role_id
                .clone()
                .filter(|role| !role.trim().is_empty()),
        }
    }
}

/// Global application configuration loaded from a JSON file, with
/// environment overrides.
///
/// Channels are keyed by a stable name. The key scopes the spool, so
/// renaming a key resets what has been announced for it.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Path of the SQLite spool. `:memory:` selects an in-memory spool.
    #[serde(rename = "spool", default = "default_spool_path")]
    pub spool_path: String,

    /// Mark everything currently in the feeds as announced on startup.
    #[serde(rename = "autodiscard", default = "default_autospool")]
    pub autospool: bool,

    /// Scheduler tick in minutes.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_minutes: u64,

    /// Default per-channel staleness interval in minutes.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_minutes: u64,

    /// Maximum number of pooled spool connections.
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// Channels being watched, keyed by configuration name.
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
}

fn default_spool_path() -> String {
    DEFAULT_SPOOL_PATH.to_string()
}

fn default_autospool() -> bool {
    true
}

fn default_tick_interval() -> u64 {
    DEFAULT_TICK_INTERVAL_MINUTES
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MINUTES
}

fn default_db_max_connections() -> u32 {
    DEFAULT_DB_MAX_CONNECTIONS
}

impl AppConfig {
    /// Load the configuration file at `path`, apply environment overrides
    /// and validate the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        dotenvy::dotenv().ok();

        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("cannot read config file {}: {}", path.display(), e))
        })?;

        let mut config = Self::from_json(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        tracing::info!(
            path = %path.display(),
            channels = config.channels.len(),
            spool = %config.spool_path,
            autospool = config.autospool,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse a JSON document without touching the environment.
    pub fn from_json(contents: &str) -> Result<Self, AppError> {
        serde_json::from_str(contents)
            .map_err(|e| AppError::Config(format!("invalid config file: {}", e)))
    }

    /// Apply `VIDEODOG_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(spool) = lookup("VIDEODOG_SPOOL") {
            self.spool_path = spool;
        }
        if let Some(value) = lookup("VIDEODOG_AUTODISCARD") {
            self.autospool = value.parse().map_err(|_| {
                AppError::Config("VIDEODOG_AUTODISCARD must be true or false".to_string())
            })?;
        }
        if let Some(value) = lookup("VIDEODOG_TICK_INTERVAL_MINUTES") {
            self.tick_interval_minutes = value.parse().map_err(|_| {
                AppError::Config("VIDEODOG_TICK_INTERVAL_MINUTES must be a valid u64".to_string())
            })?;
        }
        if let Some(value) = lookup("VIDEODOG_POLL_INTERVAL_MINUTES") {
            self.poll_interval_minutes = value.parse().map_err(|_| {
                AppError::Config("VIDEODOG_POLL_INTERVAL_MINUTES must be a valid u64".to_string())
            })?;
        }
        if let Some(value) = lookup("VIDEODOG_DB_MAX_CONNECTIONS") {
            self.db_max_connections = value.parse().map_err(|_| {
                AppError::Config("VIDEODOG_DB_MAX_CONNECTIONS must be a valid u32".to_string())
            })?;
        }
        Ok(())
    }

    /// Reject configurations the daemon cannot run with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.spool_path.trim().is_empty() {
            return Err(AppError::Config("spool path must not be empty".to_string()));
        }
        check_interval("tick_interval_minutes", self.tick_interval_minutes)?;
        check_interval("poll_interval_minutes", self.poll_interval_minutes)?;
        if self.db_max_connections == 0 {
            return Err(AppError::Config(
                "db_max_connections must be greater than zero".to_string(),
            ));
        }
        if self.channels.is_empty() {
            return Err(AppError::Config("no channels configured".to_string()));
        }

        for (key, channel) in &self.channels {
            if key.trim().is_empty() {
                return Err(AppError::Config("channel keys must not be empty".to_string()));
            }
            if channel.channel_id.trim().is_empty() {
                return Err(AppError::Config(format!("channel {key}: channel_id is empty")));
            }
            if let Some(minutes) = channel.poll_interval_minutes {
                check_interval(&format!("channel {key}: poll_interval_minutes"), minutes)?;
            }

            let webhook = url::Url::parse(&channel.webhook_url).map_err(|e| {
                AppError::Config(format!("channel {key}: invalid webhook_url: {e}"))
            })?;
            if !matches!(webhook.scheme(), "http" | "https") {
                return Err(AppError::Config(format!(
                    "channel {key}: webhook_url must use http or https"
                )));
            }
        }

        Ok(())
    }

    /// Staleness interval for `channel`, in minutes.
    pub fn poll_interval_for(&self, channel: &ChannelConfig) -> u64 {
        channel
            .poll_interval_minutes
            .unwrap_or(self.poll_interval_minutes)
    }
}

fn check_interval(name: &str, minutes: u64) -> Result<(), AppError> {
    if minutes == 0 {
        return Err(AppError::Config(format!("{name} must be greater than zero")));
    }
    if minutes > MAX_INTERVAL_MINUTES {
        return Err(AppError::Config(format!(
            "{name} must be at most {MAX_INTERVAL_MINUTES} (one year)"
        )));
    }
    Ok(())
}

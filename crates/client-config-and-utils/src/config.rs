//! Configuration management for the client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default nutrition service base URL.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Default entry point of the third-party OAuth redirect flow.
pub const DEFAULT_OAUTH_AUTHORIZE_URL: &str = "http://localhost:8080/oauth2/authorization/google";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_REMINDER_INTERVAL_SECS: u64 = 3600;
const DEFAULT_LUNCH_HOUR: u32 = 12;

/// Reminder timer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSettings {
    /// Tick period shared by both reminder timers.
    #[serde(default = "default_reminder_interval_secs")]
    pub interval_secs: u64,
    /// Local hour (0-23) at which the meal-log reminder fires.
    #[serde(default = "default_lunch_hour")]
    pub lunch_hour: u32,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_REMINDER_INTERVAL_SECS,
            lunch_hour: DEFAULT_LUNCH_HOUR,
        }
    }
}

impl ReminderSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Base URL of the nutrition REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// URL the user opens to start the OAuth redirect login.
    #[serde(default = "default_oauth_authorize_url")]
    pub oauth_authorize_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub reminders: ReminderSettings,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_oauth_authorize_url() -> String {
    DEFAULT_OAUTH_AUTHORIZE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_reminder_interval_secs() -> u64 {
    DEFAULT_REMINDER_INTERVAL_SECS
}

fn default_lunch_hour() -> u32 {
    DEFAULT_LUNCH_HOUR
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            oauth_authorize_url: default_oauth_authorize_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            reminders: ReminderSettings::default(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file if present, then apply
    /// environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("NUTRI_LOG_LEVEL") {
            if !log_level.trim().is_empty() {
                self.log_level = log_level;
            }
        }
        if let Ok(api_url) = std::env::var("NUTRI_API_URL") {
            if !api_url.trim().is_empty() {
                self.api_base_url = api_url.trim().to_string();
            }
        }
    }

    fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        if self.reminders.lunch_hour > 23 {
            return Err(CoreError::Config(format!(
                "reminders.lunch_hour must be 0-23, got {}",
                self.reminders.lunch_hour
            )));
        }
        Ok(())
    }

    /// The API base URL, parsed.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

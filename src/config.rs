//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::ClientConfig;
use crate::refresh::{OverlapPolicy, RefreshConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub preferences: PreferencesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dashboard API connection
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_url")]
    pub url: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout() -> u64 {
    10_000 // 10 seconds
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: default_api_url(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// Refresh loop settings
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_route")]
    pub route: String,

    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,

    #[serde(default)]
    pub overlap: OverlapPolicy,
}

fn default_route() -> String {
    "/dashboard".to_string()
}

fn default_refresh_interval() -> u64 {
    300_000 // 5 minutes
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            route: default_route(),
            refresh_interval_ms: default_refresh_interval(),
            overlap: OverlapPolicy::default(),
        }
    }
}

/// Client-local preference storage
#[derive(Debug, Clone, Deserialize)]
pub struct PreferencesConfig {
    #[serde(default = "default_preferences_path")]
    pub path: String,
}

fn default_preferences_path() -> String {
    dirs::data_local_dir()
        .map(|p| {
            p.join("ecodash")
                .join("preferences.json")
                .to_string_lossy()
                .to_string()
        })
        .unwrap_or_else(|| "./ecodash_preferences.json".to_string())
}

impl Default for PreferencesConfig {
    fn default() -> Self {
        Self {
            path: default_preferences_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        let config: Config = toml::from_str(content).map_err(|e| e.to_string())?;
        if config.dashboard.refresh_interval_ms == 0 {
            return Err("dashboard.refresh_interval_ms must be greater than zero".to_string());
        }
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("ecodash").join("config.toml")),
            Some(PathBuf::from("/etc/ecodash/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply `ECODASH_*` overrides looked up through `lookup`
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("ECODASH_API_URL") {
            self.api.url = url;
        }
        if let Some(route) = lookup("ECODASH_ROUTE") {
            self.dashboard.route = route;
        }
        if let Some(interval) = lookup("ECODASH_REFRESH_INTERVAL_MS") {
            match interval.parse::<u64>() {
                Ok(ms) if ms > 0 => self.dashboard.refresh_interval_ms = ms,
                _ => tracing::warn!("Ignoring invalid ECODASH_REFRESH_INTERVAL_MS: {}", interval),
            }
        }
        if let Some(path) = lookup("ECODASH_PREFERENCES") {
            self.preferences.path = path;
        }
        if let Some(level) = lookup("ECODASH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("ECODASH_LOG_FORMAT") {
            self.logging.format = format;
        }
    }

    /// HTTP client settings derived from `[api]`
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.api.url.clone(),
            request_timeout_ms: self.api.request_timeout_ms,
        }
    }

    /// Preference file path with a leading `~` expanded
    pub fn preferences_path(&self) -> PathBuf {
        expand_home(&self.preferences.path)
    }

    /// Refresh loop settings derived from `[dashboard]`
    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            route: self.dashboard.route.clone(),
            interval: Duration::from_millis(self.dashboard.refresh_interval_ms),
            overlap: self.dashboard.overlap,
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# EcoDash Configuration
#
# Environment variables override these settings:
# - ECODASH_API_URL
# - ECODASH_ROUTE
# - ECODASH_REFRESH_INTERVAL_MS
# - ECODASH_PREFERENCES
# - ECODASH_LOG_LEVEL
# - ECODASH_LOG_FORMAT

[api]
# Base URL of the dashboard server
url = "http://localhost:5000"

# Request timeout (ms)
request_timeout_ms = 10000

[dashboard]
# Page path the refresh loop is active on
route = "/dashboard"

# Time between chart refreshes (ms)
refresh_interval_ms = 300000

# What to do when a chart's previous refresh is still running:
# allow (send another request) or skip (wait for the next tick)
overlap = "allow"

[preferences]
# File holding client-local preferences such as the theme
path = "~/.local/share/ecodash/preferences.json"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

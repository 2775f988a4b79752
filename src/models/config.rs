//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Refresh policy settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Visit counter settings
    #[serde(default)]
    pub visits: VisitConfig,

    /// Upstream snapshot gateway settings
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Search paging limits
    #[serde(default)]
    pub search: SearchConfig,

    /// Local storage location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Provider identifier-stability table
    #[serde(default = "defaults::providers")]
    pub providers: Vec<ProviderInfo>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.sync.ttl_minutes == 0 {
            return Err(AppError::validation("sync.ttl_minutes must be > 0"));
        }
        self.sync.ttl()?;
        if self.visits.window_secs == 0 {
            return Err(AppError::validation("visits.window_secs must be > 0"));
        }
        if self.remote.user_agent.trim().is_empty() {
            return Err(AppError::validation("remote.user_agent is empty"));
        }
        if self.remote.timeout_secs == 0 {
            return Err(AppError::validation("remote.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.remote.base_url)?;
        if self.search.default_page_size == 0 {
            return Err(AppError::validation("search.default_page_size must be > 0"));
        }
        if self.search.max_page_size < self.search.default_page_size {
            return Err(AppError::validation(
                "search.max_page_size must be >= search.default_page_size",
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if provider.id.trim().is_empty() {
                return Err(AppError::validation("provider id is empty"));
            }
            if !seen.insert(provider.id.as_str()) {
                return Err(AppError::validation(format!(
                    "provider '{}' is listed twice",
                    provider.id
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sync: SyncConfig::default(),
            visits: VisitConfig::default(),
            remote: RemoteConfig::default(),
            search: SearchConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            providers: defaults::providers(),
        }
    }
}

/// Refresh policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Age after which a stored record is refetched
    #[serde(default = "defaults::ttl_minutes")]
    pub ttl_minutes: u64,
}

impl SyncConfig {
    pub fn ttl(&self) -> Result<Duration> {
        ttl_from_minutes(self.ttl_minutes)
    }
}

/// Convert a minute count into a TTL, rejecting values chrono cannot hold.
pub fn ttl_from_minutes(minutes: u64) -> Result<Duration> {
    i64::try_from(minutes)
        .ok()
        .and_then(Duration::try_minutes)
        .ok_or_else(|| AppError::validation(format!("TTL of {} minutes is out of range", minutes)))
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: defaults::ttl_minutes(),
        }
    }
}

/// Visit counter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitConfig {
    /// At most one counted visit per subject and novel in this window
    #[serde(default = "defaults::visit_window")]
    pub window_secs: u64,
}

impl Default for VisitConfig {
    fn default() -> Self {
        Self {
            window_secs: defaults::visit_window(),
        }
    }
}

/// Upstream snapshot gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the snapshot gateway
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Search paging limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "defaults::default_page_size")]
    pub default_page_size: usize,

    #[serde(default = "defaults::max_page_size")]
    pub max_page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: defaults::default_page_size(),
            max_page_size: defaults::max_page_size(),
        }
    }
}

/// Local storage location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::root_dir")]
    pub root_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_dir: defaults::root_dir(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

/// Whether a provider's chapter identifiers survive refetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStability {
    /// Chapter ids are durable across refetches
    Stable,
    /// Chapter ids may be regenerated; only titles are durable
    Unstable,
}

/// Static per-provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub id: String,

    #[serde(default = "defaults::id_stability")]
    pub id_stability: IdStability,
}

mod defaults {
    use std::path::PathBuf;

    use super::{IdStability, ProviderInfo};

    pub fn ttl_minutes() -> u64 {
        20 * 60
    }
    pub fn visit_window() -> u64 {
        60 * 60
    }
    pub fn base_url() -> String {
        "http://127.0.0.1:8081/".into()
    }
    pub fn user_agent() -> String {
        "novelsync/0.1".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn default_page_size() -> usize {
        10
    }
    pub fn max_page_size() -> usize {
        100
    }
    pub fn root_dir() -> PathBuf {
        PathBuf::from("storage")
    }
    pub fn log_level() -> String {
        "info".into()
    }
    pub fn id_stability() -> IdStability {
        IdStability::Stable
    }

    pub fn providers() -> Vec<ProviderInfo> {
        let stable = ["kakuyomu", "novelup", "pixiv", "alphapolis", "novelism"];
        let unstable = ["syosetu", "hameln"];

        stable
            .iter()
            .map(|id| (id, IdStability::Stable))
            .chain(unstable.iter().map(|id| (id, IdStability::Unstable)))
            .map(|(id, id_stability)| ProviderInfo {
                id: id.to_string(),
                id_stability,
            })
            .collect()
    }
}

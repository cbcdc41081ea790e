// SPDX-License-Identifier: MPL-2.0

//! Monitor configuration
//!
//! Loaded from a JSON file. Every section and field is optional; whatever is
//! missing takes the defaults below. The two traffic contexts have different
//! defaults, so a partial `network` section is filled from the network
//! defaults, not the dashboard ones.
//!
//! ```json
//! {
//!   "source": { "kind": "http", "url": "http://192.168.1.1/api/network/stats" },
//!   "dashboard": { "poll_interval_ms": 10000 },
//!   "network": { "interface": "eth0", "stale_after_secs": 60 }
//! }
//! ```

use crate::traffic::history::{DASHBOARD_CAPACITY, NETWORK_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the kernel's interface counters.
pub const PROC_NET_DEV: &str = "/proc/net/dev";

/// Default fetch timeout for the HTTP source.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 20_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConfigFile")]
pub struct Config {
    /// Where counters come from
    pub source: SourceConfig,
    /// Dashboard widget context
    pub dashboard: ContextConfig,
    /// Network-traffic page context
    pub network: ContextConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            dashboard: ContextConfig::dashboard(),
            network: ContextConfig::network(),
        }
    }
}

impl Config {
    pub const VERSION: u64 = 1;

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given and present, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                log::warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dashboard.validate("dashboard")?;
        self.network.validate("network")?;
        if let SourceConfig::Http { url, timeout_ms } = &self.source {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!("source.url is not an HTTP URL: {url:?}")));
            }
            if *timeout_ms == 0 {
                return Err(ConfigError::Invalid("source.timeout_ms must be positive".into()));
            }
        }
        Ok(())
    }
}

/// Counter source selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Appliance REST endpoint returning JSON or a text dump
    Http {
        url: String,
        #[serde(default = "default_http_timeout_ms")]
        timeout_ms: u64,
    },
    /// A `/proc/net/dev`-format file
    ProcNetDev { path: PathBuf },
    /// Host interface table via sysinfo
    Sysinfo,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::ProcNetDev {
            path: PathBuf::from(PROC_NET_DEV),
        }
    }
}

fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

/// Settings for one traffic context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Time between polls
    pub poll_interval_ms: u64,
    /// Number of samples kept for the chart
    pub history_capacity: usize,
    /// Longest gap between samples still trusted for a rate
    pub stale_after_secs: u64,
    /// Interface to observe; `None` auto-selects
    pub interface: Option<String>,
}

impl ContextConfig {
    pub fn dashboard() -> Self {
        Self {
            poll_interval_ms: 10_000,
            history_capacity: DASHBOARD_CAPACITY,
            stale_after_secs: 300,
            interface: None,
        }
    }

    pub fn network() -> Self {
        Self {
            poll_interval_ms: 5_000,
            history_capacity: NETWORK_CAPACITY,
            stale_after_secs: 60,
            interface: None,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(format!("{section}.poll_interval_ms must be positive")));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(format!("{section}.history_capacity must be positive")));
        }
        if self.stale_after_secs == 0 {
            return Err(ConfigError::Invalid(format!("{section}.stale_after_secs must be positive")));
        }
        Ok(())
    }
}

// ============================================================================
// File representation
// ============================================================================

#[derive(Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    source: SourceConfig,
    dashboard: ContextOverrides,
    network: ContextOverrides,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ContextOverrides {
    poll_interval_ms: Option<u64>,
    history_capacity: Option<usize>,
    stale_after_secs: Option<u64>,
    interface: Option<String>,
}

impl ContextOverrides {
    fn apply(self, base: ContextConfig) -> ContextConfig {
        ContextConfig {
            poll_interval_ms: self.poll_interval_ms.unwrap_or(base.poll_interval_ms),
            history_capacity: self.history_capacity.unwrap_or(base.history_capacity),
            stale_after_secs: self.stale_after_secs.unwrap_or(base.stale_after_secs),
            interface: self.interface.filter(|i| !i.is_empty()).or(base.interface),
        }
    }
}

impl From<ConfigFile> for Config {
    fn from(file: ConfigFile) -> Self {
        Self {
            source: file.source,
            dashboard: file.dashboard.apply(ContextConfig::dashboard()),
            network: file.network.apply(ContextConfig::network()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.dashboard.history_capacity, 20);
        assert_eq!(config.network.history_capacity, 30);
        assert_eq!(config.dashboard.stale_after(), Duration::from_secs(300));
        assert_eq!(config.network.stale_after(), Duration::from_secs(60));
    }

    #[test]
    fn partial_sections_keep_their_own_defaults() {
        let config: Config = serde_json::from_str(
            r#"{
                "source": { "kind": "http", "url": "http://10.0.0.1/api/network/stats" },
                "network": { "interface": "eth0" }
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.source,
            SourceConfig::Http {
                url: "http://10.0.0.1/api/network/stats".into(),
                timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            }
        );
        assert_eq!(config.network.interface.as_deref(), Some("eth0"));
        assert_eq!(config.network.poll_interval_ms, 5_000);
        assert_eq!(config.network.stale_after_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = Config::default();
        config.network.stale_after_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = Config {
            source: SourceConfig::Http {
                url: "ftp://nope".into(),
                timeout_ms: 1,
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_reads_file_and_missing_file_defaults() {
        let dir = std::env::temp_dir().join(format!("netrate-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{ "source": { "kind": "sysinfo" } }"#).unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.source, SourceConfig::Sysinfo);

        let missing = dir.join("missing.json");
        assert_eq!(Config::load_or_default(Some(missing.as_path())).unwrap(), Config::default());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

//! ==============================================================================
//! config.rs - Runtime Configuration Loader
//! ==============================================================================
//!
//! purpose:
//!     defines the schema for `host.toml`.
//!     loads configuration from file or falls back to defaults.
//!
//! structure:
//!     - FeedConfig: Where sensor data comes from (firebase project or memory).
//!     - ServerConfig: Dashboard bind address.
//!     - DashboardConfig: Language, display timezone, per-tab selection policy.
//!     - LoggingConfig: Log level and whether to log every reading.
//!     - SimulatorConfig: Fake macetas written into the memory feed.
//!
//! every section is optional; anything missing takes the default below.
//!
//! ==============================================================================

use crate::i18n::Language;
use crate::selection::{SelectionPolicy, View};

use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct HostConfig {
    pub feed: FeedConfig,
    pub server: ServerConfig,
    pub dashboard: DashboardConfig,
    pub logging: LoggingConfig,
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Firebase,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeedConfig {
    pub kind: FeedKind,
    pub database_url: String,
    pub poll_interval_seconds: u64,
    /// database secret or id token, sent as `auth=`
    pub auth_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub language: Language,
    pub timezone: String,
    pub principal_policy: SelectionPolicy,
    pub devices_policy: SelectionPolicy,
    pub statistics_policy: SelectionPolicy,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub show_sensor_data: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorConfig {
    pub enabled: bool,
    pub sensors: Vec<String>,
    pub interval_seconds: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            kind: FeedKind::Firebase,
            database_url: "https://plantitas-base-default-rtdb.firebaseio.com".to_string(),
            poll_interval_seconds: 5,
            auth_token: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0:3000".to_string() }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            language: Language::Es,
            timezone: "America/Lima".to_string(),
            principal_policy: View::Principal.default_policy(),
            devices_policy: View::Devices.default_policy(),
            statistics_policy: View::Statistics.default_policy(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), show_sensor_data: true }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sensors: vec!["maceta1".to_string(), "maceta2".to_string(), "maceta3".to_string()],
            interval_seconds: 5,
        }
    }
}

impl DashboardConfig {
    pub fn policy(&self, view: View) -> SelectionPolicy {
        match view {
            View::Principal => self.principal_policy,
            View::Devices => self.devices_policy,
            View::Statistics => self.statistics_policy,
        }
    }
}

impl HostConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: HostConfig = toml::from_str(content)?;
        if config.feed.poll_interval_seconds == 0 {
            anyhow::bail!("feed.poll_interval_seconds must be at least 1");
        }
        if config.simulator.interval_seconds == 0 {
            anyhow::bail!("simulator.interval_seconds must be at least 1");
        }
        Ok(config)
    }

    /// Load with default fallback
    ///
    /// runs before logging is set up (the log level lives in here), so it
    /// reports on stdout.
    pub fn load_or_default() -> Self {
        let paths = [
            PathBuf::from("config").join("host.toml"),
            PathBuf::from("..").join("config").join("host.toml"),
        ];

        for path in &paths {
            if path.exists() {
                match Self::load(path) {
                    Ok(config) => {
                        println!("[CONFIG] Loaded from {}", path.display());
                        return config;
                    }
                    Err(e) => {
                        println!("[CONFIG] Warning: Failed to load {}: {:#}", path.display(), e);
                    }
                }
            }
        }

        println!("[CONFIG] Warning: No config file found - using defaults");
        Self::default()
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        let feed = match self.feed.kind {
            FeedKind::Firebase => self.feed.database_url.as_str(),
            FeedKind::Memory => "in-memory",
        };
        println!("┌─────────────────────────────────────────┐");
        println!("│           HOST CONFIGURATION            │");
        println!("├─────────────────────────────────────────┤");
        println!("│ Feed: {}", feed);
        println!("│ Poll Interval: {}s", self.feed.poll_interval_seconds);
        println!("│ Dashboard: http://{}", self.server.bind);
        println!("│ Language: {} | Timezone: {}", self.dashboard.language.tag(), self.dashboard.timezone);
        println!("│ Simulator: {}", if self.simulator.enabled { "on" } else { "off" });
        println!("│ Log Level: {}", self.logging.level);
        println!("└─────────────────────────────────────────┘");
    }
}

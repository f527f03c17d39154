//! TOML configuration.
//!
//! Read from the file named by `SUBWATCH_CONFIG` (default `subwatch.toml`).
//! Every field has a default, so a missing file is not an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use subwatch_app::SchedulerSettings;
use subwatch_core::utils::validation;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "SUBWATCH_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "subwatch.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub worker: WorkerConfig,
    pub alert: AlertConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// HTTP worker threads; defaults to the number of CPUs
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/subwatch.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    pub poll_interval_secs: u64,
    pub scan_timeout_minutes: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            scan_timeout_minutes: 120,
        }
    }
}

impl SchedulerConfig {
    #[must_use]
    pub fn settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            scan_timeout: chrono::Duration::minutes(i64::from(self.scan_timeout_minutes)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkerConfig {
    /// Run the built-in scan worker; disable when an external worker reports over HTTP
    pub enabled: bool,
    pub poll_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: 5,
        }
    }
}

impl WorkerConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertConfig {
    pub discord_webhook: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Filter directive; `RUST_LOG` takes precedence
    pub level: String,
    pub json: bool,
    /// Also write a daily rotated file here
    pub directory: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info,sea_orm=warn,sqlx::query=warn".to_string(),
            json: false,
            directory: None,
        }
    }
}

impl AppConfig {
    /// Load from `SUBWATCH_CONFIG` or `subwatch.toml`.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var_os(CONFIG_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from);
        Self::load_from(&path)
    }

    /// Load from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and validate TOML text.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            bail!("server.port must not be 0");
        }
        if self.server.workers == Some(0) {
            bail!("server.workers must be at least 1");
        }
        if self.scheduler.poll_interval_secs == 0 {
            bail!("scheduler.poll_interval_secs must be at least 1");
        }
        if self.scheduler.scan_timeout_minutes == 0 {
            bail!("scheduler.scan_timeout_minutes must be at least 1");
        }
        if self.worker.poll_interval_secs == 0 {
            bail!("worker.poll_interval_secs must be at least 1");
        }
        if let Some(ref webhook) = self.alert.discord_webhook {
            validation::http_url(webhook).context("alert.discord_webhook")?;
        }
        Ok(())
    }
}

//! Configuration loader and validator for the form batch service.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::dispatch::DispatchSettings;
use crate::retry::RetryPolicy;
use crate::schedule::Schedule;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub server: Server,
    pub processing: Processing,
    pub retry: Retry,
    pub schedule: ScheduleConfig,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
}

/// Inbound HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub bind: String,
}

/// Remote processing API settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Processing {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub batch_size: u32,
}

/// Retry policy for transport failures within one cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Retry {
    pub max_retries: u32,
    pub backoff_secs: u64,
}

/// Periodic trigger settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub every_hours: u32,
    pub lease_secs: u64,
}

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.app.data_dir)
    }

    /// Default SQLite URL under `app.data_dir`, overridable with `DATABASE_URL`.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "sqlite://{}/records.db",
                self.app.data_dir.trim_end_matches('/')
            )
        })
    }

    pub fn processing_timeout(&self) -> Duration {
        Duration::from_secs(self.processing.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_secs(self.retry.backoff_secs),
        )
    }

    pub fn schedule(&self) -> Schedule {
        Schedule::every_hours(self.schedule.every_hours)
    }

    /// Value object handed to the dispatch task.
    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            batch_size: self.processing.batch_size,
            retry: self.retry_policy(),
            lease: Duration::from_secs(self.schedule.lease_secs),
        }
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.server.bind.trim().is_empty() {
        return Err(ConfigError::Invalid("server.bind must be non-empty"));
    }

    let endpoint = cfg.processing.endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::Invalid("processing.endpoint must be non-empty"));
    }
    match reqwest::Url::parse(endpoint) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
        _ => {
            return Err(ConfigError::Invalid(
                "processing.endpoint must be an http(s) URL",
            ))
        }
    }
    if cfg.processing.timeout_secs == 0 {
        return Err(ConfigError::Invalid("processing.timeout_secs must be > 0"));
    }
    if cfg.processing.batch_size == 0 {
        return Err(ConfigError::Invalid("processing.batch_size must be > 0"));
    }
    // retry.max_retries = 0 disables retries; backoff_secs may be 0.

    if !(1..=24).contains(&cfg.schedule.every_hours) {
        return Err(ConfigError::Invalid(
            "schedule.every_hours must be between 1 and 24",
        ));
    }
    if cfg.schedule.lease_secs == 0 {
        return Err(ConfigError::Invalid("schedule.lease_secs must be > 0"));
    }
    let attempts = u64::from(cfg.retry.max_retries) + 1;
    let worst_case = attempts
        .saturating_mul(cfg.processing.timeout_secs)
        .saturating_add(u64::from(cfg.retry.max_retries).saturating_mul(cfg.retry.backoff_secs));
    if cfg.schedule.lease_secs < worst_case {
        return Err(ConfigError::Invalid(
            "schedule.lease_secs must cover every attempt and backoff of one cycle",
        ));
    }

    Ok(())
}

/// Returns the example YAML shipped as `config.example.yaml`.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"

server:
  bind: "0.0.0.0:8000"

processing:
  endpoint: "https://dev.micro.mgsigma.net/batch/process"
  timeout_secs: 30
  batch_size: 10

retry:
  max_retries: 3
  backoff_secs: 60

schedule:
  every_hours: 2
  lease_secs: 600
"#
}

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::RunConfig;

/// Directory holding project configuration, relative to the project root.
pub const CONFIG_DIR: &str = ".levelforge";

/// Prefix for environment overrides (`LEVELFORGE_DISPATCHER__CONCURRENCY=4`).
pub const ENV_PREFIX: &str = "LEVELFORGE_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid concurrency: {0}. Must be between 1 and 100")]
    InvalidConcurrency(usize),

    #[error("Invalid grade retries: adjacent_grade_after ({0}) must not exceed max_grade_retries ({1})")]
    InvalidGradeRetries(u32, u32),

    #[error("Invalid backoff configuration: backoff_base_ms ({0}) must not exceed backoff_max_ms ({1})")]
    InvalidBackoff(u64, u64),

    #[error("Service base_url cannot be empty")]
    EmptyServiceUrl,

    #[error("Invalid rate limit: {0}. Must be positive")]
    InvalidRateLimit(f64),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidLogRotation(String),

    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid gimmick table: {0}")]
    InvalidGimmick(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the current directory.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .levelforge/config.yaml
    /// 3. .levelforge/local.yaml (optional local overrides)
    /// 4. Environment variables (LEVELFORGE_* prefix, `__` for nesting)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Same as [`ConfigLoader::load`] with `root` as the project directory.
    pub fn load_from_dir(root: impl AsRef<Path>) -> Result<Config> {
        let dir = root.as_ref().join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Read and validate a run description.
    pub fn load_run(path: impl AsRef<Path>) -> Result<RunConfig> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run file {}", path.display()))?;
        let run: RunConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse run file {}", path.display()))?;
        run.validate()
            .with_context(|| format!("Invalid run file {}", path.display()))?;
        Ok(run)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let dispatcher = &config.dispatcher;
        if dispatcher.concurrency == 0 || dispatcher.concurrency > 100 {
            return Err(ConfigError::InvalidConcurrency(dispatcher.concurrency));
        }
        if dispatcher.adjacent_grade_after > dispatcher.max_grade_retries {
            return Err(ConfigError::InvalidGradeRetries(
                dispatcher.adjacent_grade_after,
                dispatcher.max_grade_retries,
            ));
        }
        if dispatcher.backoff_base_ms > dispatcher.backoff_max_ms {
            return Err(ConfigError::InvalidBackoff(
                dispatcher.backoff_base_ms,
                dispatcher.backoff_max_ms,
            ));
        }

        if config.service.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyServiceUrl);
        }
        if config.service.requests_per_second <= 0.0 || !config.service.requests_per_second.is_finite() {
            return Err(ConfigError::InvalidRateLimit(config.service.requests_per_second));
        }
        if config.service.timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "service.timeout_secs must be at least 1".to_string(),
            ));
        }

        if config.database.path.is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(
                config.database.max_connections,
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidLogRotation(config.logging.rotation.clone()));
        }

        let mut seen = HashSet::new();
        for gimmick in &config.gimmicks {
            if gimmick.name.trim().is_empty() {
                return Err(ConfigError::InvalidGimmick("gimmick name cannot be empty".to_string()));
            }
            if gimmick.unlock_level == 0 {
                return Err(ConfigError::InvalidGimmick(format!(
                    "'{}' must unlock at level 1 or later",
                    gimmick.name
                )));
            }
            if !seen.insert(gimmick.name.as_str()) {
                return Err(ConfigError::InvalidGimmick(format!(
                    "'{}' is listed more than once",
                    gimmick.name
                )));
            }
        }

        Ok(())
    }
}

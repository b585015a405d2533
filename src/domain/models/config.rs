use serde::{Deserialize, Serialize};

/// Main configuration structure for Levelforge
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Dispatcher concurrency and retry bounds
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Generation service endpoint configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Gimmicks and the level number at which each unlocks
    #[serde(default = "default_gimmicks")]
    pub gimmicks: Vec<GimmickUnlock>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dispatcher: DispatcherConfig::default(),
            service: ServiceConfig::default(),
            database: DatabaseConfig::default(),
            logging: LoggingConfig::default(),
            gimmicks: default_gimmicks(),
        }
    }
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DispatcherConfig {
    /// Maximum tasks in flight per batch (1-100)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Grade-correction retries before accepting the last result
    #[serde(default = "default_max_grade_retries")]
    pub max_grade_retries: u32,

    /// Grade-correction retries after which an adjacent grade is accepted
    #[serde(default = "default_adjacent_grade_after")]
    pub adjacent_grade_after: u32,

    /// Retries of a failing service call before the task is marked failed
    #[serde(default = "default_api_error_retries")]
    pub api_error_retries: u32,

    /// Base delay for the 1.5x exponential service backoff
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound for a single backoff delay
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    /// Seed for retry jitter; random when unset
    #[serde(default)]
    pub seed: Option<u64>,
}

const fn default_concurrency() -> usize {
    10
}

const fn default_max_grade_retries() -> u32 {
    30
}

const fn default_adjacent_grade_after() -> u32 {
    20
}

const fn default_api_error_retries() -> u32 {
    10
}

const fn default_backoff_base_ms() -> u64 {
    500
}

const fn default_backoff_max_ms() -> u64 {
    30_000
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_grade_retries: default_max_grade_retries(),
            adjacent_grade_after: default_adjacent_grade_after(),
            api_error_retries: default_api_error_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            seed: None,
        }
    }
}

/// Generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServiceConfig {
    /// Base URL of the generation service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Client-side request rate limit
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: f64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:8787".to_string()
}

const fn default_timeout_secs() -> u64 {
    60
}

const fn default_requests_per_second() -> f64 {
    5.0
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".levelforge/levelforge.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// File rotation: daily, hourly or never
    #[serde(default = "default_log_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_log_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_log_rotation(),
        }
    }
}

/// A gimmick and the first level number it may appear on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GimmickUnlock {
    pub name: String,
    pub unlock_level: usize,
}

impl GimmickUnlock {
    pub fn new(name: impl Into<String>, unlock_level: usize) -> Self {
        Self {
            name: name.into(),
            unlock_level,
        }
    }

    /// Built-in unlock schedule.
    pub fn default_table() -> Vec<Self> {
        default_gimmicks()
    }
}

fn default_gimmicks() -> Vec<GimmickUnlock> {
    vec![
        GimmickUnlock::new("hidden", 1),
        GimmickUnlock::new("ice", 6),
        GimmickUnlock::new("bomb", 11),
        GimmickUnlock::new("chain", 16),
        GimmickUnlock::new("portal", 21),
        GimmickUnlock::new("lock", 31),
    ]
}

//! Runtime configuration for the resume core.
//!
//! # Responsibility
//! - Provide defaults suitable for tests and local runs.
//! - Load overrides from `RESUME_*` environment variables.
//!
//! # Invariants
//! - `pool_size` is within `1..=MAX_POOL_SIZE`.
//! - An unset database path means an in-memory store.

use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "RESUME_DB_PATH";
pub const ENV_POOL_SIZE: &str = "RESUME_POOL_SIZE";
pub const ENV_POOL_ACQUIRE_TIMEOUT_MS: &str = "RESUME_POOL_ACQUIRE_TIMEOUT_MS";
pub const ENV_BUSY_TIMEOUT_MS: &str = "RESUME_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "RESUME_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "RESUME_LOG_DIR";

const DEFAULT_POOL_SIZE: usize = 4;
/// Upper bound for `RESUME_POOL_SIZE`; each pooled connection is a file handle.
pub const MAX_POOL_SIZE: usize = 256;
const DEFAULT_ACQUIRE_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Value could not be parsed as the expected type.
    InvalidNumber { key: &'static str, value: String },
    /// Pool size must be at least one.
    ZeroPoolSize,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "`{key}` must be an in-range non-negative integer, got `{value}`")
            }
            Self::ZeroPoolSize => write!(f, "`{ENV_POOL_SIZE}` must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

/// Store, pool and logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    /// SQLite file path. `None` opens an in-memory database.
    pub database_path: Option<PathBuf>,
    /// Number of pooled connections for file databases.
    pub pool_size: usize,
    /// Maximum time a caller waits for a pooled connection.
    pub acquire_timeout: Duration,
    /// SQLite busy timeout applied to every connection.
    pub busy_timeout: Duration,
    /// Log level passed to `init_logging`.
    pub log_level: String,
    /// Absolute log directory. `None` leaves logging uninitialized.
    pub log_dir: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            pool_size: DEFAULT_POOL_SIZE,
            acquire_timeout: Duration::from_millis(DEFAULT_ACQUIRE_TIMEOUT_MS),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Loads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = get(ENV_DB_PATH) {
            config.database_path = Some(PathBuf::from(path));
        }
        if let Some(value) = get(ENV_POOL_SIZE) {
            config.pool_size = parse_pool_size(&value)?;
        }
        if let Some(value) = get(ENV_POOL_ACQUIRE_TIMEOUT_MS) {
            config.acquire_timeout =
                Duration::from_millis(parse_number(ENV_POOL_ACQUIRE_TIMEOUT_MS, &value)?);
        }
        if let Some(value) = get(ENV_BUSY_TIMEOUT_MS) {
            config.busy_timeout =
                Duration::from_millis(parse_number(ENV_BUSY_TIMEOUT_MS, &value)?);
        }
        if let Some(level) = get(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        config.log_dir = get(ENV_LOG_DIR);

        Ok(config)
    }
}

fn parse_pool_size(value: &str) -> Result<usize, ConfigError> {
    let size = usize::try_from(parse_number(ENV_POOL_SIZE, value)?)
        .ok()
        .filter(|size| *size <= MAX_POOL_SIZE)
        .ok_or_else(|| ConfigError::InvalidNumber {
            key: ENV_POOL_SIZE,
            value: value.to_string(),
        })?;
    if size == 0 {
        return Err(ConfigError::ZeroPoolSize);
    }
    Ok(size)
}

fn parse_number(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: value.to_string(),
    })
}

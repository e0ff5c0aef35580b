//! Application configuration management
//!
//! This module handles loading and validating configuration from environment variables.
//! All configuration is loaded at startup and validated before the application runs.

use std::env;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use crate::constants::{
    DEFAULT_CONTEST_PROBLEM_POINTS, DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS,
    DEFAULT_DATABASE_MAX_CONNECTIONS, DEFAULT_LOG_FILTER, DEFAULT_STATUS_SYNC_INTERVAL_SECS,
};
use crate::models::ScoreOrder;

/// Global application configuration (lazily initialized)
pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::from_env().expect("Failed to load configuration from environment")
});

/// Main application configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub log: LogConfig,
    pub database: DatabaseConfig,
    pub scoring: ScoringConfig,
    pub scheduler: SchedulerConfig,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub rust_log: String,
    /// Emit JSON lines instead of the human readable format
    pub json: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

/// Scoring policy configuration
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    /// How caller-supplied scores are compared for `UserProgress::best_score`
    pub score_order: ScoreOrder,
    /// Points given to a contest problem added without an explicit value
    pub default_contest_points: i32,
}

/// Background job configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub status_sync_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            log: LogConfig::from_env()?,
            database: DatabaseConfig::from_env()?,
            scoring: ScoringConfig::from_env()?,
            scheduler: SchedulerConfig::from_env()?,
        })
    }
}

/// Read an optional variable, parsing it when present
fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name.to_string())),
        Err(_) => Ok(default),
    }
}

impl LogConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
            json: parse_var("LOG_JSON", false)?,
        })
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            rust_log: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: env::var("DATABASE_URL")
                .map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?,
            max_connections: parse_var("DATABASE_MAX_CONNECTIONS", DEFAULT_DATABASE_MAX_CONNECTIONS)?,
            acquire_timeout: Duration::from_secs(parse_var(
                "DATABASE_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS,
            )?),
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let default_contest_points =
            parse_var("DEFAULT_CONTEST_POINTS", DEFAULT_CONTEST_PROBLEM_POINTS)?;
        if default_contest_points <= 0 {
            return Err(ConfigError::InvalidValue("DEFAULT_CONTEST_POINTS".to_string()));
        }

        Ok(Self {
            score_order: parse_var("BEST_SCORE_ORDER", ScoreOrder::default())?,
            default_contest_points,
        })
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            score_order: ScoreOrder::default(),
            default_contest_points: DEFAULT_CONTEST_PROBLEM_POINTS,
        }
    }
}

impl SchedulerConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let secs = parse_var("STATUS_SYNC_INTERVAL_SECS", DEFAULT_STATUS_SYNC_INTERVAL_SECS)?;
        if secs == 0 {
            return Err(ConfigError::InvalidValue("STATUS_SYNC_INTERVAL_SECS".to_string()));
        }

        Ok(Self {
            status_sync_interval: Duration::from_secs(secs),
        })
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            status_sync_interval: Duration::from_secs(DEFAULT_STATUS_SYNC_INTERVAL_SECS),
        }
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl From<ConfigError> for crate::error::AppError {
    fn from(err: ConfigError) -> Self {
        crate::error::AppError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.log.rust_log, "info");
        assert!(!config.log.json);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.scoring.default_contest_points, 100);
        assert_eq!(config.scoring.score_order, ScoreOrder::HigherIsBetter);
        assert_eq!(config.scheduler.status_sync_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let value: u32 = parse_var("CODEFORGE_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }
}

use invoicing_core::config::{self as core_config, get_env, parse_env};
use invoicing_core::error::AppError;
use std::time::Duration;

use crate::models::DEFAULT_PREFIX;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub common: core_config::Config,
    pub numbering: NumberingConfig,
    pub database: Option<DatabaseConfig>,
}

#[derive(Debug, Clone)]
pub struct NumberingConfig {
    /// Prefix given to counters created for new tenants.
    pub default_prefix: String,
    /// Minimum digits of the zero-padded sequence part.
    pub pad_width: usize,
    /// First sequence number for new tenants.
    pub start_number: u64,
    /// Prefix of timestamp-derived fallback numbers.
    pub fallback_prefix: String,
    /// Upper bound on the whole counter store interaction of one allocation.
    pub timeout: Duration,
    /// Extra attempts after a lost compare-and-swap before falling back.
    pub conflict_retries: u32,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            default_prefix: DEFAULT_PREFIX.to_string(),
            pad_width: 3,
            start_number: 1,
            fallback_prefix: DEFAULT_PREFIX.to_string(),
            timeout: Duration::from_millis(2000),
            conflict_retries: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;

        let numbering = NumberingConfig {
            default_prefix: get_env("NUMBERING_PREFIX", Some(DEFAULT_PREFIX))?,
            pad_width: parse_env("NUMBERING_PAD_WIDTH", "3")?,
            start_number: parse_env("NUMBERING_START", "1")?,
            fallback_prefix: get_env("NUMBERING_FALLBACK_PREFIX", Some(DEFAULT_PREFIX))?,
            timeout: Duration::from_millis(parse_env("NUMBERING_TIMEOUT_MS", "2000")?),
            conflict_retries: parse_env("NUMBERING_CONFLICT_RETRIES", "1")?,
        };

        let database = match std::env::var("DATABASE_URL") {
            Ok(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10")?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1")?,
            }),
            Err(_) => None,
        };

        let config = EngineConfig {
            common,
            numbering,
            database,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        self.numbering.validate()?;

        if let Some(db) = &self.database {
            if db.max_connections == 0 {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "DATABASE_MAX_CONNECTIONS must be greater than 0"
                )));
            }
            if db.min_connections > db.max_connections {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "DATABASE_MIN_CONNECTIONS must not exceed DATABASE_MAX_CONNECTIONS"
                )));
            }
        }

        Ok(())
    }
}

impl NumberingConfig {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.default_prefix.trim().is_empty() || self.fallback_prefix.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Invoice number prefixes must not be empty"
            )));
        }

        if self.start_number == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "NUMBERING_START must be at least 1"
            )));
        }

        if self.pad_width == 0 || self.pad_width > 12 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "NUMBERING_PAD_WIDTH must be between 1 and 12"
            )));
        }

        if self.timeout.is_zero() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "NUMBERING_TIMEOUT_MS must be positive"
            )));
        }

        Ok(())
    }
}

//! PostgreSQL configuration

use std::time::Duration;
use thiserror::Error;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(String),

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

/// PostgreSQL connection and behavior configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Connection pool configuration
    pub pool: PoolConfig,
    /// Run embedded migrations when the store is opened
    pub run_migrations: bool,
}

impl PostgresConfig {
    /// Load configuration from environment variables
    ///
    /// Requires DATABASE_URL. `TUMBUH_DB_MAX_CONNECTIONS` and
    /// `TUMBUH_DB_AUTO_MIGRATE` are optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::Missing("DATABASE_URL".to_string()))?;

        let mut config = Self::new(database_url)?;

        if let Ok(raw) = std::env::var("TUMBUH_DB_MAX_CONNECTIONS") {
            config.pool.max_connections = raw.parse().map_err(|_| ConfigError::Invalid {
                key: "TUMBUH_DB_MAX_CONNECTIONS".to_string(),
                reason: format!("expected a positive integer, got '{}'", raw),
            })?;
        }

        if let Ok(raw) = std::env::var("TUMBUH_DB_AUTO_MIGRATE") {
            config.run_migrations = matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        config.validate()?;
        Ok(config)
    }

    /// Create a new configuration with the given database URL
    pub fn new(database_url: String) -> Result<Self, ConfigError> {
        if database_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database_url".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        Ok(Self { database_url, pool: PoolConfig::default(), run_migrations: true })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database_url".to_string(),
                reason: "cannot be empty".to_string(),
            });
        }

        self.pool.validate()?;

        Ok(())
    }
}

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Minimum number of connections to maintain
    pub min_connections: u32,
    /// Maximum number of connections allowed
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool
    pub acquire_timeout: Duration,
    /// Timeout for idle connections before they are closed
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl PoolConfig {
    /// Validate pool configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "pool.max_connections".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::Invalid {
                key: "pool.min_connections".to_string(),
                reason: format!(
                    "min_connections ({}) cannot be greater than max_connections ({})",
                    self.min_connections, self.max_connections
                ),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_valid() {
        let config = PostgresConfig::new("postgresql://localhost/tumbuh".to_string()).unwrap();
        assert!(config.run_migrations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_new_empty_url() {
        match PostgresConfig::new("  ".to_string()) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "database_url"),
            other => panic!("Expected Invalid error, got {:?}", other),
        }
    }

    #[test]
    fn test_pool_config_invalid_min_max() {
        let pool = PoolConfig { min_connections: 20, max_connections: 10, ..Default::default() };
        assert!(pool.validate().is_err());
    }

    #[test]
    fn test_pool_config_zero_max() {
        let pool = PoolConfig { min_connections: 0, max_connections: 0, ..Default::default() };
        assert!(pool.validate().is_err());
    }
}

//! PostgreSQL storage adapter implementation

pub mod area;
pub mod config;
pub mod migrations;

pub use config::{ConfigError, PoolConfig, PostgresConfig};
pub use migrations::{MigrationError, MigrationManager, MigrationStatus};

use sqlx::{postgres::PgPoolOptions, PgPool};
use tumbuh_core::error::{Result, TumbuhError};

/// PostgreSQL storage adapter
pub struct PostgresStore {
    pool: PgPool,
    config: PostgresConfig,
}

impl PostgresStore {
    /// Connect with the given configuration, running migrations when enabled
    pub async fn new(config: PostgresConfig) -> Result<Self> {
        config.validate().map_err(|e| TumbuhError::ConfigInvalid {
            key: "database_url".to_string(),
            reason: e.to_string(),
        })?;

        let pool = PgPoolOptions::new()
            .min_connections(config.pool.min_connections)
            .max_connections(config.pool.max_connections)
            .acquire_timeout(config.pool.acquire_timeout)
            .idle_timeout(config.pool.idle_timeout)
            .connect(&config.database_url)
            .await
            .map_err(|e| TumbuhError::Storage(format!("Failed to connect to database: {}", e)))?;

        let store = Self { pool, config };
        store.health_check().await?;

        if store.config.run_migrations {
            store.run_migrations().await?;
        }

        tracing::info!(
            max_connections = store.config.pool.max_connections,
            "Connected to PostgreSQL"
        );
        Ok(store)
    }

    /// Run all pending migrations
    pub async fn run_migrations(&self) -> Result<()> {
        MigrationManager::new(self.pool.clone())
            .run_migrations()
            .await
            .map_err(|e| TumbuhError::Storage(format!("Migration failed: {}", e)))
    }

    /// Check migration status
    pub async fn migration_status(&self) -> Result<Vec<MigrationStatus>> {
        MigrationManager::new(self.pool.clone()).check_status().await.map_err(|e| {
            TumbuhError::Storage(format!("Failed to check migration status: {}", e))
        })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Perform a health check on the database connection
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| TumbuhError::Storage(format!("Health check failed: {}", e)))?;
        Ok(())
    }
}

use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::database::memory::MemoryStore;
use crate::database::postgres::PgStore;
use crate::database::store::Store;

const SCHEMA_SQL: &str = include_str!("../../migrations/0001_grouplist.sql");

/// Errors from the storage layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Maps a unique-index violation to `Conflict`, leaving other failures as-is
    pub fn from_write(err: sqlx::Error, conflict_message: impl FnOnce() -> String) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DatabaseError::Conflict(conflict_message())
            }
            _ => DatabaseError::Sqlx(err),
        }
    }
}

/// Connection bootstrap and backend selection
pub struct DatabaseManager;

impl DatabaseManager {
    /// Open a PostgreSQL pool using the configured limits
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(pool)
    }

    /// Apply the idempotent schema (tables, unique indexes, format checks)
    pub async fn run_migrations(pool: &PgPool) -> Result<(), DatabaseError> {
        // Simple-query protocol so the multi-statement script runs in one call
        pool.execute(SCHEMA_SQL).await?;
        info!("Database schema is up to date");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(pool: &PgPool) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(pool).await?;
        Ok(())
    }

    /// PostgreSQL when a URL is configured, otherwise the in-process store
    pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn Store>, DatabaseError> {
        if config.url.is_none() {
            warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
            return Ok(Arc::new(MemoryStore::new()));
        }

        let pool = Self::connect(config).await?;
        if config.run_migrations {
            Self::run_migrations(&pool).await?;
        }
        Ok(Arc::new(PgStore::new(pool)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_requires_url() {
        let config = DatabaseConfig {
            url: None,
            max_connections: 1,
            connection_timeout: 1,
            run_migrations: false,
        };
        let err = DatabaseManager::connect(&config).await.unwrap_err();
        assert!(matches!(err, DatabaseError::ConfigMissing("DATABASE_URL")));
    }

    #[tokio::test]
    async fn open_store_falls_back_to_memory() {
        let config = DatabaseConfig {
            url: None,
            max_connections: 1,
            connection_timeout: 1,
            run_migrations: true,
        };
        let store = DatabaseManager::open_store(&config).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert!(store.ping().await.is_ok());
    }

    #[test]
    fn schema_declares_unique_indexes() {
        assert!(SCHEMA_SQL.contains("hes_code_region_subject_key"));
        assert!(SCHEMA_SQL.contains("exmrs_code_he_subject_region_key"));
    }
}

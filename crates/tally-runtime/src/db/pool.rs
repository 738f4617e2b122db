use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use tally_core::config::DatabaseConfig;
use tally_core::error::{Result, TallyError};

/// Connection pool for the database migrations run against.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Connect using the given configuration.
    pub async fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let pool = Self::pool_options(config)
            .connect(&config.url)
            .await
            .map_err(|e| TallyError::Database(format!("Failed to connect: {}", e)))?;

        Ok(Self { pool })
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(Duration::from_secs(config.pool_timeout_secs))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Type alias for the pool type.
pub type DatabasePool = PgPool;

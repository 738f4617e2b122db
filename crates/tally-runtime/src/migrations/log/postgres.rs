use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;

use tally_core::config::LogConfig;
use tally_core::error::{Result, TallyError};
use tally_core::migration::{LogEntry, MigrationId, MigrationLog};

/// Migration log kept in a table of the target database.
///
/// Application order is the order of the serial primary key, not the order
/// of migration names.
#[derive(Debug, Clone)]
pub struct PgMigrationLog {
    pool: PgPool,
    table: String,
}

impl PgMigrationLog {
    /// Create a log over `table`. The name is checked the same way as
    /// `log.table` in the configuration since it ends up inside SQL text.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        LogConfig {
            table: table.clone(),
            ..Default::default()
        }
        .validate()?;

        Ok(Self { pool, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn create_table_sql(&self) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                id BIGSERIAL PRIMARY KEY,
                name VARCHAR(255) UNIQUE NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
            self.table
        )
    }

    fn insert_sql(&self) -> String {
        format!(
            "INSERT INTO {} (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
            self.table
        )
    }

    fn delete_sql(&self) -> String {
        format!("DELETE FROM {} WHERE name = $1", self.table)
    }

    fn exists_sql(&self) -> String {
        format!("SELECT EXISTS (SELECT 1 FROM {} WHERE name = $1)", self.table)
    }

    fn select_sql(&self) -> String {
        format!("SELECT name, applied_at FROM {} ORDER BY id ASC", self.table)
    }
}

impl MigrationLog for PgMigrationLog {
    async fn prepare(&self) -> Result<()> {
        sqlx::query(&self.create_table_sql())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                TallyError::Database(format!("Failed to create migrations table: {}", e))
            })?;
        Ok(())
    }

    async fn append(&self, id: &MigrationId) -> Result<()> {
        let result = sqlx::query(&self.insert_sql())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                TallyError::Database(format!("Failed to record migration '{}': {}", id, e))
            })?;

        if result.rows_affected() == 0 {
            return Err(TallyError::AlreadyLogged(id.clone()));
        }
        Ok(())
    }

    async fn remove(&self, id: &MigrationId) -> Result<()> {
        let result = sqlx::query(&self.delete_sql())
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                TallyError::Database(format!("Failed to remove migration record: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(TallyError::NotLogged(id.clone()));
        }
        Ok(())
    }

    async fn list_applied(&self) -> Result<Vec<LogEntry>> {
        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(&self.select_sql())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                TallyError::Database(format!("Failed to get applied migrations: {}", e))
            })?;

        debug!("Found {} applied migrations", rows.len());
        Ok(rows
            .into_iter()
            .map(|(name, applied_at)| LogEntry {
                id: MigrationId::new(name),
                applied_at,
            })
            .collect())
    }

    async fn contains(&self, id: &MigrationId) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(&self.exists_sql())
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                TallyError::Database(format!("Failed to look up migration '{}': {}", id, e))
            })?;
        Ok(exists)
    }
}

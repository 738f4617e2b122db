mod file;
mod postgres;

pub use file::FileMigrationLog;
pub use postgres::PgMigrationLog;

use sqlx::PgPool;

use tally_core::config::{LogBackend, LogConfig};
use tally_core::error::Result;
use tally_core::migration::{LogEntry, MigrationId, MigrationLog};

/// The log backend chosen by configuration.
#[derive(Debug)]
pub enum ConfiguredLog {
    Database(PgMigrationLog),
    File(FileMigrationLog),
}

impl ConfiguredLog {
    pub fn from_config(config: &LogConfig, pool: &PgPool) -> Result<Self> {
        match config.backend {
            LogBackend::Database => Ok(Self::Database(PgMigrationLog::new(
                pool.clone(),
                config.table.clone(),
            )?)),
            LogBackend::File => Ok(Self::File(FileMigrationLog::new(config.path.clone()))),
        }
    }
}

impl MigrationLog for ConfiguredLog {
    async fn prepare(&self) -> Result<()> {
        match self {
            Self::Database(log) => log.prepare().await,
            Self::File(log) => log.prepare().await,
        }
    }

    async fn append(&self, id: &MigrationId) -> Result<()> {
        match self {
            Self::Database(log) => log.append(id).await,
            Self::File(log) => log.append(id).await,
        }
    }

    async fn remove(&self, id: &MigrationId) -> Result<()> {
        match self {
            Self::Database(log) => log.remove(id).await,
            Self::File(log) => log.remove(id).await,
        }
    }

    async fn list_applied(&self) -> Result<Vec<LogEntry>> {
        match self {
            Self::Database(log) => log.list_applied().await,
            Self::File(log) => log.list_applied().await,
        }
    }

    async fn contains(&self, id: &MigrationId) -> Result<bool> {
        match self {
            Self::Database(log) => log.contains(id).await,
            Self::File(log) => log.contains(id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn lazy_pool() -> PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/none")
            .unwrap()
    }

    #[tokio::test]
    async fn test_selects_backend() {
        let pool = lazy_pool();

        let database = ConfiguredLog::from_config(&LogConfig::default(), &pool).unwrap();
        assert!(matches!(database, ConfiguredLog::Database(ref log) if log.table() == "tally_migrations"));

        let file_config = LogConfig {
            backend: LogBackend::File,
            ..Default::default()
        };
        let file = ConfiguredLog::from_config(&file_config, &pool).unwrap();
        assert!(matches!(file, ConfiguredLog::File(_)));
    }

    #[tokio::test]
    async fn test_file_backend_delegates() {
        let dir = TempDir::new().unwrap();
        let config = LogConfig {
            backend: LogBackend::File,
            path: dir.path().join("log.json"),
            ..Default::default()
        };
        let log = ConfiguredLog::from_config(&config, &lazy_pool()).unwrap();

        log.prepare().await.unwrap();
        log.append(&MigrationId::new("20230101_a")).await.unwrap();

        let entries = log.list_applied().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id.as_str(), "20230101_a");
        assert!(log.contains(&MigrationId::new("20230101_a")).await.unwrap());
        assert!(!log.contains(&MigrationId::new("20230102_b")).await.unwrap());
    }
}

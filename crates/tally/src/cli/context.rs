use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use tally_core::config::{LoggingConfig, TallyConfig};
use tally_runtime::migrations::{ConfiguredLog, DirectorySource, Migrator};
use tally_runtime::{Database, DatabasePool};

use super::GlobalArgs;

pub type CliMigrator = Migrator<ConfiguredLog, DirectorySource<DatabasePool>>;

/// Configuration resolved from the config file and command-line overrides.
pub struct Project {
    config: Option<TallyConfig>,
    migrations_dir: PathBuf,
    logging: LoggingConfig,
}

impl Project {
    /// Load the configuration file, which must exist.
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        if !global.config.exists() {
            anyhow::bail!(
                "Configuration file not found: {}\nCreate one with a [database] url to get started.",
                global.config.display()
            );
        }

        let config = TallyConfig::from_file(&global.config)?;
        Ok(Self::from_config(Some(config), global))
    }

    /// Load the configuration file if there is one. Used by commands that
    /// never touch the database.
    pub fn load_or_default(global: &GlobalArgs) -> Result<Self> {
        let config = if global.config.exists() {
            Some(TallyConfig::from_file(&global.config)?)
        } else {
            None
        };
        Ok(Self::from_config(config, global))
    }

    fn from_config(config: Option<TallyConfig>, global: &GlobalArgs) -> Self {
        let migrations_dir = global
            .migrations_dir
            .clone()
            .or_else(|| config.as_ref().map(|c| c.migrations.dir.clone()))
            .unwrap_or_else(|| PathBuf::from("migrations"));
        let logging = config
            .as_ref()
            .map(|c| c.logging.clone())
            .unwrap_or_default();

        Self {
            config,
            migrations_dir,
            logging,
        }
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    /// Connect to the database and build a migrator with a ready log.
    pub async fn migrator(&self) -> Result<CliMigrator> {
        let Some(config) = &self.config else {
            anyhow::bail!("No configuration loaded");
        };

        debug!(backend = ?config.log.backend, "Connecting to database");
        let db = Database::from_config(&config.database).await?;
        let log = ConfiguredLog::from_config(&config.log, db.pool())?;
        let source = DirectorySource::new(&self.migrations_dir, db.pool().clone());

        let migrator = Migrator::new(log, source);
        migrator.prepare().await?;
        Ok(migrator)
    }
}

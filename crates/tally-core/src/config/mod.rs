mod database;
mod log;
mod observability;

pub use database::DatabaseConfig;
pub use log::{LogBackend, LogConfig};
pub use observability::LoggingConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, TallyError};

/// Root configuration, usually read from `tally.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TallyConfig {
    /// Database the migrations run against.
    pub database: DatabaseConfig,

    /// Where migration files live.
    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// Where the applied-migration log is kept.
    #[serde(default)]
    pub log: LogConfig,

    /// Diagnostic logging.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TallyConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| TallyError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let content = substitute_env_vars(content);

        let config: Self = toml::from_str(&content)
            .map_err(|e| TallyError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration with defaults for everything but the database URL.
    pub fn default_with_database_url(url: &str) -> Self {
        Self {
            database: DatabaseConfig {
                url: url.to_string(),
                ..Default::default()
            },
            migrations: MigrationsConfig::default(),
            log: LogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(TallyError::Config("database.url must not be empty".into()));
        }
        self.log.validate()
    }
}

/// Migration file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationsConfig {
    /// Directory holding `<id>.sql` files.
    #[serde(default = "default_migrations_dir")]
    pub dir: PathBuf,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            dir: default_migrations_dir(),
        }
    }
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid pattern");

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, TallyError};

/// Storage used for the applied-migration log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogBackend {
    /// A table in the target database.
    #[default]
    Database,
    /// A JSON document on local disk.
    File,
}

/// Applied-migration log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub backend: LogBackend,

    /// Table name for the database backend.
    #[serde(default = "default_table")]
    pub table: String,

    /// Document path for the file backend.
    #[serde(default = "default_path")]
    pub path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            backend: LogBackend::default(),
            table: default_table(),
            path: default_path(),
        }
    }
}

impl LogConfig {
    /// The table name is interpolated into SQL, so only plain identifiers pass.
    pub fn validate(&self) -> Result<()> {
        let mut chars = self.table.chars();
        let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            && self.table.len() <= 63;

        if !valid {
            return Err(TallyError::Config(format!(
                "log.table '{}' is not a valid SQL identifier",
                self.table
            )));
        }
        Ok(())
    }
}

fn default_table() -> String {
    "tally_migrations".to_string()
}

fn default_path() -> PathBuf {
    PathBuf::from(".tally/migrations.json")
}

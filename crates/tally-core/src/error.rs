use thiserror::Error;

use crate::migration::MigrationId;

/// Core error type for tally operations.
#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Migration {0} is already logged as applied")]
    AlreadyLogged(MigrationId),

    #[error("Migration {0} is not logged as applied")]
    NotLogged(MigrationId),

    #[error("Migration {0} was not found")]
    UnitNotFound(MigrationId),

    #[error("Migration {id} failed to apply: {cause}")]
    ApplyFailed {
        id: MigrationId,
        #[source]
        cause: Box<TallyError>,
    },

    #[error("Migration {id} failed to roll back: {cause}")]
    RevertFailed {
        id: MigrationId,
        #[source]
        cause: Box<TallyError>,
    },

    #[error("Invalid migration: {0}")]
    InvalidMigration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TallyError {
    /// Wrap a unit failure raised while applying `id`.
    pub fn apply_failed(id: &MigrationId, cause: TallyError) -> Self {
        TallyError::ApplyFailed {
            id: id.clone(),
            cause: Box::new(cause),
        }
    }

    /// Wrap a unit failure raised while reverting `id`.
    pub fn revert_failed(id: &MigrationId, cause: TallyError) -> Self {
        TallyError::RevertFailed {
            id: id.clone(),
            cause: Box::new(cause),
        }
    }
}

impl From<serde_json::Error> for TallyError {
    fn from(e: serde_json::Error) -> Self {
        TallyError::Serialization(e.to_string())
    }
}

/// Result type alias using TallyError.
pub type Result<T> = std::result::Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_apply_failed_keeps_cause() {
        let id = MigrationId::new("20230101_a");
        let err = TallyError::apply_failed(&id, TallyError::Database("syntax error".into()));

        assert_eq!(
            err.to_string(),
            "Migration 20230101_a failed to apply: Database error: syntax error"
        );
        let source = err.source().unwrap();
        assert_eq!(source.to_string(), "Database error: syntax error");
    }

    #[test]
    fn test_not_logged_message() {
        let err = TallyError::NotLogged(MigrationId::new("20230102_b"));
        assert_eq!(err.to_string(), "Migration 20230102_b is not logged as applied");
    }
}

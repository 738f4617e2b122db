pub mod config;
pub mod error;
pub mod migration;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::TallyConfig;
pub use error::{Result, TallyError};
pub use migration::{
    AppliedMigration, AssumeYes, Confirm, LogEntry, MigrationId, MigrationLog, MigrationSource,
    MigrationStatus, MigrationUnit, RollbackKind, RollbackOptions, RollbackOutcome,
};

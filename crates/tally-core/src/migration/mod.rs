//! Migration identifiers, log entries and the seams the migrator is built on.

mod rollback;
mod traits;

pub use rollback::{AssumeYes, Confirm, RollbackKind, RollbackOptions, RollbackOutcome};
pub use traits::{MigrationLog, MigrationSource, MigrationUnit};

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sortable name of a migration unit, e.g. `20230101_120000_create_users`.
///
/// Ordering is byte-wise on the underlying string, which matches the
/// chronological order of timestamp-prefixed names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationId(String);

impl MigrationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MigrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MigrationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for MigrationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One applied migration as recorded in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: MigrationId,
    pub applied_at: DateTime<Utc>,
}

impl LogEntry {
    /// Entry stamped with the current time.
    pub fn now(id: MigrationId) -> Self {
        Self {
            id,
            applied_at: Utc::now(),
        }
    }
}

/// An applied migration together with whether its file still exists.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    pub entry: LogEntry,
    pub file_exists: bool,
}

/// Snapshot of applied and pending migrations.
#[derive(Debug, Clone, Default)]
pub struct MigrationStatus {
    /// Applied migrations, oldest first.
    pub applied: Vec<AppliedMigration>,
    /// Pending migrations in canonical order.
    pub pending: Vec<MigrationId>,
}

impl MigrationStatus {
    /// Applied migrations whose file has been removed.
    pub fn missing_files(&self) -> impl Iterator<Item = &MigrationId> {
        self.applied
            .iter()
            .filter(|m| !m.file_exists)
            .map(|m| &m.entry.id)
    }
}

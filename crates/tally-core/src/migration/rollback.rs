use super::MigrationId;
use crate::error::Result;

/// Flags accepted by a rollback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RollbackOptions {
    /// Unlog without running the migration's revert action.
    pub hard: bool,
    /// Delete the migration file once the rollback succeeded.
    pub delete: bool,
}

/// How the last migration was taken off the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackKind {
    /// The revert action ran, then the entry was removed.
    Reverted,
    /// The file was missing and the operator agreed to unlog it.
    MarkedRolledBack,
    /// Unlogged on request without running anything.
    Hard,
}

/// Result of a single rollback invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The log was empty.
    NothingToRollback,
    RolledBack {
        id: MigrationId,
        kind: RollbackKind,
        file_deleted: bool,
    },
    /// The operator declined; nothing was changed.
    Aborted { id: MigrationId },
}

impl RollbackOutcome {
    pub fn is_aborted(&self) -> bool {
        matches!(self, RollbackOutcome::Aborted { .. })
    }
}

/// Asks the operator to approve an action. Blocks until an answer is given.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> Result<bool>;
}

/// Approves everything. Used for non-interactive runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

use std::future::Future;

use super::{LogEntry, MigrationId};
use crate::error::Result;

/// Ordered record of applied migrations.
///
/// Implementations must list entries in the order they were appended, which
/// is not necessarily the sort order of their identifiers.
pub trait MigrationLog: Send + Sync {
    /// Create whatever backing storage the log needs. Safe to call repeatedly.
    fn prepare(&self) -> impl Future<Output = Result<()>> + Send {
        async { Ok(()) }
    }

    /// Record `id` at the end of the log.
    ///
    /// Fails with [`TallyError::AlreadyLogged`](crate::TallyError::AlreadyLogged)
    /// if `id` is already present.
    fn append(&self, id: &MigrationId) -> impl Future<Output = Result<()>> + Send;

    /// Delete the entry for `id`.
    ///
    /// Fails with [`TallyError::NotLogged`](crate::TallyError::NotLogged) if
    /// `id` is absent.
    fn remove(&self, id: &MigrationId) -> impl Future<Output = Result<()>> + Send;

    /// All entries, oldest first.
    fn list_applied(&self) -> impl Future<Output = Result<Vec<LogEntry>>> + Send;

    fn contains(&self, id: &MigrationId) -> impl Future<Output = Result<bool>> + Send {
        async move {
            let applied = self.list_applied().await?;
            Ok(applied.iter().any(|entry| &entry.id == id))
        }
    }
}

/// An executable migration: a forward action and its inverse.
pub trait MigrationUnit: Send + Sync {
    fn id(&self) -> &MigrationId;

    fn apply(&self) -> impl Future<Output = Result<()>> + Send;

    fn revert(&self) -> impl Future<Output = Result<()>> + Send;
}

/// Where migration units come from.
pub trait MigrationSource: Send + Sync {
    type Unit: MigrationUnit;

    /// Every known identifier in canonical order.
    fn list_available(&self) -> Result<Vec<MigrationId>>;

    /// Whether a unit can still be resolved for `id`.
    fn exists(&self, id: &MigrationId) -> bool;

    /// Load the unit for `id`, failing with
    /// [`TallyError::UnitNotFound`](crate::TallyError::UnitNotFound) when it
    /// does not exist.
    fn resolve(&self, id: &MigrationId) -> Result<Self::Unit>;

    /// Remove the backing unit. Returns `false` when there was nothing to remove.
    fn delete_unit(&self, id: &MigrationId) -> Result<bool>;
}

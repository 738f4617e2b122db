//! Migration orchestration.
//!
//! The [`Migrator`] is the only component that touches both the log and the
//! migration source. It decides what is pending and what was applied last,
//! runs forward and reverse actions, and reconciles a logged migration whose
//! file has disappeared, but only with the operator's consent.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use tally_core::error::{Result, TallyError};
use tally_core::migration::{
    AppliedMigration, Confirm, LogEntry, MigrationId, MigrationLog, MigrationSource,
    MigrationStatus, MigrationUnit, RollbackKind, RollbackOptions, RollbackOutcome,
};

/// Drives migrations between a log and a source.
pub struct Migrator<L, S> {
    log: L,
    source: S,
}

impl<L: MigrationLog, S: MigrationSource> Migrator<L, S> {
    pub fn new(log: L, source: S) -> Self {
        Self { log, source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Make sure the log's backing storage exists.
    pub async fn prepare(&self) -> Result<()> {
        self.log.prepare().await
    }

    /// Identifiers from the log, oldest first.
    ///
    /// Not checked against the source; callers compare the two themselves.
    pub async fn get_ran_migrations(&self) -> Result<Vec<MigrationId>> {
        Ok(self
            .log
            .list_applied()
            .await?
            .into_iter()
            .map(|entry| entry.id)
            .collect())
    }

    /// Available identifiers that are not in the log, in canonical order.
    pub async fn get_pending_migrations(&self) -> Result<Vec<MigrationId>> {
        let ran: HashSet<MigrationId> = self.get_ran_migrations().await?.into_iter().collect();
        let pending = self
            .source
            .list_available()?
            .into_iter()
            .filter(|id| !ran.contains(id))
            .collect::<Vec<_>>();

        debug!("{} pending migrations", pending.len());
        Ok(pending)
    }

    /// Apply one migration and log it.
    ///
    /// Nothing is logged if `apply()` fails. Already-logged identifiers are
    /// refused before the unit runs.
    pub async fn run_migration(&self, id: &MigrationId) -> Result<()> {
        if self.log.contains(id).await? {
            return Err(TallyError::AlreadyLogged(id.clone()));
        }
        if let Some(newest) = self.get_ran_migrations().await?.iter().max() {
            if id < newest {
                warn!(migration = %id, newest = %newest, "Applying migration out of order");
            }
        }

        let unit = self.source.resolve(id)?;

        info!(migration = %id, "Applying migration");
        unit.apply()
            .await
            .map_err(|e| TallyError::apply_failed(id, e))?;

        self.log.append(unit.id()).await?;
        info!(migration = %id, "Migration applied");
        Ok(())
    }

    /// Apply every pending migration in order, stopping at the first failure.
    ///
    /// `on_applied` is called after each migration is logged. Migrations
    /// applied before a failure stay logged.
    pub async fn run_pending<F>(&self, mut on_applied: F) -> Result<Vec<MigrationId>>
    where
        F: FnMut(&MigrationId),
    {
        let mut applied = Vec::new();
        for id in self.get_pending_migrations().await? {
            self.run_migration(&id).await?;
            on_applied(&id);
            applied.push(id);
        }
        Ok(applied)
    }

    /// Run the migration's revert action and unlog it.
    ///
    /// The log entry stays if `revert()` fails.
    pub async fn rollback_migration(&self, id: &MigrationId) -> Result<()> {
        if !self.source.exists(id) {
            return Err(TallyError::UnitNotFound(id.clone()));
        }
        let unit = self.source.resolve(id)?;

        info!(migration = %id, "Rolling back migration");
        unit.revert()
            .await
            .map_err(|e| TallyError::revert_failed(id, e))?;

        self.log.remove(id).await?;
        info!(migration = %id, "Migration rolled back");
        Ok(())
    }

    pub fn does_migration_file_exist(&self, id: &MigrationId) -> bool {
        self.source.exists(id)
    }

    /// Unlog without running anything.
    pub async fn remove_successful_migration_from_log(&self, id: &MigrationId) -> Result<()> {
        self.log.remove(id).await?;
        info!(migration = %id, "Removed migration from log");
        Ok(())
    }

    /// Delete the migration's file. `false` means it was already gone.
    pub fn delete_migration_file(&self, id: &MigrationId) -> Result<bool> {
        self.source.delete_unit(id)
    }

    /// Roll back the most recently applied migration.
    ///
    /// - `hard` unlogs it without running its revert action.
    /// - Otherwise the revert action runs when the file exists; when it does
    ///   not, `confirm` decides whether to unlog it anyway.
    /// - `delete` then removes the file. A failed delete is only logged.
    ///
    /// A declined confirmation returns [`RollbackOutcome::Aborted`] with the
    /// log and files untouched.
    pub async fn rollback_last<C>(
        &self,
        options: RollbackOptions,
        confirm: &C,
    ) -> Result<RollbackOutcome>
    where
        C: Confirm + ?Sized,
    {
        let ran = self.get_ran_migrations().await?;
        let Some(last) = ran.last().cloned() else {
            info!("Nothing to rollback");
            return Ok(RollbackOutcome::NothingToRollback);
        };

        let kind = if options.hard {
            self.remove_successful_migration_from_log(&last).await?;
            RollbackKind::Hard
        } else if self.does_migration_file_exist(&last) {
            self.rollback_migration(&last).await?;
            RollbackKind::Reverted
        } else {
            let prompt = format!(
                "Migration {} was not found. Do you want to mark it as rolled back?",
                last
            );
            if !confirm.confirm(&prompt)? {
                info!(migration = %last, "Rollback aborted by operator");
                return Ok(RollbackOutcome::Aborted { id: last });
            }
            self.remove_successful_migration_from_log(&last).await?;
            RollbackKind::MarkedRolledBack
        };

        let file_deleted = options.delete && self.delete_file_quietly(&last);

        Ok(RollbackOutcome::RolledBack {
            id: last,
            kind,
            file_deleted,
        })
    }

    fn delete_file_quietly(&self, id: &MigrationId) -> bool {
        match self.delete_migration_file(id) {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(migration = %id, error = %e, "Failed to delete migration file");
                false
            }
        }
    }

    /// Applied migrations with their file state, plus pending ones.
    pub async fn status(&self) -> Result<MigrationStatus> {
        let entries: Vec<LogEntry> = self.log.list_applied().await?;
        let ran: HashSet<&MigrationId> = entries.iter().map(|e| &e.id).collect();

        let pending = self
            .source
            .list_available()?
            .into_iter()
            .filter(|id| !ran.contains(id))
            .collect();

        let applied = entries
            .iter()
            .map(|entry| AppliedMigration {
                file_exists: self.source.exists(&entry.id),
                entry: entry.clone(),
            })
            .collect();

        Ok(MigrationStatus { applied, pending })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::testing::{InMemoryLog, InMemorySource, ScriptedConfirm, UnitCall};

    fn id(s: &str) -> MigrationId {
        MigrationId::new(s)
    }

    fn migrator(
        log: &InMemoryLog,
        source: &InMemorySource,
    ) -> Migrator<InMemoryLog, InMemorySource> {
        Migrator::new(log.clone(), source.clone())
    }

    const SOFT: RollbackOptions = RollbackOptions {
        hard: false,
        delete: false,
    };

    #[tokio::test]
    async fn test_pending_excludes_ran_and_keeps_order() {
        let log = InMemoryLog::with_applied(["20230102_b"]);
        let source = InMemorySource::new()
            .with_unit("20230103_c")
            .with_unit("20230101_a")
            .with_unit("20230102_b");
        let migrator = migrator(&log, &source);

        let pending = migrator.get_pending_migrations().await.unwrap();
        assert_eq!(pending, vec![id("20230101_a"), id("20230103_c")]);
    }

    #[tokio::test]
    async fn test_ran_migrations_include_missing_files() {
        let log = InMemoryLog::with_applied(["20230101_a", "20230102_b"]);
        let source = InMemorySource::new().with_unit("20230101_a");
        let migrator = migrator(&log, &source);

        let ran = migrator.get_ran_migrations().await.unwrap();
        assert_eq!(ran, vec![id("20230101_a"), id("20230102_b")]);
    }

    #[tokio::test]
    async fn test_run_migration_logs_on_success() {
        let log = InMemoryLog::new();
        let source = InMemorySource::new().with_unit("20230101_a");
        let migrator = migrator(&log, &source);

        migrator.run_migration(&id("20230101_a")).await.unwrap();

        assert_eq!(log.ids(), vec!["20230101_a"]);
        assert_eq!(source.applied("20230101_a"), 1);
    }

    #[tokio::test]
    async fn test_run_migration_failure_logs_nothing() {
        let log = InMemoryLog::new();
        let source = InMemorySource::new().with_failing_apply("20230101_a", "syntax error");
        let migrator = migrator(&log, &source);

        let err = migrator.run_migration(&id("20230101_a")).await.unwrap_err();

        match err {
            TallyError::ApplyFailed { id: failed, cause } => {
                assert_eq!(failed, id("20230101_a"));
                assert_eq!(cause.to_string(), "Database error: syntax error");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(log.ids().is_empty());
    }

    #[tokio::test]
    async fn test_run_migration_refuses_logged_id_without_applying() {
        let log = InMemoryLog::with_applied(["20230101_a"]);
        let source = InMemorySource::new().with_unit("20230101_a");
        let migrator = migrator(&log, &source);

        let result = migrator.run_migration(&id("20230101_a")).await;

        assert!(matches!(result, Err(TallyError::AlreadyLogged(_))));
        assert_eq!(source.applied("20230101_a"), 0);
    }

    #[tokio::test]
    async fn test_run_migration_asks_log_about_the_id() {
        let log = InMemoryLog::with_applied(["20230101_a"]);
        let source = InMemorySource::new()
            .with_unit("20230101_a")
            .with_unit("20230102_b");
        let migrator = migrator(&log, &source);

        let result = migrator.run_migration(&id("20230101_a")).await;
        assert!(matches!(result, Err(TallyError::AlreadyLogged(_))));

        migrator.run_migration(&id("20230102_b")).await.unwrap();

        assert_eq!(log.lookups(), vec![id("20230101_a"), id("20230102_b")]);
        assert_eq!(log.ids(), vec!["20230101_a", "20230102_b"]);
    }

    #[tokio::test]
    async fn test_run_migration_unknown_unit() {
        let migrator = migrator(&InMemoryLog::new(), &InMemorySource::new());
        let result = migrator.run_migration(&id("20230101_a")).await;
        assert!(matches!(result, Err(TallyError::UnitNotFound(_))));
    }

    #[tokio::test]
    async fn test_run_pending_stops_at_first_failure() {
        let log = InMemoryLog::new();
        let source = InMemorySource::new()
            .with_unit("20230101_a")
            .with_failing_apply("20230102_b", "boom")
            .with_unit("20230103_c");
        let migrator = migrator(&log, &source);

        let mut reported = Vec::new();
        let result = migrator.run_pending(|id| reported.push(id.clone())).await;

        assert!(matches!(result, Err(TallyError::ApplyFailed { .. })));
        assert_eq!(reported, vec![id("20230101_a")]);
        assert_eq!(log.ids(), vec!["20230101_a"]);
        assert_eq!(source.applied("20230103_c"), 0);
    }

    #[tokio::test]
    async fn test_run_pending_applies_in_order() {
        let log = InMemoryLog::new();
        let source = InMemorySource::new()
            .with_unit("20230102_b")
            .with_unit("20230101_a");
        let migrator = migrator(&log, &source);

        let mut reported = Vec::new();
        let applied = migrator
            .run_pending(|id| reported.push(id.clone()))
            .await
            .unwrap();

        assert_eq!(reported, applied);

        assert_eq!(applied, vec![id("20230101_a"), id("20230102_b")]);
        assert_eq!(
            source.calls(),
            vec![UnitCall::Apply(id("20230101_a")), UnitCall::Apply(id("20230102_b"))]
        );
    }

    #[tokio::test]
    async fn test_run_then_rollback_round_trip() {
        let log = InMemoryLog::with_applied(["20230101_a"]);
        let source = InMemorySource::new()
            .with_unit("20230101_a")
            .with_unit("20230102_b");
        let migrator = migrator(&log, &source);
        let before = migrator.get_ran_migrations().await.unwrap();

        migrator.run_migration(&id("20230102_b")).await.unwrap();
        migrator.rollback_migration(&id("20230102_b")).await.unwrap();

        assert_eq!(migrator.get_ran_migrations().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_revert_failure_keeps_entry() {
        let log = InMemoryLog::with_applied(["20230101_a"]);
        let source = InMemorySource::new().with_failing_revert("20230101_a", "locked");
        let migrator = migrator(&log, &source);

        let result = migrator.rollback_migration(&id("20230101_a")).await;

        assert!(matches!(result, Err(TallyError::RevertFailed { .. })));
        assert_eq!(log.ids(), vec!["20230101_a"]);
    }

    #[tokio::test]
    async fn test_rollback_migration_requires_file() {
        let log = InMemoryLog::with_applied(["20230101_a"]);
        let migrator = migrator(&log, &InMemorySource::new());

        let result = migrator.rollback_migration(&id("20230101_a")).await;

        assert!(matches!(result, Err(TallyError::UnitNotFound(_))));
        assert_eq!(log.ids(), vec!["20230101_a"]);
    }

    #[tokio::test]
    async fn test_remove_from_log_skips_revert() {
        let log = InMemoryLog::with_applied(["20230101_a"]);
        let source = InMemorySource::new().with_failing_revert("20230101_a", "would throw");
        let migrator = migrator(&log, &source);

        migrator
            .remove_successful_migration_from_log(&id("20230101_a"))
            .await
            .unwrap();

        assert!(log.ids().is_empty());
        assert_eq!(source.reverted("20230101_a"), 0);
    }

    #[tokio::test]
    async fn test_remove_from_log_requires_entry() {
        let migrator = migrator(&InMemoryLog::new(), &InMemorySource::new());
        let result = migrator
            .remove_successful_migration_from_log(&id("20230101_a"))
            .await;
        assert!(matches!(result, Err(TallyError::NotLogged(_))));
    }

    #[tokio::test]
    async fn test_delete_migration_file_twice() {
        let source = InMemorySource::new().with_unit("20230101_a");
        let migrator = migrator(&InMemoryLog::new(), &source);

        assert!(migrator.delete_migration_file(&id("20230101_a")).unwrap());
        assert!(!migrator.delete_migration_file(&id("20230101_a")).unwrap());
    }

    #[tokio::test]
    async fn test_rollback_last_with_empty_log() {
        let migrator = migrator(&InMemoryLog::new(), &InMemorySource::new());
        let confirm = ScriptedConfirm::yes();

        let outcome = migrator.rollback_last(SOFT, &confirm).await.unwrap();

        assert_eq!(outcome, RollbackOutcome::NothingToRollback);
        assert!(confirm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_last_targets_application_order() {
        // Applied out of name order: the newest entry sorts first.
        let log = InMemoryLog::with_applied(["20230102_b", "20230103_c", "20230101_a"]);
        let source = InMemorySource::new()
            .with_unit("20230101_a")
            .with_unit("20230102_b")
            .with_unit("20230103_c");
        let migrator = migrator(&log, &source);

        let outcome = migrator
            .rollback_last(SOFT, &ScriptedConfirm::no())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RollbackOutcome::RolledBack {
                id: id("20230101_a"),
                kind: RollbackKind::Reverted,
                file_deleted: false,
            }
        );
        assert_eq!(log.ids(), vec!["20230102_b", "20230103_c"]);
        assert_eq!(source.calls(), vec![UnitCall::Revert(id("20230101_a"))]);
    }

    #[tokio::test]
    async fn test_rollback_last_revert_failure_propagates() {
        let log = InMemoryLog::with_applied(["20230101_a"]);
        let source = InMemorySource::new().with_failing_revert("20230101_a", "locked");
        let migrator = migrator(&log, &source);
        let options = RollbackOptions {
            hard: false,
            delete: true,
        };

        let result = migrator.rollback_last(options, &ScriptedConfirm::yes()).await;

        assert!(matches!(result, Err(TallyError::RevertFailed { .. })));
        assert_eq!(log.ids(), vec!["20230101_a"]);
        assert!(source.exists(&id("20230101_a")));
    }

    #[tokio::test]
    async fn test_rollback_last_missing_file_confirmed() {
        let log = InMemoryLog::with_applied(["20230101_a", "20230102_b"]);
        let source = InMemorySource::new().with_unit("20230101_a");
        let migrator = migrator(&log, &source);
        let confirm = ScriptedConfirm::yes();

        let outcome = migrator.rollback_last(SOFT, &confirm).await.unwrap();

        assert_eq!(
            outcome,
            RollbackOutcome::RolledBack {
                id: id("20230102_b"),
                kind: RollbackKind::MarkedRolledBack,
                file_deleted: false,
            }
        );
        assert_eq!(log.ids(), vec!["20230101_a"]);
        assert!(source.exists(&id("20230101_a")));
        assert!(source.calls().is_empty());
        assert_eq!(confirm.prompts().len(), 1);
        assert!(confirm.prompts()[0].contains("20230102_b"));
    }

    #[tokio::test]
    async fn test_rollback_last_missing_file_declined() {
        let log = InMemoryLog::with_applied(["20230101_a", "20230102_b"]);
        let source = InMemorySource::new().with_unit("20230101_a");
        let migrator = migrator(&log, &source);
        let options = RollbackOptions {
            hard: false,
            delete: true,
        };

        let outcome = migrator
            .rollback_last(options, &ScriptedConfirm::no())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RollbackOutcome::Aborted {
                id: id("20230102_b")
            }
        );
        assert_eq!(log.ids(), vec!["20230101_a", "20230102_b"]);
        assert!(source.exists(&id("20230101_a")));
    }

    #[tokio::test]
    async fn test_rollback_last_hard_with_delete() {
        let log = InMemoryLog::with_applied(["20230101_a"]);
        let source = InMemorySource::new().with_failing_revert("20230101_a", "would throw");
        let migrator = migrator(&log, &source);
        let confirm = ScriptedConfirm::no();
        let options = RollbackOptions {
            hard: true,
            delete: true,
        };

        let outcome = migrator.rollback_last(options, &confirm).await.unwrap();

        assert_eq!(
            outcome,
            RollbackOutcome::RolledBack {
                id: id("20230101_a"),
                kind: RollbackKind::Hard,
                file_deleted: true,
            }
        );
        assert!(log.ids().is_empty());
        assert!(!source.exists(&id("20230101_a")));
        assert_eq!(source.reverted("20230101_a"), 0);
        assert!(confirm.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_last_delete_of_missing_file_is_not_fatal() {
        let log = InMemoryLog::with_applied(["20230101_a"]);
        let migrator = migrator(&log, &InMemorySource::new());
        let options = RollbackOptions {
            hard: false,
            delete: true,
        };

        let outcome = migrator
            .rollback_last(options, &ScriptedConfirm::yes())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RollbackOutcome::RolledBack {
                id: id("20230101_a"),
                kind: RollbackKind::MarkedRolledBack,
                file_deleted: false,
            }
        );
        assert!(log.ids().is_empty());
    }

    #[tokio::test]
    async fn test_status_reports_missing_files_and_pending() {
        let log = InMemoryLog::with_applied(["20230101_a", "20230102_b"]);
        let source = InMemorySource::new()
            .with_unit("20230101_a")
            .with_unit("20230103_c");
        let migrator = migrator(&log, &source);

        let status = migrator.status().await.unwrap();

        assert_eq!(status.applied.len(), 2);
        assert!(status.applied[0].file_exists);
        assert!(!status.applied[1].file_exists);
        assert_eq!(status.pending, vec![id("20230103_c")]);
        assert_eq!(status.missing_files().collect::<Vec<_>>(), vec![&id("20230102_b")]);
    }
}

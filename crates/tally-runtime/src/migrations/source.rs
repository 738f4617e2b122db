use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use tally_core::error::{Result, TallyError};
use tally_core::migration::{MigrationId, MigrationSource, MigrationUnit};

use super::sql::{SqlExecutor, SqlScript};

const EXTENSION: &str = "sql";

/// Migrations stored as `<id>.sql` files in one directory.
///
/// Files are sorted by name, so identifiers should carry a timestamp prefix
/// such as `20230101_120000_create_users`.
#[derive(Debug, Clone)]
pub struct DirectorySource<E> {
    dir: PathBuf,
    executor: E,
}

impl<E: SqlExecutor> DirectorySource<E> {
    pub fn new(dir: impl Into<PathBuf>, executor: E) -> Self {
        Self {
            dir: dir.into(),
            executor,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `id`, whether or not it exists.
    pub fn path_for(&self, id: &MigrationId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, EXTENSION))
    }
}

impl<E: SqlExecutor> MigrationSource for DirectorySource<E> {
    type Unit = SqlMigration<E>;

    fn list_available(&self) -> Result<Vec<MigrationId>> {
        if !self.dir.exists() {
            debug!("Migrations directory does not exist: {:?}", self.dir);
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();

            if !path.is_file() || path.extension().map(|e| e != EXTENSION).unwrap_or(true) {
                continue;
            }

            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| {
                    TallyError::InvalidMigration(format!("Invalid migration filename: {:?}", path))
                })?;
            ids.push(MigrationId::new(name));
        }

        ids.sort();
        debug!("Found {} migration files", ids.len());
        Ok(ids)
    }

    fn exists(&self, id: &MigrationId) -> bool {
        self.path_for(id).is_file()
    }

    fn resolve(&self, id: &MigrationId) -> Result<SqlMigration<E>> {
        let content = match std::fs::read_to_string(self.path_for(id)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(TallyError::UnitNotFound(id.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(SqlMigration {
            id: id.clone(),
            script: SqlScript::parse(&content),
            executor: self.executor.clone(),
        })
    }

    fn delete_unit(&self, id: &MigrationId) -> Result<bool> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => {
                info!(migration = %id, "Deleted migration file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// A migration loaded from a SQL file.
#[derive(Debug, Clone)]
pub struct SqlMigration<E> {
    id: MigrationId,
    script: SqlScript,
    executor: E,
}

impl<E: SqlExecutor> MigrationUnit for SqlMigration<E> {
    fn id(&self) -> &MigrationId {
        &self.id
    }

    async fn apply(&self) -> Result<()> {
        self.executor.execute_script(&self.script.up).await
    }

    async fn revert(&self) -> Result<()> {
        if !self.script.is_reversible() {
            return Err(TallyError::InvalidMigration(format!(
                "{} has no down section",
                self.id
            )));
        }
        self.executor.execute_script(&self.script.down).await
    }
}

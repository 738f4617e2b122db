use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tracing::info;

use tally_core::error::{Result, TallyError};
use tally_core::migration::MigrationId;

/// Creates empty migration files named after the current time.
pub struct MigrationGenerator {
    /// Output directory for migrations.
    output_dir: PathBuf,
}

impl MigrationGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Describe a new migration called `name`, stamped with `now`.
    pub fn generate(&self, name: &str, now: DateTime<Utc>) -> Result<NewMigration> {
        let slug = slugify(name);
        if slug.is_empty() {
            return Err(TallyError::InvalidMigration(format!(
                "'{}' is not a usable migration name",
                name
            )));
        }

        let id = MigrationId::new(format!("{}_{}", now.format("%Y%m%d_%H%M%S"), slug));
        let path = self.output_dir.join(format!("{}.sql", id));

        Ok(NewMigration {
            id,
            name: name.trim().to_string(),
            created_at: now,
            path,
        })
    }

    /// Write the migration skeleton to disk. Existing files are never replaced.
    pub fn write_migration(&self, migration: &NewMigration) -> Result<()> {
        std::fs::create_dir_all(&self.output_dir)?;

        if migration.path.exists() {
            return Err(TallyError::InvalidMigration(format!(
                "{} already exists",
                migration.path.display()
            )));
        }

        let content = format!(
            "-- Migration: {}\n-- Created at: {}\n\n-- @up\n\n\n-- @down\n\n",
            migration.name,
            migration.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
        );

        std::fs::write(&migration.path, content)?;
        info!(migration = %migration.id, "Created migration file");
        Ok(())
    }

    /// Generate and write in one step.
    pub fn create(&self, name: &str) -> Result<NewMigration> {
        let migration = self.generate(name, Utc::now())?;
        self.write_migration(&migration)?;
        Ok(migration)
    }
}

/// A freshly generated migration file.
#[derive(Debug, Clone)]
pub struct NewMigration {
    pub id: MigrationId,
    /// Name as given by the user.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub path: PathBuf,
}

fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    slug.trim_end_matches('_').to_string()
}

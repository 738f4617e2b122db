pub mod db;
pub mod migrations;

pub use db::{Database, DatabasePool};
pub use migrations::{
    ConfiguredLog, DirectorySource, MigrationGenerator, Migrator, PgMigrationLog, SqlExecutor,
};

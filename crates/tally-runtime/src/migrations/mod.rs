mod generator;
mod log;
mod migrator;
mod source;
mod sql;

pub use generator::{MigrationGenerator, NewMigration};
pub use log::{ConfiguredLog, FileMigrationLog, PgMigrationLog};
pub use migrator::Migrator;
pub use source::{DirectorySource, SqlMigration};
pub use sql::{split_sql_statements, SqlExecutor, SqlScript};

//! In-memory fakes for exercising the migrator without a database or disk.
//!
//! Enabled with the `testing` feature.
//!
//! # Example
//!
//! ```ignore
//! let log = InMemoryLog::with_applied(["20230101_a"]);
//! let source = InMemorySource::new().with_unit("20230101_a");
//! let migrator = Migrator::new(log.clone(), source.clone());
//!
//! migrator.rollback_migration(&"20230101_a".into()).await?;
//! assert!(log.ids().is_empty());
//! assert_eq!(source.reverted("20230101_a"), 1);
//! ```

mod confirm;
mod log;
mod source;

pub use confirm::ScriptedConfirm;
pub use log::InMemoryLog;
pub use source::{InMemorySource, ScriptedUnit, UnitCall};

mod pool;

pub use pool::{Database, DatabasePool};

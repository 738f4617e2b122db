use std::sync::{Arc, Mutex};

use crate::error::{Result, TallyError};
use crate::migration::{LogEntry, MigrationId, MigrationLog};

/// Migration log held in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
    lookups: Arc<Mutex<Vec<MigrationId>>>,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log pre-filled with `ids` in the given order.
    pub fn with_applied<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<MigrationId>,
    {
        let entries = ids
            .into_iter()
            .map(|id| LogEntry::now(id.into()))
            .collect();
        Self {
            entries: Arc::new(Mutex::new(entries)),
            ..Default::default()
        }
    }

    /// Logged identifiers, oldest first.
    pub fn ids(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.id.to_string())
            .collect()
    }

    /// Identifiers passed to `contains`, in call order.
    pub fn lookups(&self) -> Vec<MigrationId> {
        self.lookups.lock().unwrap().clone()
    }
}

impl MigrationLog for InMemoryLog {
    async fn append(&self, id: &MigrationId) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        if entries.iter().any(|e| &e.id == id) {
            return Err(TallyError::AlreadyLogged(id.clone()));
        }
        entries.push(LogEntry::now(id.clone()));
        Ok(())
    }

    async fn remove(&self, id: &MigrationId) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        let position = entries
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| TallyError::NotLogged(id.clone()))?;
        entries.remove(position);
        Ok(())
    }

    async fn list_applied(&self) -> Result<Vec<LogEntry>> {
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn contains(&self, id: &MigrationId) -> Result<bool> {
        self.lookups.lock().unwrap().push(id.clone());
        Ok(self.entries.lock().unwrap().iter().any(|e| &e.id == id))
    }
}

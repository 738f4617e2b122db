use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use tally_core::error::{Result, TallyError};
use tally_core::migration::{LogEntry, MigrationId, MigrationLog};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LogDocument {
    #[serde(default)]
    migrations: Vec<LogEntry>,
}

/// Migration log kept as a JSON document on local disk.
///
/// Every write replaces the whole document through a temporary file and a
/// rename, so readers never observe a half-written log.
#[derive(Debug)]
pub struct FileMigrationLog {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileMigrationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<LogDocument> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) if content.trim().is_empty() => Ok(LogDocument::default()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(LogDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, document: &LogDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(document)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Vec<LogEntry>) -> Result<()>,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| TallyError::Io(std::io::Error::other("migration log lock poisoned")))?;

        let mut document = self.read()?;
        change(&mut document.migrations)?;
        self.write(&document)
    }
}

impl MigrationLog for FileMigrationLog {
    async fn prepare(&self) -> Result<()> {
        if !self.path.exists() {
            debug!("Creating migration log at {:?}", self.path);
            self.write(&LogDocument::default())?;
        }
        Ok(())
    }

    async fn append(&self, id: &MigrationId) -> Result<()> {
        self.update(|entries| {
            if entries.iter().any(|e| &e.id == id) {
                return Err(TallyError::AlreadyLogged(id.clone()));
            }
            entries.push(LogEntry::now(id.clone()));
            Ok(())
        })
    }

    async fn remove(&self, id: &MigrationId) -> Result<()> {
        self.update(|entries| {
            let position = entries
                .iter()
                .position(|e| &e.id == id)
                .ok_or_else(|| TallyError::NotLogged(id.clone()))?;
            entries.remove(position);
            Ok(())
        })
    }

    async fn list_applied(&self) -> Result<Vec<LogEntry>> {
        Ok(self.read()?.migrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ids(entries: &[LogEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_log() {
        let dir = TempDir::new().unwrap();
        let log = FileMigrationLog::new(dir.path().join("log.json"));
        assert!(log.list_applied().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".tally").join("migrations.json");
        let log = FileMigrationLog::new(&path);

        log.prepare().await.unwrap();
        log.prepare().await.unwrap();

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_append_remove_persist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.json");
        let log = FileMigrationLog::new(&path);

        log.append(&MigrationId::new("20230102_b")).await.unwrap();
        log.append(&MigrationId::new("20230101_a")).await.unwrap();
        log.append(&MigrationId::new("20230103_c")).await.unwrap();
        log.remove(&MigrationId::new("20230101_a")).await.unwrap();

        let reopened = FileMigrationLog::new(&path);
        let entries = reopened.list_applied().await.unwrap();
        assert_eq!(ids(&entries), vec!["20230102_b", "20230103_c"]);
        assert!(!dir.path().join("log.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_duplicate_and_missing() {
        let dir = TempDir::new().unwrap();
        let log = FileMigrationLog::new(dir.path().join("log.json"));
        let id = MigrationId::new("20230101_a");

        log.append(&id).await.unwrap();
        assert!(matches!(
            log.append(&id).await,
            Err(TallyError::AlreadyLogged(_))
        ));

        log.remove(&id).await.unwrap();
        assert!(matches!(log.remove(&id).await, Err(TallyError::NotLogged(_))));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log.json");
        std::fs::write(&path, "{ not json").unwrap();

        let log = FileMigrationLog::new(&path);
        assert!(matches!(
            log.list_applied().await,
            Err(TallyError::Serialization(_))
        ));
    }
}

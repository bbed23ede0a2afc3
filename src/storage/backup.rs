use std::{future::Future, path::PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::fs::operations::{read_locked, write_locked};

/// State of one timer as it is stored on the disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub project_name: String,
    /// Seconds.
    pub elapsed_time: u64,
    #[serde(default)]
    pub notes: String,
}

/// Whole collection keyed by project id, in collection order. A repeated key keeps its first
/// position and its last value.
pub type BackupSnapshot = IndexMap<String, BackupRecord>;

/// Interface for abstracting where the timer backup lives.
pub trait BackupStore {
    /// Reads the last written snapshot. A store that was never written to is empty.
    fn load(&self) -> impl Future<Output = Result<BackupSnapshot>>;

    /// Replaces the stored snapshot entirely.
    fn save(&self, snapshot: &BackupSnapshot) -> impl Future<Output = Result<()>>;
}

/// The main realization of [BackupStore]. Keeps a single JSON object in a file.
#[derive(Debug, Clone)]
pub struct JsonBackupStore {
    path: PathBuf,
}

impl JsonBackupStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl BackupStore for JsonBackupStore {
    async fn load(&self) -> Result<BackupSnapshot> {
        let content = read_locked(&self.path)
            .await
            .with_context(|| format!("Failed to read backup {:?}", self.path))?;

        let Some(content) = content else {
            info!("No backup found at {:?}", self.path);
            return Ok(BackupSnapshot::new());
        };
        // A crash during a write leaves an empty file behind.
        if content.trim().is_empty() {
            info!("Backup at {:?} is empty", self.path);
            return Ok(BackupSnapshot::new());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Backup {:?} is not valid JSON", self.path))
    }

    async fn save(&self, snapshot: &BackupSnapshot) -> Result<()> {
        let buffer = serde_json::to_vec(snapshot)?;
        write_locked(&self.path, &buffer)
            .await
            .with_context(|| format!("Failed to write backup {:?}", self.path))?;
        debug!("Saved {} timers into backup", snapshot.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{BackupRecord, BackupSnapshot, BackupStore, JsonBackupStore};

    fn record(name: &str, elapsed_time: u64) -> BackupRecord {
        BackupRecord {
            project_name: name.into(),
            elapsed_time,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_missing_backup_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonBackupStore::new(dir.path().join("timer_backup.json"));
        assert!(store.load().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_backup_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("timer_backup.json");
        std::fs::write(&path, "  \n")?;
        assert!(JsonBackupStore::new(path).load().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_backup_fails() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("timer_backup.json");
        std::fs::write(&path, "{\"A1\": {\"project_name\": ")?;
        assert!(JsonBackupStore::new(path).load().await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_records_without_notes_are_accepted() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("timer_backup.json");
        std::fs::write(
            &path,
            r#"{"A1": {"project_name": "Alpha", "elapsed_time": 12}}"#,
        )?;

        let snapshot = JsonBackupStore::new(path).load().await?;

        assert_eq!(snapshot.get("A1"), Some(&record("Alpha", 12)));
        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_ids_keep_first_position_and_last_record() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("timer_backup.json");
        std::fs::write(
            &path,
            r#"{"A1": {"project_name": "Alpha", "elapsed_time": 1},
                "B1": {"project_name": "Beta", "elapsed_time": 2},
                "A1": {"project_name": "Other", "elapsed_time": 3}}"#,
        )?;

        let snapshot = JsonBackupStore::new(path).load().await?;

        assert_eq!(
            snapshot.iter().collect::<Vec<_>>(),
            vec![
                (&"A1".to_string(), &record("Other", 3)),
                (&"B1".to_string(), &record("Beta", 2)),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonBackupStore::new(dir.path().join("timer_backup.json"));
        let snapshot: BackupSnapshot = [
            ("B2".to_string(), record("Beta", 7)),
            (
                "A1".to_string(),
                BackupRecord {
                    notes: "client call".into(),
                    ..record("Alpha", 3600)
                },
            ),
        ]
        .into_iter()
        .collect();

        store.save(&snapshot).await?;

        assert_eq!(
            std::fs::read_to_string(store.path())?,
            r#"{"B2":{"project_name":"Beta","elapsed_time":7,"notes":""},"A1":{"project_name":"Alpha","elapsed_time":3600,"notes":"client call"}}"#
        );
        assert_eq!(store.load().await?, snapshot);
        Ok(())
    }
}

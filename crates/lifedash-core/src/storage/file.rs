//! File-backed key-value storage
//!
//! Keeps every key in a single JSON object on disk, the desktop counterpart
//! of browser local storage. Writes are atomic (temp file, then rename) so
//! the file is never left half-written.
//!
//! Storage location: `<data_dir>/storage.json`

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use super::StorageAdapter;

type Entries = BTreeMap<String, String>;

/// Key-value storage persisted to a JSON file
pub struct FileStorage {
    path: PathBuf,
    /// Loaded lazily on first access, then kept in sync with the file
    entries: Mutex<Option<Entries>>,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to the map and write it back to disk
    async fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut Entries) -> bool,
    {
        let mut guard = self.entries.lock().await;
        let entries = self.loaded(&mut guard).await;

        if !change(entries) {
            return;
        }

        if let Err(e) = self.flush(entries).await {
            warn!(path = ?self.path, error = %e, "Failed to persist storage");
            if let Some(hint) = e.recovery_suggestion() {
                warn!("{}", hint);
            }
        }
    }

    async fn loaded<'a>(&self, slot: &'a mut Option<Entries>) -> &'a mut Entries {
        if slot.is_none() {
            *slot = Some(self.load().await);
        }
        slot.get_or_insert_with(Entries::new)
    }

    /// Read the map from disk, falling back to empty on any failure
    async fn load(&self) -> Entries {
        let path = self.path.clone();
        let result = tokio::task::spawn_blocking(move || read_entries(&path))
            .await
            .map_err(|e| StorageError::Worker(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(entries) => {
                debug!(path = ?self.path, keys = entries.len(), "Loaded storage file");
                entries
            }
            Err(e) => {
                warn!(error = %e, "Storage unreadable, starting empty");
                Entries::new()
            }
        }
    }

    async fn flush(&self, entries: &Entries) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || atomic_write(&path, &bytes))
            .await
            .map_err(|e| StorageError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl StorageAdapter for FileStorage {
    async fn get(&self, key: &str) -> Option<String> {
        let mut guard = self.entries.lock().await;
        self.loaded(&mut guard).await.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) {
        self.update(|entries| {
            let previous = entries.insert(key.to_string(), value.to_string());
            previous.as_deref() != Some(value)
        })
        .await;
    }

    async fn remove(&self, key: &str) {
        self.update(|entries| entries.remove(key).is_some()).await;
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}

/// Read the storage file
///
/// A missing file is an empty map. A file that does not parse is moved
/// aside to `<name>.corrupt` and reported as [`StorageError::Corrupt`].
fn read_entries(path: &Path) -> StorageResult<Entries> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Entries::new()),
        Err(source) => {
            return Err(StorageError::ReadError {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    serde_json::from_str(&content).map_err(|e| {
        let backup_path = path.with_extension("json.corrupt");
        // The rename is best effort; the error below is what matters
        let _ = fs::rename(path, &backup_path);
        StorageError::Corrupt {
            path: path.to_path_buf(),
            backup_path,
            details: e.to_string(),
        }
    })
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
    }

    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}

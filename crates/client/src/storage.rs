//! Durable client-local key/value slots.
//!
//! The dashboard keeps exactly two slots: the session credential and the
//! rules consent flag. Both survive restarts when backed by [`FileStorage`].

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use panel_core::{PanelError, PanelResult};

/// A named-slot string store.
///
/// Writes update the in-memory view first; a failed flush is reported but
/// never leaves the slot in its old state.
pub trait LocalStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> PanelResult<()>;
    fn remove(&self, key: &str) -> PanelResult<()>;
}

/// In-memory storage.
///
/// Intended for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a slot (e.g. a credential left over from a previous run).
    pub fn with_slot(self, key: &str, value: &str) -> Self {
        self.slots
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        self
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.slots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> PanelResult<()> {
        self.slots
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PanelResult<()> {
        self.slots
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

/// JSON-file-backed storage.
///
/// The whole file is one JSON object of string slots. It is read once at
/// open and rewritten (0600 on unix) after every mutation.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    slots: RwLock<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file.
    ///
    /// An unreadable or corrupt file starts out empty rather than blocking
    /// startup; the next write replaces it.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let slots = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), "ignoring corrupt local storage: {err}");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                tracing::warn!(path = %path.display(), "failed to read local storage: {err}");
                BTreeMap::new()
            }
        };

        Self {
            path,
            slots: RwLock::new(slots),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, slots: &BTreeMap<String, String>) -> PanelResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                PanelError::storage(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let contents = serde_json::to_string_pretty(slots)
            .map_err(|e| PanelError::storage(format!("failed to serialize slots: {e}")))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .map_err(|e| {
                    PanelError::storage(format!("failed to open {}: {e}", self.path.display()))
                })?;
            file.write_all(contents.as_bytes()).map_err(|e| {
                PanelError::storage(format!("failed to write {}: {e}", self.path.display()))
            })?;
        }

        #[cfg(not(unix))]
        {
            let mut file = fs::File::create(&self.path).map_err(|e| {
                PanelError::storage(format!("failed to open {}: {e}", self.path.display()))
            })?;
            file.write_all(contents.as_bytes()).map_err(|e| {
                PanelError::storage(format!("failed to write {}: {e}", self.path.display()))
            })?;
        }

        Ok(())
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.slots
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> PanelResult<()> {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        slots.insert(key.to_string(), value.to_string());
        self.flush(&slots)
    }

    fn remove(&self, key: &str) -> PanelResult<()> {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        if slots.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_slots() {
        let storage = MemoryStorage::new().with_slot("authToken", "T0");
        assert_eq!(storage.get("authToken").as_deref(), Some("T0"));

        storage.set("authToken", "T1").unwrap();
        assert_eq!(storage.get("authToken").as_deref(), Some("T1"));

        storage.remove("authToken").unwrap();
        assert_eq!(storage.get("authToken"), None);
    }

    #[test]
    fn file_slots_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("storage.json");

        let storage = FileStorage::open(&path);
        assert_eq!(storage.get("rulesAccepted"), None);
        storage.set("rulesAccepted", "true").unwrap();
        storage.set("authToken", "T1").unwrap();
        drop(storage);

        let reopened = FileStorage::open(&path);
        assert_eq!(reopened.get("rulesAccepted").as_deref(), Some("true"));
        assert_eq!(reopened.get("authToken").as_deref(), Some("T1"));

        reopened.remove("authToken").unwrap();
        let again = FileStorage::open(&path);
        assert_eq!(again.get("authToken"), None);
        assert_eq!(again.get("rulesAccepted").as_deref(), Some("true"));
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        fs::write(&path, "{ definitely not json").unwrap();

        let storage = FileStorage::open(&path);
        assert_eq!(storage.get("authToken"), None);
        storage.set("authToken", "T2").unwrap();
        assert_eq!(FileStorage::open(&path).get("authToken").as_deref(), Some("T2"));
    }

    #[cfg(unix)]
    #[test]
    fn file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");
        FileStorage::open(&path).set("authToken", "T3").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

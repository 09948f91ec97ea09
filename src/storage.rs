use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::Task;
use crate::settings::Settings;

/// Key holding the task list.
pub const TASKS_KEY: &str = "todos";
/// Key holding the settings record.
pub const SETTINGS_KEY: &str = "todoSettings";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "EPHEMERAL_DATA_DIR";

/// Returns the directory holding the data files.
///
/// The path is determined in the following order:
/// 1. `EPHEMERAL_DATA_DIR` environment variable.
/// 2. `~/.local/share/ephemeral` (on Linux).
/// 3. `.` (fallback).
pub fn default_data_dir() -> PathBuf {
    std::env::var(DATA_DIR_ENV).map(PathBuf::from).unwrap_or_else(|_| {
        match dirs::data_local_dir() {
            Some(mut p) => {
                p.push("ephemeral");
                p
            }
            None => PathBuf::from("."),
        }
    })
}

/// A text blob store addressed by key.
pub trait KeyValueStore {
    /// Returns the blob under `key`, or `None` if nothing was stored.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    /// Replaces the blob under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }
}

/// Stores each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> FileStore {
        FileStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let mut f = OpenOptions::new().read(true).open(&path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Ok(Some(s))
    }

    /// Writes through a temp file and a rename so a crash never leaves a
    /// half-written blob behind.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp)?;
        f.write_all(value.as_bytes())?;
        f.flush()?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-memory store, used by tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.blobs.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.blobs.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Typed access to the two persisted records.
///
/// Loads never fail: a missing or unreadable record yields the default.
/// Saves report errors so the caller can log them.
pub struct Repository<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Repository<S> {
    pub fn new(store: S) -> Repository<S> {
        Repository { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Reads and decodes a record, `Ok(None)` when the key is absent.
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.try_load(key) {
            Ok(Some(v)) => v,
            Ok(None) => {
                debug!(key, "no stored record, using default");
                T::default()
            }
            Err(e) => {
                warn!(key, error = %e, "failed to load record, using default");
                T::default()
            }
        }
    }

    /// Loads all tasks. Returns an empty list if the record is absent or corrupt.
    pub fn load_tasks(&self) -> Vec<Task> {
        self.load_or_default(TASKS_KEY)
    }

    /// Saves the given list of tasks, replacing the stored one.
    pub fn save_tasks(&self, tasks: &[Task]) -> Result<(), StoreError> {
        let s = serde_json::to_string(tasks)?;
        self.store.set(TASKS_KEY, &s)
    }

    /// Loads settings, falling back to defaults if absent or corrupt.
    pub fn load_settings(&self) -> Settings {
        self.load_or_default::<Settings>(SETTINGS_KEY).normalized()
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let s = serde_json::to_string(settings)?;
        self.store.set(SETTINGS_KEY, &s)
    }
}

//! Settings storage.
//!
//! A small key/value store for persisted local overrides. Stores are handed
//! to features explicitly as `Arc<dyn SettingsStore>`.

use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use element_log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Key/value settings backend.
pub trait SettingsStore: Send + Sync {
    /// Returns `Ok(None)` if the key is not set.
    fn get_value(&self, key: &str) -> StoreResult<Option<Value>>;

    fn set_value(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    fn contains(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get_value(key)?.is_some())
    }

    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// Typed access on top of any [`SettingsStore`].
pub trait SettingsStoreExt: SettingsStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        match self.get_value(key)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| StoreError::Deserialization {
                    key: key.to_string(),
                    message: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> StoreResult<()> {
        let value =
            serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.set_value(key, value)
    }

    fn get_bool(&self, key: &str) -> StoreResult<Option<bool>> {
        self.get(key)
    }
}

impl<S: SettingsStore + ?Sized> SettingsStoreExt for S {}

// ========== In-memory ==========

/// Process-local store; contents are lost on drop.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    values: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for InMemoryStore {
    fn get_value(&self, key: &str) -> StoreResult<Option<Value>> {
        let values = self.values.read().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set_value(&self, key: &str, value: Value) -> StoreResult<()> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        values.remove(key);
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let values = self.values.read().map_err(|_| StoreError::Poisoned)?;
        Ok(values.keys().cloned().collect())
    }
}

// ========== JSON file ==========

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    values: BTreeMap<String, Value>,
}

/// Store persisted as a single JSON document.
///
/// The whole document is rewritten on every mutation: written to a sibling
/// temp file, then renamed over the original. The write lock is held across
/// the rewrite so concurrent mutations reach disk in order.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    values: RwLock<BTreeMap<String, Value>>,
}

impl FileStore {
    /// Open `path`, starting empty if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(content) => {
                let document: Document = serde_json::from_str(&content).map_err(|e| {
                    StoreError::Serialization(format!("{}: {}", path.display(), e))
                })?;
                debug!(
                    "Opened settings file {} with {} keys",
                    path.display(),
                    document.values.len()
                );
                document.values
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Settings file {} not found, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            values: RwLock::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, Value>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let document = Document {
            updated_at: Some(Utc::now()),
            values: values.clone(),
        };
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let written = fs::File::create(&tmp).and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        });
        if let Err(e) = written.and_then(|()| fs::rename(&tmp, &self.path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    /// Apply `change` and persist; the in-memory copy is rolled back if the
    /// write fails.
    fn mutate(
        &self,
        key: &str,
        change: impl FnOnce(&mut BTreeMap<String, Value>) -> Option<Value>,
    ) -> StoreResult<()> {
        let mut values = self.values.write().map_err(|_| StoreError::Poisoned)?;
        let previous = change(&mut values);

        if let Err(e) = self.persist(&values) {
            warn!("Failed to persist settings to {}: {}", self.path.display(), e);
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

impl SettingsStore for FileStore {
    fn get_value(&self, key: &str) -> StoreResult<Option<Value>> {
        let values = self.values.read().map_err(|_| StoreError::Poisoned)?;
        Ok(values.get(key).cloned())
    }

    fn set_value(&self, key: &str, value: Value) -> StoreResult<()> {
        self.mutate(key, |values| values.insert(key.to_string(), value))
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let present = self
            .values
            .read()
            .map_err(|_| StoreError::Poisoned)?
            .contains_key(key);
        if !present {
            return Ok(());
        }
        self.mutate(key, |values| values.remove(key))
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let values = self.values.read().map_err(|_| StoreError::Poisoned)?;
        Ok(values.keys().cloned().collect())
    }
}

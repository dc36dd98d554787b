//! Key-value persistence of primitive progression fields.
//!
//! The progression layer only ever stores integers and booleans, so the store
//! contract is deliberately primitive: reads return `None` for absent or
//! mistyped keys and callers substitute defaults.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// A single primitive value held by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoreValue {
    Bool(bool),
    Int(i64),
}

/// Trait for abstracting the local key-value save space.
/// Platform-specific implementations should provide this.
pub trait PersistentStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read an integer; `None` when the key is absent or holds another type.
    fn get_int(&self, key: &str) -> Option<i64>;

    /// Read a boolean; `None` when the key is absent or holds another type.
    fn get_bool(&self, key: &str) -> Option<bool>;

    /// Write an integer.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn set_int(&mut self, key: &str, value: i64) -> Result<(), Self::Error>;

    /// Write a boolean.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the write.
    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), Self::Error>;

    /// Remove a key if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the delete.
    fn delete(&mut self, key: &str) -> Result<(), Self::Error>;

    /// Make previous writes durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be written.
    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// In-memory store. Clones share the same underlying map, so a test can keep a
/// handle and inspect what the progression layer wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<BTreeMap<String, StoreValue>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw access for tests and debug tooling.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<StoreValue> {
        self.values.borrow().get(key).copied()
    }

    /// Insert a raw value, bypassing the typed setters.
    pub fn insert(&self, key: &str, value: StoreValue) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    /// Copy out every entry in key order.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, StoreValue)> {
        self.values
            .borrow()
            .iter()
            .map(|(key, value)| (key.clone(), *value))
            .collect()
    }
}

impl PersistentStore for MemoryStore {
    type Error = Infallible;

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.get(key) {
            Some(StoreValue::Int(value)) => Some(value),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(StoreValue::Bool(value)) => Some(value),
            _ => None,
        }
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<(), Self::Error> {
        self.insert(key, StoreValue::Int(value));
        Ok(())
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), Self::Error> {
        self.insert(key, StoreValue::Bool(value));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), Self::Error> {
        self.values.borrow_mut().remove(key);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access save file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize save data: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// File-backed store holding a flat JSON object of primitive values.
///
/// Writes are buffered in memory and land on disk at [`PersistentStore::flush`].
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, StoreValue>,
    dirty: bool,
}

impl JsonFileStore {
    /// Open (or lazily create) a save file.
    ///
    /// A missing file yields an empty store. A file that exists but cannot be
    /// parsed is treated as empty too, since a corrupted save must never stop
    /// the session; the next flush overwrites it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => parse_values(&path, &contents),
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are writes not yet flushed to disk.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn put(&mut self, key: &str, value: StoreValue) {
        if self.values.get(key) != Some(&value) {
            self.values.insert(key.to_string(), value);
            self.dirty = true;
        }
    }
}

fn parse_values(path: &Path, contents: &str) -> BTreeMap<String, StoreValue> {
    if contents.trim().is_empty() {
        return BTreeMap::new();
    }
    match serde_json::from_str(contents) {
        Ok(values) => values,
        Err(err) => {
            log::warn!(
                "save file {} is unreadable ({err}); starting from defaults",
                path.display()
            );
            BTreeMap::new()
        }
    }
}

impl PersistentStore for JsonFileStore {
    type Error = StoreError;

    fn get_int(&self, key: &str) -> Option<i64> {
        match self.values.get(key) {
            Some(StoreValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        match self.values.get(key) {
            Some(StoreValue::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    fn set_int(&mut self, key: &str, value: i64) -> Result<(), Self::Error> {
        self.put(key, StoreValue::Int(value));
        Ok(())
    }

    fn set_bool(&mut self, key: &str, value: bool) -> Result<(), Self::Error> {
        self.put(key, StoreValue::Bool(value));
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), Self::Error> {
        if self.values.remove(key).is_some() {
            self.dirty = true;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        if !self.dirty {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        self.dirty = false;
        Ok(())
    }
}

use std::{
    cell::RefCell,
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::PathBuf,
};

use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::error::LockupError;

/// A trait, necessary for every local key-value store that keeps the session.
/// Values are JSON documents; an unset key reads as `None`.
pub trait SessionStore {
    fn get_item(&self, key: &str) -> Result<Option<Value>, LockupError>;
    fn set_item(&self, key: &str, value: Value) -> Result<(), LockupError>;
    fn remove_item(&self, key: &str) -> Result<(), LockupError>;

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, LockupError> {
        match self.get_item(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<(), LockupError> {
        self.set_item(key, serde_json::to_value(value)?)
    }
}

/// Keeps the whole mapping as one pretty-printed JSON object in a file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    fn read_all(&self) -> Result<BTreeMap<String, Value>, LockupError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let store_file = BufReader::new(File::open(&self.path)?);
        Ok(serde_json::from_reader(store_file)?)
    }

    fn write_all(&self, items: &BTreeMap<String, Value>) -> Result<(), LockupError> {
        info!(
            "Writing {} session item(s) to {}",
            items.len(),
            self.path.display()
        );
        let store_file = File::create(&self.path)?;
        Ok(serde_json::to_writer_pretty(store_file, items)?)
    }
}

impl SessionStore for JsonFileStore {
    fn get_item(&self, key: &str) -> Result<Option<Value>, LockupError> {
        debug!("Reading {} from {}", key, self.path.display());
        Ok(self.read_all()?.remove(key))
    }

    fn set_item(&self, key: &str, value: Value) -> Result<(), LockupError> {
        let mut items = self.read_all()?;
        items.insert(key.to_owned(), value);
        self.write_all(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), LockupError> {
        let mut items = self.read_all()?;
        if items.remove(key).is_some() {
            self.write_all(&items)?;
        }
        Ok(())
    }
}

/// In-process store, nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RefCell<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.borrow().keys().cloned().collect()
    }
}

impl SessionStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<Value>, LockupError> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: Value) -> Result<(), LockupError> {
        self.items.borrow_mut().insert(key.to_owned(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LockupError> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}

//! Backing stores for persisted tutorial values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key/value storage provided by the host save file.
pub trait PersistenceStore {
    fn get(&self, key: u32) -> Option<i64>;
    fn set(&mut self, key: u32, value: i64);
}

/// A store kept in memory, serializable to JSON for saving alongside a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStore {
    values: BTreeMap<u32, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(source: &str) -> serde_json::Result<Self> {
        serde_json::from_str(source)
    }
}

impl PersistenceStore for MemoryStore {
    fn get(&self, key: u32) -> Option<i64> {
        self.values.get(&key).copied()
    }

    fn set(&mut self, key: u32, value: i64) {
        self.values.insert(key, value);
    }
}

//! Persistence gateway - versioned reads and writes of item state.
//!
//! Every value is stored under a CRC-32 hash of `prefix + key`. Item states
//! use the configured item prefix; version bookkeeping uses no prefix.

mod store;

pub use store::*;

use tracing::{debug, error, info, warn};
use tutorial_rules::{ItemId, ItemState};

use crate::error::TutorialError;

/// Version written to the save file by this code.
pub const DATA_VERSION: i64 = 3;

/// First data version that prefixes item keys.
pub const PREFIXED_KEYS_VERSION: i64 = 3;

pub const FIRST_VERSION_KEY: &str = "__TUTORIAL_FIRST_VERSION";
pub const DATA_VERSION_KEY: &str = "__TUTORIAL_DATA_VERSION";

/// Hash a key into the persisted key space.
pub fn hash_key(prefix: &str, key: &str) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(prefix.as_bytes());
    hasher.update(key.as_bytes());
    hasher.finalize()
}

/// Reads and writes item states through a host store.
pub struct PersistenceGateway {
    store: Box<dyn PersistenceStore>,
    prefix: String,
    first_version: i64,
    /// Version of the data that was loaded; stays at the stored value for the
    /// whole session so migration applies to every item processed.
    loaded_version: i64,
}

impl PersistenceGateway {
    pub fn new(store: Box<dyn PersistenceStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
            first_version: 0,
            loaded_version: DATA_VERSION,
        }
    }

    /// Read a value stored under `prefix + key`.
    pub fn read_with(&self, key: &str, prefix: &str) -> Option<i64> {
        let value = self.store.get(hash_key(prefix, key));
        debug!(key, prefix, ?value, "read value");
        value
    }

    /// Write a value under `prefix + key`.
    pub fn write_with(&mut self, key: &str, value: i64, prefix: &str) {
        debug!(key, prefix, value, "write value");
        self.store.set(hash_key(prefix, key), value);
    }

    /// Read a value under the item prefix.
    pub fn read(&self, key: &str) -> Option<i64> {
        self.read_with(key, &self.prefix)
    }

    /// Write a value under the item prefix.
    pub fn write(&mut self, key: &str, value: i64) {
        let prefix = self.prefix.clone();
        self.write_with(key, value, &prefix);
    }

    /// Stored state of an item. Absent values mean the item was never seen.
    pub fn read_state(&self, id: &ItemId) -> ItemState {
        match self.read(id.as_str()) {
            None => ItemState::Unseen,
            Some(value) => ItemState::from_stored(value).unwrap_or_else(|| {
                warn!(item = %id, value, "unrecognized stored item state, treating as unseen");
                ItemState::Unseen
            }),
        }
    }

    pub fn write_state(&mut self, id: &ItemId, state: ItemState) {
        if state == ItemState::Queued {
            return;
        }
        self.write(id.as_str(), state.stored_value());
    }

    /// Read (or stamp) the version information of the loaded data.
    ///
    /// A fresh store is stamped with the running version. A stored version
    /// newer than the running one is reported but nothing is rewritten
    /// destructively; processing continues.
    pub fn check_versions(&mut self) -> Result<(), TutorialError> {
        let first = self.read_with(FIRST_VERSION_KEY, "").unwrap_or(0);
        if first == 0 {
            self.write_with(FIRST_VERSION_KEY, DATA_VERSION, "");
            self.first_version = DATA_VERSION;
            info!(version = DATA_VERSION, "new tutorial data");
        } else {
            self.first_version = first;
            info!(version = first, "tutorial data first written");
        }

        let stored = self.read_with(DATA_VERSION_KEY, "").unwrap_or(0);
        self.loaded_version = if stored == 0 { DATA_VERSION } else { stored };

        if stored > DATA_VERSION {
            let err = TutorialError::DataVersionTooNew {
                stored,
                running: DATA_VERSION,
            };
            error!(error = %err, "forward-incompatible tutorial data");
            return Err(err);
        }

        self.write_with(DATA_VERSION_KEY, DATA_VERSION, "");
        Ok(())
    }

    /// Does the loaded data predate prefixed item keys?
    pub fn needs_migration(&self) -> bool {
        self.loaded_version < PREFIXED_KEYS_VERSION
    }

    /// Move an item's value from its unprefixed key to its prefixed one.
    pub fn migrate(&mut self, id: &ItemId) {
        if let Some(value) = self.read_with(id.as_str(), "") {
            debug!(item = %id, value, "migrating unprefixed item value");
            self.write(id.as_str(), value);
        }
    }

    pub fn first_version(&self) -> i64 {
        self.first_version
    }

    pub fn loaded_version(&self) -> i64 {
        self.loaded_version
    }

    pub fn store(&self) -> &dyn PersistenceStore {
        self.store.as_ref()
    }
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("prefix", &self.prefix)
            .field("first_version", &self.first_version)
            .field("loaded_version", &self.loaded_version)
            .finish_non_exhaustive()
    }
}

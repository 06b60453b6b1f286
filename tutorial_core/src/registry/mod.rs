//! Item Registry - the catalog of items and the state collections.
//!
//! Items live in an arena addressed by [`ItemKey`]. Until overwrites are
//! resolved two items may share an id, so the key (not the id) is what the
//! collections hold. Each live item sits in exactly one of the Unseen, Active,
//! Persistent or Completed lists, except while queued: queued items are held by
//! the activation queue and by no list here.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, error, warn};

use tutorial_rules::{DisplayPayload, ItemId, ItemModifiers, ItemState, TutorialItem};

use crate::error::TutorialError;
use crate::persistence::hash_key;

/// Handle to an item stored in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey(usize);

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Version bookkeeping for an id that was registered with a version.
#[derive(Debug, Clone, Copy)]
struct Overwrite {
    version: u32,
    key: ItemKey,
}

/// Every registered item, with one ordered list per state.
#[derive(Debug, Default)]
pub struct ItemRegistry {
    /// Arena of items; removed items leave a hole.
    slots: Vec<Option<TutorialItem>>,

    /// Every registered item in registration order.
    all: Vec<ItemKey>,

    unseen: Vec<ItemKey>,
    active: Vec<ItemKey>,
    persistent: Vec<ItemKey>,
    completed: Vec<ItemKey>,

    /// Highest versioned item per id.
    overwrites: HashMap<ItemId, Overwrite>,

    /// Groups already processed, with their hash.
    groups: HashMap<String, u32>,

    welcome: Option<ItemKey>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item to the catalog as Unseen.
    ///
    /// In multiplayer only legacy items are accepted. The modifiers' delivery
    /// check may reject the item as well. Returns the new key if registered.
    pub fn register(
        &mut self,
        mut item: TutorialItem,
        modifiers: ItemModifiers,
        is_multiplayer: bool,
    ) -> Option<ItemKey> {
        if is_multiplayer && !item.is_legacy() {
            debug!(item = %item.id, "multiplayer, item not registered");
            return None;
        }
        if let Some(can_deliver) = &modifiers.can_deliver {
            if !can_deliver(&item) {
                debug!(item = %item.id, "item not delivered");
                return None;
            }
        }

        if let Some(DisplayPayload::Callout(callout)) = &item.display {
            for action_key in callout.duplicate_action_keys() {
                warn!(item = %item.id, action_key = %action_key, "callout binds the same action to several options");
            }
        }

        let key = ItemKey(self.slots.len());
        item.state = ItemState::Unseen;

        if let Some(version) = modifiers.version {
            item.version = version;
            let replaces = self
                .overwrites
                .get(&item.id)
                .map_or(true, |prior| version > prior.version);
            if replaces {
                self.overwrites
                    .insert(item.id.clone(), Overwrite { version, key });
            }
        }

        let welcome_version = item.version;
        let id = item.id.clone();
        self.slots.push(Some(item));
        self.unseen.push(key);
        self.all.push(key);

        if modifiers.is_welcome_instructions {
            self.claim_welcome(key, &id, welcome_version);
        }
        Some(key)
    }

    /// Make an item the welcome instructions; only a strictly higher version
    /// replaces the current holder.
    fn claim_welcome(&mut self, key: ItemKey, id: &ItemId, version: u32) {
        if let Some(holder) = self.welcome.and_then(|k| self.get(k)) {
            if version < holder.version {
                return;
            }
            if version == holder.version {
                let err = TutorialError::WelcomeConflict {
                    holder: holder.id.clone(),
                    candidate: id.clone(),
                    version,
                };
                error!(error = %err, "welcome instructions");
                return;
            }
        }
        self.welcome = Some(key);
    }

    /// Register a group and prune items overwritten by higher versions.
    ///
    /// A group can only be processed once. Returns the group hash.
    pub fn resolve_overwrites(&mut self, group: &str) -> Result<u32, TutorialError> {
        if self.groups.contains_key(group) {
            return Err(TutorialError::DuplicateGroup(group.to_string()));
        }
        let hash = hash_key("", group);
        self.groups.insert(group.to_string(), hash);

        if self.overwrites.is_empty() {
            return Ok(hash);
        }

        let mut stale = BTreeSet::new();
        for (collection, keys) in [
            ("unseen", &self.unseen),
            ("persistent", &self.persistent),
            ("global", &self.all),
        ] {
            for &key in keys.iter().rev() {
                let Some(item) = self.get(key) else { continue };
                let Some(winner) = self.overwrites.get(&item.id) else {
                    continue;
                };
                if winner.key == key {
                    continue;
                }
                if item.version < winner.version {
                    stale.insert(key);
                } else if item.version == winner.version {
                    let err = TutorialError::VersionConflict {
                        id: item.id.clone(),
                        version: item.version,
                        collection,
                    };
                    error!(error = %err, group, "overwrite");
                }
            }
        }

        for key in stale {
            // Only pending or resident copies are dropped; resolved ones stay put.
            if let Some(item) = self.get(key) {
                if !matches!(item.state, ItemState::Unseen | ItemState::Persistent) {
                    continue;
                }
                debug!(item = %item.id, version = item.version, "overwritten");
            }
            self.unseen.retain(|k| *k != key);
            self.persistent.retain(|k| *k != key);
            self.all.retain(|k| *k != key);
            self.slots[key.0] = None;
        }
        Ok(hash)
    }

    pub fn has_group(&self, group: &str) -> bool {
        self.groups.contains_key(group)
    }

    pub fn get(&self, key: ItemKey) -> Option<&TutorialItem> {
        self.slots.get(key.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, key: ItemKey) -> Option<&mut TutorialItem> {
        self.slots.get_mut(key.0).and_then(Option::as_mut)
    }

    /// Find an item by id, preferring the highest versioned copy.
    pub fn find(&self, id: &ItemId) -> Option<ItemKey> {
        if let Some(winner) = self.overwrites.get(id) {
            if self.get(winner.key).is_some() {
                return Some(winner.key);
            }
        }
        self.all
            .iter()
            .copied()
            .find(|&key| self.get(key).is_some_and(|item| &item.id == id))
    }

    /// Find an item by id within one collection.
    pub fn find_in(&self, id: &ItemId, state: ItemState) -> Option<ItemKey> {
        self.keys_in(state)
            .iter()
            .copied()
            .find(|&key| self.get(key).is_some_and(|item| &item.id == id))
    }

    /// Keys of a collection in order. Queued items are held elsewhere.
    pub fn keys_in(&self, state: ItemState) -> &[ItemKey] {
        match state {
            ItemState::Unseen => &self.unseen,
            ItemState::Active => &self.active,
            ItemState::Persistent => &self.persistent,
            ItemState::Completed => &self.completed,
            ItemState::Queued => &[],
        }
    }

    pub fn count(&self, state: ItemState) -> usize {
        self.keys_in(state).len()
    }

    fn list_mut(&mut self, state: ItemState) -> Option<&mut Vec<ItemKey>> {
        match state {
            ItemState::Unseen => Some(&mut self.unseen),
            ItemState::Active => Some(&mut self.active),
            ItemState::Persistent => Some(&mut self.persistent),
            ItemState::Completed => Some(&mut self.completed),
            ItemState::Queued => None,
        }
    }

    /// Move an item to another state.
    ///
    /// The item always leaves its current collection before joining the new
    /// one. An item missing from the collection its state names is reported
    /// and pulled out of wherever it actually is.
    pub fn transition(&mut self, key: ItemKey, to: ItemState) -> Result<(), TutorialError> {
        let Some(item) = self.get(key) else {
            return Err(TutorialError::InvariantViolation(format!(
                "transition of unknown item {key}"
            )));
        };
        let from = item.state;
        let id = item.id.clone();

        let removed = match self.list_mut(from) {
            Some(list) => {
                let before = list.len();
                list.retain(|k| *k != key);
                list.len() != before
            }
            None => true,
        };
        if !removed {
            let err = TutorialError::InvariantViolation(format!(
                "item '{id}' is {from:?} but not in that collection"
            ));
            error!(error = %err, "transition");
            for state in [
                ItemState::Unseen,
                ItemState::Active,
                ItemState::Persistent,
                ItemState::Completed,
            ] {
                if let Some(list) = self.list_mut(state) {
                    list.retain(|k| *k != key);
                }
            }
        }

        if let Some(list) = self.list_mut(to) {
            list.push(key);
        }
        if let Some(item) = self.get_mut(key) {
            item.state = to;
        }
        debug!(item = %id, ?from, ?to, "transition");
        Ok(())
    }

    /// Put every item back to Unseen, keeping registration order.
    pub fn reset(&mut self) {
        self.active.clear();
        self.persistent.clear();
        self.completed.clear();
        self.unseen = self.all.clone();
        for key in self.all.clone() {
            if let Some(item) = self.get_mut(key) {
                item.state = ItemState::Unseen;
                item.properties = None;
                item.hidden = false;
            }
        }
    }

    /// Every registered item in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ItemKey, &TutorialItem)> {
        self.all
            .iter()
            .filter_map(move |&key| self.get(key).map(|item| (key, item)))
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn welcome(&self) -> Option<ItemKey> {
        self.welcome.filter(|key| self.get(*key).is_some())
    }

    /// Every event name some item activates or completes on.
    pub fn interested_events(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self
            .iter()
            .flat_map(|(_, item)| item.activation_events.iter().chain(&item.completion_events))
            .collect();
        names.into_iter().cloned().collect()
    }

    /// Verify that every item is in exactly one place. `queued` are the keys
    /// held by the activation queue.
    pub fn check_invariants(&self, queued: &[ItemKey]) -> Result<(), TutorialError> {
        for (key, item) in self.iter() {
            let memberships = [
                ItemState::Unseen,
                ItemState::Active,
                ItemState::Persistent,
                ItemState::Completed,
            ]
            .into_iter()
            .filter(|state| self.keys_in(*state).contains(&key))
            .count()
                + queued.iter().filter(|k| **k == key).count();

            if memberships != 1 {
                return Err(TutorialError::InvariantViolation(format!(
                    "item '{}' is in {memberships} collections",
                    item.id
                )));
            }
            let listed = match item.state {
                ItemState::Queued => queued.contains(&key),
                state => self.keys_in(state).contains(&key),
            };
            if !listed {
                return Err(TutorialError::InvariantViolation(format!(
                    "item '{}' is {:?} but held elsewhere",
                    item.id, item.state
                )));
            }
        }

        let non_persistent_active = self
            .active
            .iter()
            .filter(|key| self.get(**key).is_some_and(|item| !item.is_persistent()))
            .count();
        if non_persistent_active > 1 {
            return Err(TutorialError::InvariantViolation(format!(
                "{non_persistent_active} items hold the active slot"
            )));
        }
        Ok(())
    }
}

//! Activation Queue - items waiting for the single active slot.
//!
//! Strict FIFO. The only way to jump the line is a chained hand-off, which
//! goes to the front and skips the activation check once promoted.

use std::collections::VecDeque;

use tutorial_rules::EnvironmentProperties;

use crate::registry::ItemKey;

/// An item waiting for the slot, with the environment it matched in.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEntry {
    pub key: ItemKey,
    pub properties: EnvironmentProperties,
    /// Queued by a chain or companion hand-off.
    pub hand_off: bool,
}

/// Items waiting for the active slot, in activation order.
#[derive(Debug, Clone, Default)]
pub struct ActivationQueue {
    entries: VecDeque<QueuedEntry>,
}

impl ActivationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait behind everything already queued.
    pub fn push_back(&mut self, key: ItemKey, properties: EnvironmentProperties) {
        self.entries.push_back(QueuedEntry {
            key,
            properties,
            hand_off: false,
        });
    }

    /// Go next, ahead of everything already queued, as a hand-off.
    pub fn push_front(&mut self, key: ItemKey, properties: EnvironmentProperties) {
        self.entries.push_front(QueuedEntry {
            key,
            properties,
            hand_off: true,
        });
    }

    pub fn pop_front(&mut self) -> Option<QueuedEntry> {
        self.entries.pop_front()
    }

    /// Take a specific item out of the queue.
    pub fn remove(&mut self, key: ItemKey) -> Option<QueuedEntry> {
        let index = self.entries.iter().position(|entry| entry.key == key)?;
        self.entries.remove(index)
    }

    pub fn contains(&self, key: ItemKey) -> bool {
        self.entries.iter().any(|entry| entry.key == key)
    }

    /// Empty the queue, returning the entries in order.
    pub fn take_all(&mut self) -> Vec<QueuedEntry> {
        self.entries.drain(..).collect()
    }

    pub fn keys(&self) -> Vec<ItemKey> {
        self.entries.iter().map(|entry| entry.key).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

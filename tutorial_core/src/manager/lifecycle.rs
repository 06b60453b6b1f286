//! Moving items through their states: activation, the active slot and its
//! queue, completion and chaining.

use tracing::{debug, error, info, warn};

use tutorial_rules::{
    EmittedEvent, EnvironmentProperties, ItemId, ItemState, TutorialLevel, NEXT_ITEM_CANCELED,
};

use super::guard::{self, Check, Hook};
use super::TutorialManager;
use crate::display::HideReason;
use crate::error::TutorialError;
use crate::registry::ItemKey;

impl TutorialManager {
    /// Attempt to activate an item whose trigger matched.
    ///
    /// Returns true when the item activated (or, under autoplay, completed).
    /// A non-persistent item finding the slot taken is queued instead; one
    /// completed for being above the running level returns false.
    pub(super) fn try_activate(&mut self, key: ItemKey, props: &EnvironmentProperties) -> bool {
        let Some(item) = self.registry.get(key) else {
            return false;
        };
        if item.skip {
            warn!(item = %item.id, "skipping item marked to be skipped");
            self.skip_item(key);
            return false;
        }
        if !item.allows_players(props) {
            return false;
        }
        if guard::evaluate(item, Check::Activation, props) != Some(true) {
            return false;
        }

        if self.host.is_autoplay() {
            self.complete_item(key);
            return true;
        }
        if !item.is_persistent() && self.slot_occupied() {
            debug!(item = %item.id, event = %props.event_name, "slot taken, queued");
            self.queue.push_back(key, props.clone());
            if self.registry.get(key).is_some_and(|i| i.state != ItemState::Queued) {
                self.move_item(key, ItemState::Queued);
            }
            return false;
        }
        self.activate(key, props.clone())
    }

    /// Promote an item, without evaluating its activation check.
    ///
    /// Below the item's level (unless legacy) or under autoplay the item is
    /// completed instead of shown. Returns true only when it was promoted.
    pub(super) fn activate(&mut self, key: ItemKey, props: EnvironmentProperties) -> bool {
        let Some(item) = self.registry.get(key) else {
            return false;
        };
        if (self.level < item.level && !item.is_legacy()) || self.host.is_autoplay() {
            debug!(item = %item.id, level = ?self.level, "completing instead of activating");
            self.finish(key);
            return false;
        }
        if item.state == ItemState::Queued {
            self.queue.remove(key);
        }

        let id = item.id.clone();
        let persistent = item.is_persistent();
        if item.is_tracked() {
            self.add_quest(key);
        }
        if let Some(item) = self.registry.get_mut(key) {
            item.properties = Some(props.clone());
            item.hidden = false;
        }

        if persistent {
            self.move_item(key, ItemState::Persistent);
            self.persistence.write_state(&id, ItemState::Persistent);
        } else {
            self.move_item(key, ItemState::Active);
        }

        if let Some(item) = self.registry.get(key) {
            self.display.show(item);
            self.telemetry.record_activation(&item.id, item.advisor());
        }
        info!(item = %id, persistent, event = %props.event_name, "activated");

        let emitted = self.run_hook(key, Hook::Activate, &props);
        self.also_activate(key);
        self.dispatch_emitted(emitted);
        true
    }

    /// Activate a chained or companion item, skipping its activation check.
    ///
    /// The slot rule still holds: if another item is on screen the hand-off
    /// waits at the head of the queue.
    fn hand_off(&mut self, key: ItemKey, props: EnvironmentProperties) {
        let Some(item) = self.registry.get(key) else {
            return;
        };
        if !item.is_persistent() && self.slot_occupied() {
            debug!(item = %item.id, "slot taken, hand-off waits at the head of the queue");
            let queued = item.state == ItemState::Queued;
            self.queue.remove(key);
            self.queue.push_front(key, props);
            if !queued {
                self.move_item(key, ItemState::Queued);
            }
            return;
        }
        self.activate(key, props);
    }

    fn add_quest(&mut self, key: ItemKey) {
        let Some(item) = self.registry.get(key) else {
            return;
        };
        match &item.quest {
            Some(quest) => self.quests.add_quest(&item.id, quest),
            None => error!(item = %item.id, "item is tracked but has no quest"),
        }
    }

    /// Complete an item by id.
    ///
    /// Looks in Active, Persistent, Unseen then the queue. Completing an
    /// already completed item does nothing.
    pub fn complete(&mut self, id: &ItemId) {
        let key = [ItemState::Active, ItemState::Persistent, ItemState::Unseen]
            .into_iter()
            .find_map(|state| self.registry.find_in(id, state))
            .or_else(|| self.queued_key(id));

        match key {
            Some(key) => self.complete_key(key),
            None => match self.state_of(id) {
                Some(ItemState::Completed) => debug!(item = %id, "already completed"),
                Some(state) => warn!(item = %id, ?state, "item cannot be completed"),
                None => warn!(item = %id, "no tutorial item to complete"),
            },
        }
    }

    /// Complete an item, then let the queue fill a freed slot.
    pub(super) fn complete_key(&mut self, key: ItemKey) {
        self.complete_item(key);
        self.drain_if_free();
    }

    /// Complete an item and resolve its chain.
    pub(super) fn complete_item(&mut self, key: ItemKey) {
        let Some(next_id) = self.registry.get(key).map(|item| item.next_id.clone()) else {
            return;
        };
        self.finish(key);

        if let Some(next_id) = next_id {
            if self.host.is_autoplay() {
                self.complete(&next_id);
            } else {
                self.chain_activate(key);
            }
        }
    }

    /// Mark an item completed, cleaning up its display and quest.
    fn finish(&mut self, key: ItemKey) {
        let Some(item) = self.registry.get(key) else {
            return;
        };
        if item.state == ItemState::Completed {
            return;
        }
        let id = item.id.clone();
        let has_quest = item.quest.is_some();
        if item.state == ItemState::Queued {
            self.queue.remove(key);
        }

        self.display.hide(&id, HideReason::Completed);
        if has_quest {
            self.quests.remove_quest(&id);
        }
        self.move_item(key, ItemState::Completed);
        if let Some(item) = self.registry.get_mut(key) {
            item.hidden = false;
        }
        self.persistence.write_state(&id, ItemState::Completed);
        debug!(item = %id, "completed");

        let props = self.current_properties();
        let emitted = self.run_hook(key, Hook::Cleanup, &props);
        self.dispatch_emitted(emitted);
    }

    /// Move an item straight to Completed without showing or cleaning it up.
    /// Only `persist` writes the change to storage.
    fn settle(&mut self, key: ItemKey, reason: &'static str, persist: bool) {
        let Some(item) = self.registry.get(key) else {
            return;
        };
        let id = item.id.clone();
        if item.state == ItemState::Queued {
            self.queue.remove(key);
        }
        self.move_item(key, ItemState::Completed);
        if persist {
            self.persistence.write_state(&id, ItemState::Completed);
        }
        debug!(item = %id, reason, "settled as completed");
    }

    /// An unseen item went obsolete; it is never shown.
    pub(super) fn retire(&mut self, key: ItemKey) {
        self.settle(key, "obsolete", true);
    }

    /// A resident item went obsolete after this dispatch's completions.
    pub(super) fn obsolete_resident(&mut self, key: ItemKey) {
        let Some(item) = self.registry.get(key) else {
            return;
        };
        let id = item.id.clone();
        if item.quest.is_some() {
            self.quests.remove_quest(&id);
        }
        self.display.hide(&id, HideReason::Obsolete);
        self.move_item(key, ItemState::Completed);
        self.persistence.write_state(&id, ItemState::Completed);
        debug!(item = %id, "persistent item obsoleted");
    }

    fn skip_item(&mut self, key: ItemKey) {
        match self.registry.get(key).map(|item| item.state) {
            Some(ItemState::Active | ItemState::Persistent) => self.complete_key(key),
            Some(ItemState::Unseen | ItemState::Queued) => self.settle(key, "skipped", true),
            _ => {}
        }
    }

    /// Activate the successor of a completed item.
    fn chain_activate(&mut self, key: ItemKey) {
        let Some(item) = self.registry.get(key) else {
            return;
        };
        let Some(next_id) = item.next_id.clone() else {
            return;
        };
        let from = item.id.clone();
        if item.state != ItemState::Completed {
            warn!(item = %from, next = %next_id, "activating next item before its predecessor completed");
        }
        if next_id.as_str() == NEXT_ITEM_CANCELED {
            warn!(item = %from, "next item canceled");
            return;
        }
        if self.level < item.level {
            warn!(item = %from, next = %next_id, "tutorial is not active for this item, next item not activated");
            return;
        }

        let target = self
            .registry
            .find_in(&next_id, ItemState::Unseen)
            .or_else(|| self.queued_key(&next_id));
        match target {
            Some(next) => {
                let props = self.current_properties();
                self.hand_off(next, props);
            }
            None => {
                let detail = match self.state_of(&next_id) {
                    Some(state) => format!("it exists with state {state:?}"),
                    None => "no item has that id".to_string(),
                };
                let err = TutorialError::UnresolvedChain {
                    from,
                    to: next_id,
                    detail,
                };
                error!(error = %err, "chain");
            }
        }
    }

    /// Activate the companion of an item that just activated.
    fn also_activate(&mut self, key: ItemKey) {
        let Some(item) = self.registry.get(key) else {
            return;
        };
        let Some(companion) = item.also_activate_id.clone() else {
            return;
        };
        let from = item.id.clone();
        let props = item
            .properties
            .clone()
            .unwrap_or_else(|| self.current_properties());

        let target = self
            .registry
            .find_in(&companion, ItemState::Unseen)
            .or_else(|| self.queued_key(&companion));
        match target {
            Some(target) => self.hand_off(target, props),
            None => {
                let resolved = [ItemState::Active, ItemState::Persistent, ItemState::Completed]
                    .into_iter()
                    .any(|state| self.registry.find_in(&companion, state).is_some());
                if !resolved {
                    let err = TutorialError::UnresolvedCompanion { from, to: companion };
                    error!(error = %err, "also activate");
                }
            }
        }
    }

    fn drain_if_free(&mut self) {
        if !self.queue.is_empty() && (self.host.is_autoplay() || !self.slot_occupied()) {
            self.drain_queue();
        }
    }

    /// Fill the freed slot from the queue.
    ///
    /// Entries are tried in order until one holds the slot or the queue is
    /// empty; hand-offs activate without their check. An entry completed for
    /// being above the running level does not stop the drain. Under autoplay
    /// every entry is completed in order instead.
    pub(super) fn drain_queue(&mut self) {
        if self.host.is_autoplay() {
            for entry in self.queue.take_all() {
                self.complete_item(entry.key);
            }
            return;
        }

        while !self.slot_occupied() {
            let Some(entry) = self.queue.pop_front() else {
                break;
            };
            let still_queued = self
                .registry
                .get(entry.key)
                .is_some_and(|item| item.state == ItemState::Queued);
            if !still_queued {
                continue;
            }
            let key = entry.key;
            let activated = if entry.hand_off {
                self.activate(key, entry.properties)
            } else {
                self.try_activate(key, &entry.properties)
            };
            if activated {
                continue;
            }

            if let Some(item) = self.registry.get(key).filter(|i| i.state == ItemState::Queued) {
                warn!(item = %item.id, "failed to activate queued item");
            }
            let dropped = self
                .registry
                .get(key)
                .is_some_and(|item| item.state == ItemState::Queued && !self.queue.contains(key));
            if dropped {
                self.move_item(key, ItemState::Unseen);
            }
        }
    }

    /// End of the local player's turn: nothing queued crosses into the next
    /// turn and per-turn items complete.
    pub(super) fn end_turn(&mut self) {
        for entry in self.queue.take_all() {
            if let Some(item) = self.registry.get(entry.key) {
                error!(
                    item = %item.id,
                    event = %entry.properties.event_name,
                    "item never got presented; thrown out due to advancing to next turn"
                );
            }
            self.move_item(entry.key, ItemState::Unseen);
        }

        let active = self.registry.keys_in(ItemState::Active).to_vec();
        for key in active {
            let per_turn = self
                .registry
                .get(key)
                .is_some_and(|item| item.state == ItemState::Active && !item.is_persistent());
            if per_turn {
                self.complete_item(key);
            }
        }
        self.is_local_player_turn = false;
    }

    /// Autoplay took over: everything on screen completes.
    pub(super) fn autoplay_started(&mut self) {
        warn!("autoplay started, completing active items");
        let active = self.registry.keys_in(ItemState::Active).to_vec();
        for key in active.into_iter().rev() {
            self.complete_key(key);
        }
    }

    /// Change the tutorial level.
    ///
    /// When the item on screen is now above the level, or the tutorial is
    /// turned off, it completes along with every non-legacy persistent item.
    pub fn set_tutorial_level(&mut self, level: TutorialLevel) {
        self.config.tutorial_level = level;
        self.level = self.config.effective_level(self.host.is_multiplayer());
        info!(level = ?self.level, "tutorial level changed");

        let current = self
            .registry
            .keys_in(ItemState::Active)
            .first()
            .copied()
            .or_else(|| {
                if !self.display.is_suspended() {
                    return None;
                }
                let last = self.display.last_item_id()?;
                self.registry.find(last)
            });
        let current_level = current
            .and_then(|key| self.registry.get(key))
            .map(|item| item.level);

        if !(current_level.is_some_and(|l| self.level < l) || self.level == TutorialLevel::None) {
            return;
        }

        if let Some(key) = current {
            let live = self
                .registry
                .get(key)
                .is_some_and(|item| item.state.is_live());
            if live {
                self.complete_key(key);
            }
        }
        let persistent = self.registry.keys_in(ItemState::Persistent).to_vec();
        for key in persistent.into_iter().rev() {
            if self.registry.get(key).is_some_and(|item| !item.is_legacy()) {
                self.complete_key(key);
            }
        }
    }

    /// Stored as completed: settle without running any of the item's code.
    pub(super) fn restore_completed(&mut self, key: ItemKey) {
        self.settle(key, "stored as completed", false);

        let Some(item) = self.registry.get(key) else {
            return;
        };
        if let Some(quest) = item.quest.as_ref().filter(|quest| quest.victory) {
            self.quests.add_quest(&item.id, quest);
        }
    }

    /// Stored as persistent: resident again, unless the level or autoplay
    /// rules it out.
    pub(super) fn restore_persistent(&mut self, key: ItemKey) {
        let Some(item) = self.registry.get(key) else {
            return;
        };
        let allowed = (self.level >= item.level || item.is_legacy()) && !self.host.is_autoplay();
        if !allowed {
            self.settle(key, "stored as persistent but not allowed", false);
            return;
        }

        let props = item
            .properties
            .clone()
            .unwrap_or_else(|| self.current_properties());
        self.in_environment(props.clone(), |manager| manager.activate(key, props));
    }

    pub fn has_welcome_instructions(&self) -> bool {
        self.registry.welcome().is_some()
    }

    /// Show the welcome instructions, even if they were seen before.
    pub fn run_welcome_instructions(&mut self) {
        let Some(key) = self.registry.welcome() else {
            warn!("no welcome instructions to run");
            return;
        };
        if self
            .registry
            .get(key)
            .is_some_and(|item| item.state != ItemState::Unseen)
        {
            self.unsee_item(key);
        }
        let props = self.current_properties();
        self.hand_off(key, props);
    }

    pub(super) fn run_hook(
        &self,
        key: ItemKey,
        hook: Hook,
        props: &EnvironmentProperties,
    ) -> Vec<EmittedEvent> {
        self.registry
            .get(key)
            .map(|item| guard::run_hook(item, hook, props))
            .unwrap_or_default()
    }

    /// Dispatch events raised by hooks, nested in the current scope.
    pub(super) fn dispatch_emitted(&mut self, events: Vec<EmittedEvent>) {
        for event in events {
            debug!(event = %event.name, depth = self.environment.depth(), "hook raised event");
            self.dispatch(&event.name, event.payload);
        }
    }
}

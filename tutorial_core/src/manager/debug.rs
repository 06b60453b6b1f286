//! Inspector surface. Not part of the gameplay flow, but it must leave the
//! collections consistent.

use tracing::info;

use tutorial_rules::{ItemId, ItemState};

use super::guard::Hook;
use super::TutorialManager;
use crate::display::HideReason;
use crate::error::TutorialError;
use crate::registry::ItemKey;

/// Header of [`TutorialManager::debug_dump`].
pub const DEBUG_DUMP_HEADER: &str = "id,state,title,advisor,quest";

impl TutorialManager {
    /// Activate an item now, bypassing its trigger and checks.
    ///
    /// Items on screen are unseen first and the queue is emptied. Completed
    /// items are reactivated.
    pub fn force_activate(&mut self, id: &ItemId) -> Result<(), TutorialError> {
        let target = [ItemState::Unseen, ItemState::Completed]
            .into_iter()
            .find_map(|state| self.registry.find_in(id, state))
            .or_else(|| self.queued_key(id));
        let Some(target) = target else {
            return Err(match self.state_of(id) {
                Some(state) => TutorialError::UnexpectedState {
                    id: id.clone(),
                    state,
                    expected: "unseen or completed",
                },
                None => TutorialError::UnknownItem(id.clone()),
            });
        };

        let active = self.registry.keys_in(ItemState::Active).to_vec();
        for key in active.into_iter().rev() {
            self.unsee_item(key);
        }
        for entry in self.queue.take_all() {
            self.move_item(entry.key, ItemState::Unseen);
        }

        info!(item = %id, "force activate");
        let props = self.current_properties();
        self.activate(target, props);
        Ok(())
    }

    /// Complete an active or persistent item now.
    pub fn force_complete(&mut self, id: &ItemId) -> Result<(), TutorialError> {
        let key = self
            .registry
            .find_in(id, ItemState::Active)
            .or_else(|| self.registry.find_in(id, ItemState::Persistent));
        match key {
            Some(key) => {
                info!(item = %id, "force complete");
                self.complete_key(key);
                Ok(())
            }
            None => Err(match self.state_of(id) {
                Some(state) => TutorialError::UnexpectedState {
                    id: id.clone(),
                    state,
                    expected: "active or persistent",
                },
                None => TutorialError::UnknownItem(id.clone()),
            }),
        }
    }

    /// Put an item back to Unseen. Unseen items are left alone.
    pub fn unsee(&mut self, id: &ItemId) -> Result<(), TutorialError> {
        let key = [ItemState::Completed, ItemState::Active, ItemState::Persistent]
            .into_iter()
            .find_map(|state| self.registry.find_in(id, state))
            .or_else(|| self.queued_key(id));
        match key {
            Some(key) => {
                self.unsee_item(key);
                Ok(())
            }
            None if self.registry.find(id).is_some() => Ok(()),
            None => Err(TutorialError::UnknownItem(id.clone())),
        }
    }

    pub(super) fn unsee_item(&mut self, key: ItemKey) {
        let Some(item) = self.registry.get(key) else {
            return;
        };
        let id = item.id.clone();
        let state = item.state;
        let has_quest = item.quest.is_some();

        let mut emitted = Vec::new();
        match state {
            ItemState::Unseen => return,
            ItemState::Queued => {
                self.queue.remove(key);
            }
            ItemState::Active | ItemState::Persistent => {
                self.display.hide(&id, HideReason::Unseen);
                if has_quest {
                    self.quests.remove_quest(&id);
                }
                let props = self.current_properties();
                emitted = self.run_hook(key, Hook::Cleanup, &props);
            }
            ItemState::Completed => {}
        }

        self.move_item(key, ItemState::Unseen);
        if let Some(item) = self.registry.get_mut(key) {
            item.properties = None;
            item.hidden = false;
        }
        self.persistence.write_state(&id, ItemState::Unseen);
        info!(item = %id, from = ?state, "unseen");
        self.dispatch_emitted(emitted);
    }

    /// A clean slate: every item Unseen, in storage as well.
    pub fn reset(&mut self) {
        self.display.hide_all(HideReason::Reset);
        let tracked: Vec<ItemId> = self
            .registry
            .iter()
            .filter(|(_, item)| item.state.is_live() && item.quest.is_some())
            .map(|(_, item)| item.id.clone())
            .collect();
        for id in &tracked {
            self.quests.remove_quest(id);
        }

        self.queue.take_all();
        self.registry.reset();
        let ids: Vec<ItemId> = self.registry.iter().map(|(_, item)| item.id.clone()).collect();
        for id in &ids {
            self.persistence.write_state(id, ItemState::Unseen);
        }
        self.environment.set_resting(None);
        info!(items = ids.len(), "tutorial reset");
    }

    /// One CSV line per item, after a header line.
    pub fn debug_dump(&self) -> Vec<String> {
        let mut lines = vec![DEBUG_DUMP_HEADER.to_string()];
        for (_, item) in self.registry.iter() {
            let title = item
                .display
                .as_ref()
                .and_then(|display| display.title())
                .map_or_else(|| "n/a".to_string(), |title| title.replace(',', " "));
            let advisor = item.advisor().map_or("n/a", |advisor| advisor.name());
            let quest = if item.quest.is_some() { "y" } else { "n" };
            lines.push(format!(
                "{},{:?},{},{},{}",
                item.id, item.state, title, advisor, quest
            ));
        }
        lines
    }
}

//! Event routing: the single entry point for host engine callbacks and UI
//! custom events, plus the inbound display and lower callbacks.

use serde_json::Value;
use tracing::{debug, warn};

use tutorial_rules::{EnvironmentProperties, EventPayload, ItemState};

use super::guard::{self, Check};
use super::TutorialManager;
use crate::display::LowerEvent;
use crate::registry::ItemKey;

impl TutorialManager {
    /// Handle an event.
    ///
    /// Within one dispatch, shown items complete before resident ones, which
    /// complete before anything new activates. Events are handled even with
    /// the tutorial off so items still settle as completed.
    pub fn dispatch(&mut self, event_name: &str, payload: impl Into<EventPayload>) {
        if event_name == self.config.turn_begin_event {
            self.is_local_player_turn = true;
        }
        let props = EnvironmentProperties::new(
            event_name,
            payload.into(),
            self.host.local_player(),
            self.is_local_player_turn,
        );
        debug!(
            event = event_name,
            player = %props.player,
            alt_player = %props.alt_player,
            depth = self.environment.depth(),
            "dispatch"
        );

        self.in_environment(props.clone(), |manager| manager.route(&props));
    }

    /// Handle a custom event raised by the user interface.
    pub fn dispatch_interface(&mut self, event_name: &str, data: Value) {
        self.dispatch(event_name, EventPayload::interface(data));
    }

    fn route(&mut self, props: &EnvironmentProperties) {
        let name = props.event_name.as_str();
        if name == self.config.turn_end_event {
            self.end_turn();
        }
        if name == self.config.autoplay_started_event {
            self.autoplay_started();
        }

        let mut completed = self.complete_matching(ItemState::Active, props);
        completed.extend(self.complete_matching(ItemState::Persistent, props));
        self.report_completed_obsolete(&completed, props);
        self.obsolete_persistent(props);

        if name == self.config.game_started_event {
            self.activate_welcome(props);
        }
        let activated = self.activate_matching(props);

        self.refresh_hidden(props);
        self.rest_environment();
        debug!(event = name, completed = completed.len(), activated, "dispatch handled");
    }

    /// Complete items of a collection waiting for this event, back to front.
    fn complete_matching(&mut self, state: ItemState, props: &EnvironmentProperties) -> Vec<ItemKey> {
        let keys = self.registry.keys_in(state).to_vec();
        let mut completed = Vec::new();
        for key in keys.into_iter().rev() {
            let Some(item) = self.registry.get(key) else {
                continue;
            };
            // A nested dispatch may already have moved it
            if item.state != state || !item.completes_on_event(&props.event_name) {
                continue;
            }
            if guard::evaluate(item, Check::Completion, props) == Some(true) {
                self.complete_key(key);
                completed.push(key);
            }
        }
        completed
    }

    /// Completion wins over obsolescence; flag items where both fired.
    fn report_completed_obsolete(&self, completed: &[ItemKey], props: &EnvironmentProperties) {
        for item in completed.iter().filter_map(|key| self.registry.get(*key)) {
            if item.obsolete_check.is_none() {
                continue;
            }
            if guard::evaluate(item, Check::Obsolescence, props) == Some(true) {
                warn!(item = %item.id, event = %props.event_name, "item completed and obsolete in the same dispatch; completion wins");
            }
        }
    }

    /// Second pass over resident items, after this dispatch's completions.
    fn obsolete_persistent(&mut self, props: &EnvironmentProperties) {
        let keys = self.registry.keys_in(ItemState::Persistent).to_vec();
        for key in keys.into_iter().rev() {
            let Some(item) = self.registry.get(key) else {
                continue;
            };
            if item.state != ItemState::Persistent || item.obsolete_check.is_none() {
                continue;
            }
            if guard::evaluate(item, Check::Obsolescence, props) == Some(true) {
                self.obsolete_resident(key);
            }
        }
    }

    /// The welcome instructions go ahead of anything else starting the game.
    fn activate_welcome(&mut self, props: &EnvironmentProperties) {
        let Some(key) = self.registry.welcome() else {
            return;
        };
        if self
            .registry
            .get(key)
            .is_some_and(|item| item.state == ItemState::Unseen)
        {
            self.try_activate(key, props);
        }
    }

    /// Activate unseen items triggered by this event; retire obsolete ones.
    ///
    /// Candidates are collected walking back to front, then activation is
    /// attempted in registration order so earlier items claim the slot first.
    fn activate_matching(&mut self, props: &EnvironmentProperties) -> usize {
        let mut triggered = Vec::new();
        let mut obsolete = Vec::new();
        for &key in self.registry.keys_in(ItemState::Unseen).iter().rev() {
            let Some(item) = self.registry.get(key) else {
                continue;
            };
            if self.queue.contains(key) {
                continue;
            }
            if item.runs_in_environment(props) {
                triggered.push(key);
            } else if item.obsolete_check.is_some()
                && guard::evaluate(item, Check::Obsolescence, props) == Some(true)
            {
                obsolete.push(key);
            }
        }

        for key in obsolete {
            self.retire(key);
        }

        let mut activated = 0;
        for key in triggered.into_iter().rev() {
            let unseen = self
                .registry
                .get(key)
                .is_some_and(|item| item.state == ItemState::Unseen);
            if unseen && self.try_activate(key, props) {
                activated += 1;
            }
        }
        activated
    }

    /// Ask each displayed item whether it should get out of the way right now.
    fn refresh_hidden(&mut self, props: &EnvironmentProperties) {
        let shown: Vec<ItemKey> = self
            .registry
            .keys_in(ItemState::Active)
            .iter()
            .chain(self.registry.keys_in(ItemState::Persistent))
            .copied()
            .filter(|key| {
                self.registry.get(*key).is_some_and(|item| {
                    item.hide_check.is_some() && self.display.is_showing(&item.id)
                })
            })
            .collect();

        for key in shown {
            let Some(item) = self.registry.get(key) else {
                continue;
            };
            let Some(hide) = guard::evaluate(item, Check::Hiding, props) else {
                continue;
            };
            if hide == item.hidden {
                continue;
            }
            let id = item.id.clone();
            if let Some(item) = self.registry.get_mut(key) {
                item.hidden = hide;
            }
            self.display.set_hidden(&id, hide);
        }
    }

    /// Keep the environment of the item on screen inspectable between events.
    fn rest_environment(&mut self) {
        let current = self
            .registry
            .keys_in(ItemState::Active)
            .first()
            .copied()
            .or_else(|| {
                let last = self.display.last_item_id()?;
                self.registry.find_in(last, ItemState::Persistent)
            });
        let resting = current
            .and_then(|key| self.registry.get(key))
            .and_then(|item| item.properties.clone());
        self.environment.set_resting(resting);
    }

    /// The user interface lowered an item, or everything.
    ///
    /// A closed item completes, optionally with a new next id. Otherwise only
    /// its display goes away and the item stays where it is.
    pub fn lower(&mut self, event: LowerEvent) {
        if let Some(id) = &event.item_id {
            let key = self
                .registry
                .find_in(id, ItemState::Active)
                .or_else(|| self.registry.find_in(id, ItemState::Persistent));
            match key {
                Some(key) => {
                    if event.closed {
                        if let (Some(next_id), Some(item)) =
                            (event.next_id.clone(), self.registry.get_mut(key))
                        {
                            debug!(item = %item.id, next = %next_id, "next id overridden by lower event");
                            item.next_id = Some(next_id);
                        }
                        self.complete_key(key);
                    } else {
                        self.display.lower(Some(id));
                    }
                }
                None => {
                    warn!(item = %id, "lower event for an item that is not active");
                    self.display.lower(Some(id));
                }
            }
            return;
        }
        self.display.lower(None);
    }

    /// The display layer pulled everything off screen on its own.
    pub fn display_suspended(&mut self) {
        self.display.suspend();
    }

    /// The display layer is back; suspended items are shown again.
    pub fn display_resumed(&mut self) {
        self.display.resume();
    }
}

//! The tutorial manager - an explicit context object owning the registry, the
//! queue and the environment, with its collaborators injected.
//!
//! The work is spread over a few files: `router` handles incoming events,
//! `lifecycle` moves items through their states and `debug` holds the
//! inspector surface.

mod debug;
mod guard;
mod lifecycle;
mod router;


pub use debug::DEBUG_DUMP_HEADER;

use serde_json::json;
use tracing::{debug, error, info, warn};

use tutorial_rules::{
    EnvironmentProperties, EventPayload, ItemId, ItemModifiers, ItemState, PlayerId,
    TutorialConfig, TutorialItem, TutorialLevel,
};

use crate::activation::ActivationQueue;
use crate::collaborators::{HostContext, LogTelemetry, NullQuestTracker, QuestTracker, Telemetry};
use crate::display::{DisplayBridge, DisplayQueue};
use crate::environment::EnvironmentContext;
use crate::error::TutorialError;
use crate::persistence::{PersistenceGateway, PersistenceStore};
use crate::registry::{ItemKey, ItemRegistry};

/// Drives tutorial items through their lifecycle in response to host events.
pub struct TutorialManager {
    config: TutorialConfig,
    /// Level in effect; `None` in multiplayer whatever the configuration says.
    level: TutorialLevel,
    host: Box<dyn HostContext>,
    registry: ItemRegistry,
    queue: ActivationQueue,
    environment: EnvironmentContext,
    persistence: PersistenceGateway,
    display: DisplayBridge,
    quests: Box<dyn QuestTracker>,
    telemetry: Box<dyn Telemetry>,
    is_local_player_turn: bool,
}

impl TutorialManager {
    /// Create a manager. Version information of the store is checked right away.
    pub fn new(
        config: TutorialConfig,
        host: Box<dyn HostContext>,
        display: Box<dyn DisplayQueue>,
        store: Box<dyn PersistenceStore>,
    ) -> Self {
        let level = config.effective_level(host.is_multiplayer());
        let mut persistence = PersistenceGateway::new(store, config.item_key_prefix.clone());
        if persistence.check_versions().is_err() {
            warn!("continuing with tutorial data from a newer version");
        }
        info!(?level, multiplayer = host.is_multiplayer(), "tutorial manager created");

        Self {
            level,
            is_local_player_turn: host.is_local_player_turn(),
            environment: EnvironmentContext::new(config.max_environment_depth),
            config,
            host,
            registry: ItemRegistry::new(),
            queue: ActivationQueue::new(),
            persistence,
            display: DisplayBridge::new(display),
            quests: Box::new(NullQuestTracker),
            telemetry: Box::new(LogTelemetry),
        }
    }

    pub fn with_quest_tracker(mut self, quests: impl QuestTracker + 'static) -> Self {
        self.quests = Box::new(quests);
        self
    }

    pub fn with_telemetry(mut self, telemetry: impl Telemetry + 'static) -> Self {
        self.telemetry = Box::new(telemetry);
        self
    }

    /// Add an item to the catalog. It takes part once its group is processed.
    pub fn register(&mut self, item: TutorialItem, modifiers: ItemModifiers) -> Option<ItemKey> {
        self.registry
            .register(item, modifiers, self.host.is_multiplayer())
    }

    /// Process the items of a newly registered group.
    ///
    /// Resolves overwrites, restores each new item's stored state without
    /// evaluating any of its checks, then activates items waiting on the UI
    /// being ready.
    pub fn process(&mut self, group: &str) -> Result<(), TutorialError> {
        let group_hash = match self.registry.resolve_overwrites(group) {
            Ok(hash) => hash,
            Err(err) => {
                error!(error = %err, "process");
                return Err(err);
            }
        };

        let pending: Vec<ItemKey> = self.registry.keys_in(ItemState::Unseen).to_vec();
        let mut processed = 0;
        for key in pending.into_iter().rev() {
            let Some(item) = self.registry.get_mut(key) else {
                continue;
            };
            if item.processed {
                continue;
            }
            item.group.get_or_insert(group_hash);
            let id = item.id.clone();

            if self.persistence.needs_migration() {
                self.persistence.migrate(&id);
            }
            match self.persistence.read_state(&id) {
                ItemState::Completed => self.restore_completed(key),
                ItemState::Persistent => self.restore_persistent(key),
                _ => {}
            }
            if let Some(item) = self.registry.get_mut(key) {
                item.processed = true;
            }
            processed += 1;
        }
        debug!(group, processed, "group processed");

        self.activate_late_items();
        Ok(())
    }

    /// Activate items listening for the UI being ready that were registered
    /// after it happened.
    fn activate_late_items(&mut self) {
        if !self.host.is_ui_ready() {
            return;
        }
        let props = EnvironmentProperties {
            event_name: self.config.ui_ready_event.clone(),
            payload: EventPayload::interface(json!({})),
            player: self.host.local_player(),
            alt_player: PlayerId::NONE,
            is_local_player_turn: true,
        };
        let late: Vec<ItemKey> = self
            .registry
            .keys_in(ItemState::Unseen)
            .iter()
            .rev()
            .copied()
            .filter(|key| {
                self.registry
                    .get(*key)
                    .is_some_and(|item| item.activates_on_event(&props.event_name))
            })
            .collect();

        for key in late {
            self.in_environment(props.clone(), |manager| {
                manager.try_activate(key, &props);
            });
        }
    }

    /// Run `f` inside an environment scope; the scope is always released.
    fn in_environment<R>(
        &mut self,
        properties: EnvironmentProperties,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.environment.push(properties);
        let result = f(self);
        self.environment.pop();
        result
    }

    /// Properties of the current scope, or detached ones outside of any.
    fn current_properties(&self) -> EnvironmentProperties {
        self.environment
            .current()
            .cloned()
            .unwrap_or_else(|| EnvironmentProperties::detached(self.host.local_player()))
    }

    fn move_item(&mut self, key: ItemKey, to: ItemState) {
        if let Err(err) = self.registry.transition(key, to) {
            error!(error = %err, "transition");
        }
    }

    fn queued_key(&self, id: &ItemId) -> Option<ItemKey> {
        self.queue
            .keys()
            .into_iter()
            .find(|key| self.registry.get(*key).is_some_and(|item| &item.id == id))
    }

    fn slot_occupied(&self) -> bool {
        self.registry.count(ItemState::Active) > 0
    }

    fn ids(&self, keys: &[ItemKey]) -> Vec<ItemId> {
        keys.iter()
            .filter_map(|key| self.registry.get(*key))
            .map(|item| item.id.clone())
            .collect()
    }

    // Queries

    pub fn state_of(&self, id: &ItemId) -> Option<ItemState> {
        self.item(id).map(|item| item.state)
    }

    pub fn item(&self, id: &ItemId) -> Option<&TutorialItem> {
        self.registry.find(id).and_then(|key| self.registry.get(key))
    }

    pub fn is_item_completed(&self, id: &ItemId) -> bool {
        self.registry.find_in(id, ItemState::Completed).is_some()
    }

    pub fn total_completed(&self) -> usize {
        self.registry.count(ItemState::Completed)
    }

    pub fn active_ids(&self) -> Vec<ItemId> {
        self.ids(self.registry.keys_in(ItemState::Active))
    }

    pub fn persistent_ids(&self) -> Vec<ItemId> {
        self.ids(self.registry.keys_in(ItemState::Persistent))
    }

    /// Queued items in activation order.
    pub fn queued_ids(&self) -> Vec<ItemId> {
        self.ids(&self.queue.keys())
    }

    /// Environment of the event being handled, or of the item on screen
    /// between events.
    pub fn environment(&self) -> Option<&EnvironmentProperties> {
        self.environment.current()
    }

    pub fn environment_depth(&self) -> usize {
        self.environment.depth()
    }

    /// Event names the host should forward to `dispatch`.
    pub fn interested_events(&self) -> Vec<String> {
        self.registry.interested_events()
    }

    pub fn tutorial_level(&self) -> TutorialLevel {
        self.level
    }

    pub fn config(&self) -> &TutorialConfig {
        &self.config
    }

    pub fn registry(&self) -> &ItemRegistry {
        &self.registry
    }

    pub fn persistence(&self) -> &PersistenceGateway {
        &self.persistence
    }

    pub fn display(&self) -> &DisplayBridge {
        &self.display
    }

    pub fn is_local_player_turn(&self) -> bool {
        self.is_local_player_turn
    }

    /// Check that every item is held by exactly one collection and that at
    /// most one item holds the active slot.
    pub fn check_invariants(&self) -> Result<(), TutorialError> {
        self.registry.check_invariants(&self.queue.keys())
    }
}

impl std::fmt::Debug for TutorialManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorialManager")
            .field("level", &self.level)
            .field("registry", &self.registry)
            .field("queue", &self.queue)
            .field("environment", &self.environment)
            .field("persistence", &self.persistence)
            .field("display", &self.display)
            .field("is_local_player_turn", &self.is_local_player_turn)
            .finish_non_exhaustive()
    }
}

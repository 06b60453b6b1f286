//! Tutorial item definitions - one "unit" of tutorial content.

mod capabilities;
mod display;

pub use capabilities::*;
pub use display::*;

use serde::{Deserialize, Serialize};

use crate::environment::{EnvironmentProperties, PlayerId};
use crate::settings::TutorialLevel;

/// Unique identifier for tutorial items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A next id a callout can answer with to cancel the chain.
pub const NEXT_ITEM_CANCELED: &str = "NextItemCanceled";

/// How an item behaves once activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ItemKind {
    /// Only exists for the turn; auto-completes at the end of it.
    #[default]
    PerTurn,
    /// Stays resident across turns and doesn't block other items.
    Persistent,
    /// Persistent and shown in the quest tracker.
    Tracked,
    /// Tracked, and processed even when the tutorial itself is off.
    Legacy,
}

impl ItemKind {
    pub fn is_persistent(&self) -> bool {
        !matches!(self, ItemKind::PerTurn)
    }

    pub fn is_tracked(&self) -> bool {
        matches!(self, ItemKind::Tracked | ItemKind::Legacy)
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, ItemKind::Legacy)
    }
}

/// The state of a tutorial item.
///
/// Ordinals are written to save files; only append new values at the end.
/// `Queued` is runtime only and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ItemState {
    /// Not shown to the player yet.
    #[default]
    Unseen = 0,
    /// Being shown; holds the single active slot until completed.
    Active = 1,
    /// No longer shown.
    Completed = 2,
    /// Shown (or silently resident) across turns without holding the slot.
    Persistent = 3,
    /// Waiting for the active slot to free up.
    Queued = 4,
}

impl ItemState {
    /// Value written to storage.
    pub fn stored_value(self) -> i64 {
        self as i64
    }

    /// Decode a stored value. Unknown values and `Queued` are not restorable.
    pub fn from_stored(value: i64) -> Option<Self> {
        match value {
            0 => Some(ItemState::Unseen),
            1 => Some(ItemState::Active),
            2 => Some(ItemState::Completed),
            3 => Some(ItemState::Persistent),
            _ => None,
        }
    }

    /// Is the item currently shown (or resident)?
    pub fn is_live(self) -> bool {
        matches!(self, ItemState::Active | ItemState::Persistent)
    }
}

/// One unit of tutorial content: its rules, its payload and its runtime state.
pub struct TutorialItem {
    pub id: ItemId,

    /// Item to auto-deliver once this one completes.
    pub next_id: Option<ItemId>,

    /// Companion item activated alongside this one.
    pub also_activate_id: Option<ItemId>,

    /// Minimum tutorial level for the item to be displayed.
    pub level: TutorialLevel,

    pub kind: ItemKind,

    /// Higher versions overwrite lower ones with the same id.
    pub version: u32,

    /// Hash of the group the item was processed in.
    pub group: Option<u32>,

    /// Skipped items complete silently instead of activating.
    pub skip: bool,

    /// Evaluate activation outside of the local player's turn too.
    pub run_all_turns: bool,

    /// Players the item is valid for; empty means any player.
    pub allowed_players: Vec<PlayerId>,

    /// Engine or custom events that activate the item.
    pub activation_events: Vec<String>,

    /// Engine or custom events that start the completion check.
    pub completion_events: Vec<String>,

    pub display: Option<DisplayPayload>,

    /// UI selectors to highlight while the item is shown.
    pub highlights: Vec<String>,

    /// Map plots to draw attention to while the item is shown.
    pub highlight_plots: Vec<u32>,

    /// Quest tracker contents; makes the item tracked.
    pub quest: Option<QuestDefinition>,

    pub activation_check: Option<Box<dyn Activatable>>,
    pub completion_check: Option<Box<dyn Completable>>,
    pub obsolete_check: Option<Box<dyn Obsoletable>>,
    pub hide_check: Option<Box<dyn Hideable>>,
    pub on_activate: Option<Box<dyn ItemHook>>,
    pub on_cleanup: Option<Box<dyn ItemHook>>,

    // Runtime state
    pub state: ItemState,
    /// Environment the item was activated (or queued) from.
    pub properties: Option<EnvironmentProperties>,
    pub hidden: bool,
    pub processed: bool,
}

impl TutorialItem {
    /// Create a new per-turn item with the given id.
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            next_id: None,
            also_activate_id: None,
            level: TutorialLevel::TutorialOn,
            kind: ItemKind::PerTurn,
            version: 0,
            group: None,
            skip: false,
            run_all_turns: false,
            allowed_players: Vec::new(),
            activation_events: Vec::new(),
            completion_events: Vec::new(),
            display: None,
            highlights: Vec::new(),
            highlight_plots: Vec::new(),
            quest: None,
            activation_check: None,
            completion_check: None,
            obsolete_check: None,
            hide_check: None,
            on_activate: None,
            on_cleanup: None,
            state: ItemState::Unseen,
            properties: None,
            hidden: false,
            processed: false,
        }
    }

    pub fn with_next(mut self, next_id: impl Into<ItemId>) -> Self {
        self.next_id = Some(next_id.into());
        self
    }

    pub fn also_activating(mut self, id: impl Into<ItemId>) -> Self {
        self.also_activate_id = Some(id.into());
        self
    }

    pub fn with_level(mut self, level: TutorialLevel) -> Self {
        self.level = level;
        self
    }

    /// Make the item persistent (unless it is already tracked).
    pub fn persistent(mut self) -> Self {
        if !self.kind.is_persistent() {
            self.kind = ItemKind::Persistent;
        }
        self
    }

    /// Attach quest contents; victory quests become legacy items.
    pub fn with_quest(mut self, quest: QuestDefinition) -> Self {
        self.kind = if quest.victory {
            ItemKind::Legacy
        } else {
            ItemKind::Tracked
        };
        self.quest = Some(quest);
        self
    }

    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn runs_all_turns(mut self) -> Self {
        self.run_all_turns = true;
        self
    }

    pub fn for_players(mut self, players: impl IntoIterator<Item = PlayerId>) -> Self {
        self.allowed_players.extend(players);
        self
    }

    pub fn activates_on(mut self, event: impl Into<String>) -> Self {
        self.activation_events.push(event.into());
        self
    }

    pub fn completes_on(mut self, event: impl Into<String>) -> Self {
        self.completion_events.push(event.into());
        self
    }

    pub fn with_display(mut self, display: DisplayPayload) -> Self {
        self.display = Some(display);
        self
    }

    pub fn with_highlights(mut self, selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.highlights.extend(selectors.into_iter().map(Into::into));
        self
    }

    pub fn with_highlight_plots(mut self, plots: impl IntoIterator<Item = u32>) -> Self {
        self.highlight_plots.extend(plots);
        self
    }

    pub fn with_activation_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&TutorialItem, &EnvironmentProperties) -> CheckResult + 'static,
    {
        self.activation_check = Some(Box::new(check));
        self
    }

    pub fn with_completion_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&TutorialItem, &EnvironmentProperties) -> CheckResult + 'static,
    {
        self.completion_check = Some(Box::new(check));
        self
    }

    pub fn with_obsolete_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&TutorialItem, &EnvironmentProperties) -> CheckResult + 'static,
    {
        self.obsolete_check = Some(Box::new(check));
        self
    }

    pub fn with_hide_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&TutorialItem, &EnvironmentProperties) -> CheckResult + 'static,
    {
        self.hide_check = Some(Box::new(check));
        self
    }

    pub fn on_activate<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TutorialItem, &mut HookContext) -> Result<(), CheckError> + 'static,
    {
        self.on_activate = Some(Box::new(hook));
        self
    }

    pub fn on_cleanup<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TutorialItem, &mut HookContext) -> Result<(), CheckError> + 'static,
    {
        self.on_cleanup = Some(Box::new(hook));
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.kind.is_persistent()
    }

    pub fn is_tracked(&self) -> bool {
        self.kind.is_tracked()
    }

    pub fn is_legacy(&self) -> bool {
        self.kind.is_legacy()
    }

    pub fn is_victory_quest(&self) -> bool {
        self.quest.as_ref().is_some_and(|quest| quest.victory)
    }

    /// Check if an event is one of the item's activation triggers.
    pub fn activates_on_event(&self, event_name: &str) -> bool {
        self.activation_events.iter().any(|name| name == event_name)
    }

    /// Check if an event is one of the item's completion triggers.
    pub fn completes_on_event(&self, event_name: &str) -> bool {
        self.completion_events.iter().any(|name| name == event_name)
    }

    /// Is the environment compatible with the item's activation rules?
    ///
    /// Items only activate during the local player's turn unless they run on
    /// all turns. An item with no activation events never matches; it can
    /// only be reached through a chain.
    pub fn runs_in_environment(&self, env: &EnvironmentProperties) -> bool {
        if !env.is_local_player_turn && !self.run_all_turns {
            return false;
        }
        self.activates_on_event(&env.event_name)
    }

    /// Check the player filter; an empty filter accepts any player.
    pub fn allows_players(&self, env: &EnvironmentProperties) -> bool {
        self.allowed_players.is_empty()
            || self
                .allowed_players
                .iter()
                .any(|player| env.involves(*player))
    }

    pub fn advisor(&self) -> Option<AdvisorType> {
        self.display.as_ref().and_then(DisplayPayload::advisor)
    }
}

impl std::fmt::Debug for TutorialItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorialItem")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("version", &self.version)
            .field("level", &self.level)
            .field("next_id", &self.next_id)
            .field("also_activate_id", &self.also_activate_id)
            .field("activation_events", &self.activation_events)
            .field("completion_events", &self.completion_events)
            .field("display", &self.display.as_ref().map(DisplayPayload::kind))
            .finish_non_exhaustive()
    }
}

/// Meta data applied to an item when it is registered.
#[derive(Default)]
pub struct ItemModifiers {
    /// Item auto-shows at game start as the welcome instructions.
    pub is_welcome_instructions: bool,

    /// Version used to resolve overwrites of the same id.
    pub version: Option<u32>,

    /// Decides whether the item is delivered into the manager at all.
    pub can_deliver: Option<Box<dyn Fn(&TutorialItem) -> bool>>,
}

impl ItemModifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn welcome(mut self) -> Self {
        self.is_welcome_instructions = true;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_delivery_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&TutorialItem) -> bool + 'static,
    {
        self.can_deliver = Some(Box::new(check));
        self
    }
}

impl std::fmt::Debug for ItemModifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemModifiers")
            .field("is_welcome_instructions", &self.is_welcome_instructions)
            .field("version", &self.version)
            .field("can_deliver", &self.can_deliver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::EventPayload;

    fn env(event: &str, local_turn: bool) -> EnvironmentProperties {
        EnvironmentProperties::new(event, EventPayload::empty(), PlayerId(0), local_turn)
    }

    #[test]
    fn test_new_item_defaults() {
        let item = TutorialItem::new("intro");
        assert_eq!(item.id.as_str(), "intro");
        assert_eq!(item.state, ItemState::Unseen);
        assert_eq!(item.level, TutorialLevel::TutorialOn);
        assert!(!item.is_persistent());
        assert!(item.allowed_players.is_empty());
    }

    #[test]
    fn test_quest_sets_kind() {
        let tracked = TutorialItem::new("a").with_quest(QuestDefinition::new("t", "d"));
        assert_eq!(tracked.kind, ItemKind::Tracked);
        assert!(tracked.is_persistent());
        assert!(!tracked.is_legacy());

        let legacy = TutorialItem::new("b").with_quest(QuestDefinition::new("t", "d").victory());
        assert!(legacy.is_legacy());
        assert!(legacy.is_victory_quest());

        // persistent() must not downgrade a tracked item
        let still_tracked = TutorialItem::new("c")
            .with_quest(QuestDefinition::new("t", "d"))
            .persistent();
        assert_eq!(still_tracked.kind, ItemKind::Tracked);
    }

    #[test]
    fn test_runs_in_environment() {
        let item = TutorialItem::new("a").activates_on("TurnBegin");
        assert!(item.runs_in_environment(&env("TurnBegin", true)));
        assert!(!item.runs_in_environment(&env("TurnBegin", false)));
        assert!(!item.runs_in_environment(&env("Other", true)));

        let any_turn = TutorialItem::new("b").activates_on("TurnBegin").runs_all_turns();
        assert!(any_turn.runs_in_environment(&env("TurnBegin", false)));
    }

    #[test]
    fn test_chain_only_item_never_matches() {
        let item = TutorialItem::new("chained");
        assert!(!item.runs_in_environment(&env("TurnBegin", true)));
    }

    #[test]
    fn test_player_filter() {
        let item = TutorialItem::new("a").for_players([PlayerId(2)]);
        let mut props = env("E", true);
        assert!(!item.allows_players(&props));

        props.alt_player = PlayerId(2);
        assert!(item.allows_players(&props));
    }

    #[test]
    fn test_stored_state_values() {
        assert_eq!(ItemState::Completed.stored_value(), 2);
        assert_eq!(ItemState::Persistent.stored_value(), 3);
        assert_eq!(ItemState::from_stored(2), Some(ItemState::Completed));
        assert_eq!(ItemState::from_stored(4), None);
        assert_eq!(ItemState::from_stored(-7), None);
    }
}

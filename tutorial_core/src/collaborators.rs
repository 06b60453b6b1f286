//! Host side collaborators the manager reports to or queries.

use tracing::info;
use tutorial_rules::{AdvisorType, ItemId, PlayerId, QuestDefinition};

/// What the manager needs to know about the running game.
pub trait HostContext {
    fn is_multiplayer(&self) -> bool;

    /// Autoplay (simulation) completes content instead of showing it.
    fn is_autoplay(&self) -> bool;

    fn local_player(&self) -> PlayerId;

    /// Is it the local player's turn when the manager is created?
    fn is_local_player_turn(&self) -> bool {
        true
    }

    /// Has the user interface finished loading?
    fn is_ui_ready(&self) -> bool {
        true
    }
}

/// A fixed single player host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalHost {
    pub local_player: PlayerId,
    pub multiplayer: bool,
    pub autoplay: bool,
}

impl LocalHost {
    pub fn new(local_player: PlayerId) -> Self {
        Self {
            local_player,
            multiplayer: false,
            autoplay: false,
        }
    }
}

impl HostContext for LocalHost {
    fn is_multiplayer(&self) -> bool {
        self.multiplayer
    }

    fn is_autoplay(&self) -> bool {
        self.autoplay
    }

    fn local_player(&self) -> PlayerId {
        self.local_player
    }
}

/// Receives quests of tracked items.
pub trait QuestTracker {
    fn add_quest(&mut self, item: &ItemId, quest: &QuestDefinition);
    fn remove_quest(&mut self, item: &ItemId);
}

/// Receives one record per item activation.
pub trait Telemetry {
    fn record_activation(&mut self, item: &ItemId, advisor: Option<AdvisorType>);
}

/// Quest tracker that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullQuestTracker;

impl QuestTracker for NullQuestTracker {
    fn add_quest(&mut self, _item: &ItemId, _quest: &QuestDefinition) {}
    fn remove_quest(&mut self, _item: &ItemId) {}
}

/// Telemetry written to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTelemetry;

impl Telemetry for LogTelemetry {
    fn record_activation(&mut self, item: &ItemId, advisor: Option<AdvisorType>) {
        info!(
            item = %item,
            advisor = advisor.map_or("", |a| a.name()),
            "tutorial item triggered"
        );
    }
}

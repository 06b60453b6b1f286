//! Tutorial levels and manager configuration.

use serde::{Deserialize, Serialize};

/// Tutorial items are associated with a level; the higher the level the more
/// content the player sees. Items above the running level complete silently.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum TutorialLevel {
    /// Tutorial system is off.
    None = 0,
    /// Only advisor warnings are shown.
    WarningsOnly = 2,
    /// All tutorial content is shown.
    #[default]
    TutorialOn = 4,
}

/// Configuration for a tutorial manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorialConfig {
    /// Level the player selected.
    pub tutorial_level: TutorialLevel,

    /// Nesting depth of environment scopes above which a leak is reported.
    pub max_environment_depth: usize,

    /// Event that starts the local player's turn.
    pub turn_begin_event: String,

    /// Event that ends the local player's turn; drains the active slot.
    pub turn_end_event: String,

    /// Event that raises the welcome instructions ahead of everything else.
    pub game_started_event: String,

    /// Event signalling that autoplay took over.
    pub autoplay_started_event: String,

    /// Custom event used by items that must activate once the UI is ready.
    pub ui_ready_event: String,

    /// Prefix applied to item ids when reading and writing stored state.
    pub item_key_prefix: String,
}

impl Default for TutorialConfig {
    fn default() -> Self {
        Self {
            tutorial_level: TutorialLevel::TutorialOn,
            max_environment_depth: 5,
            turn_begin_event: "TurnBegin".to_string(),
            turn_end_event: "TurnEnd".to_string(),
            game_started_event: "GameStarted".to_string(),
            autoplay_started_event: "AutoplayStarted".to_string(),
            ui_ready_event: "user-interface-loaded-and-ready".to_string(),
            item_key_prefix: "__ITEM-".to_string(),
        }
    }
}

impl TutorialConfig {
    /// Create a configuration with the given tutorial level.
    pub fn with_level(level: TutorialLevel) -> Self {
        Self {
            tutorial_level: level,
            ..Default::default()
        }
    }

    /// Load configuration from TOML. Missing keys fall back to defaults.
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// Level actually in effect; multiplayer games run with the tutorial off.
    pub fn effective_level(&self, is_multiplayer: bool) -> TutorialLevel {
        if is_multiplayer {
            TutorialLevel::None
        } else {
            self.tutorial_level
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(TutorialLevel::None < TutorialLevel::WarningsOnly);
        assert!(TutorialLevel::WarningsOnly < TutorialLevel::TutorialOn);
    }

    #[test]
    fn test_config_from_partial_toml() {
        let config = TutorialConfig::from_toml(
            r#"
            tutorial_level = "warnings-only"
            turn_end_event = "LocalPlayerTurnEnd"
            "#,
        )
        .unwrap();

        assert_eq!(config.tutorial_level, TutorialLevel::WarningsOnly);
        assert_eq!(config.turn_end_event, "LocalPlayerTurnEnd");
        assert_eq!(config.turn_begin_event, "TurnBegin");
        assert_eq!(config.max_environment_depth, 5);
    }

    #[test]
    fn test_multiplayer_disables_tutorial() {
        let config = TutorialConfig::default();
        assert_eq!(config.effective_level(false), TutorialLevel::TutorialOn);
        assert_eq!(config.effective_level(true), TutorialLevel::None);
    }

    #[test]
    fn test_config_toml_keeps_prefix() {
        let config = TutorialConfig::with_level(TutorialLevel::None);
        let text = config.to_toml().unwrap();
        let back = TutorialConfig::from_toml(&text).unwrap();
        assert_eq!(back.item_key_prefix, "__ITEM-");
        assert_eq!(back.tutorial_level, TutorialLevel::None);
    }
}

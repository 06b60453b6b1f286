//! Display payloads: what an item shows while it is active.

use serde::{Deserialize, Serialize};

use super::ItemId;

/// Which advisor presents a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AdvisorType {
    #[default]
    Default,
    Military,
    Culture,
    Science,
    Economic,
}

impl AdvisorType {
    /// Short name used in logs and telemetry.
    pub fn name(&self) -> &'static str {
        match self {
            AdvisorType::Default => "default",
            AdvisorType::Military => "military",
            AdvisorType::Culture => "culture",
            AdvisorType::Science => "science",
            AdvisorType::Economic => "economic",
        }
    }
}

/// Where a callout is anchored when no host element is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorPosition {
    TopLeft,
    #[default]
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleCenter,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

/// The three kinds of display an item may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisplayKind {
    Dialog,
    Callout,
    QuestPanel,
}

/// Content shown for an item. An item carries at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DisplayPayload {
    /// Full screen series of pages.
    Dialog(DialogDefinition),
    /// Box anchored on top of the UI until dismissed.
    Callout(CalloutDefinition),
    /// Modal panel offering advisor paths.
    QuestPanel(QuestPanelDefinition),
}

impl DisplayPayload {
    pub fn kind(&self) -> DisplayKind {
        match self {
            DisplayPayload::Dialog(_) => DisplayKind::Dialog,
            DisplayPayload::Callout(_) => DisplayKind::Callout,
            DisplayPayload::QuestPanel(_) => DisplayKind::QuestPanel,
        }
    }

    /// Title of the content, if it has one.
    pub fn title(&self) -> Option<&str> {
        match self {
            DisplayPayload::Dialog(dialog) => dialog.pages.first().and_then(|p| p.title.as_deref()),
            DisplayPayload::Callout(callout) => callout.title.as_deref(),
            DisplayPayload::QuestPanel(panel) => Some(panel.title.as_str()),
        }
    }

    /// Advisor presenting the content (callouts only).
    pub fn advisor(&self) -> Option<AdvisorType> {
        match self {
            DisplayPayload::Callout(callout) => callout.advisor_type,
            _ => None,
        }
    }
}

/// A single page of a dialog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DialogPage {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: String,
    #[serde(default)]
    pub images: Vec<String>,
}

impl DialogPage {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// An ordered series of pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DialogDefinition {
    pub pages: Vec<DialogPage>,
}

impl DialogDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: DialogPage) -> Self {
        self.pages.push(page);
        self
    }
}

/// A button on a callout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalloutOption {
    /// Label on the button.
    pub text: String,
    /// Keyboard or gamepad action bound to the button.
    pub action_key: String,
    /// Does pressing this button close the callout?
    pub closes: bool,
    /// Item to chain to when this button is pressed.
    pub next_id: Option<ItemId>,
}

impl CalloutOption {
    pub fn new(text: impl Into<String>, action_key: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action_key: action_key.into(),
            closes: false,
            next_id: None,
        }
    }

    pub fn closing(mut self) -> Self {
        self.closes = true;
        self
    }

    pub fn with_next(mut self, next_id: impl Into<ItemId>) -> Self {
        self.next_id = Some(next_id.into());
        self
    }
}

/// Informational box that stays on top of the UI until dismissed or until a
/// completion condition is met.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CalloutDefinition {
    pub title: Option<String>,
    pub body: Option<String>,
    pub advisor_text: Option<String>,
    pub advisor_type: Option<AdvisorType>,
    #[serde(default)]
    pub anchor: AnchorPosition,
    #[serde(default)]
    pub options: Vec<CalloutOption>,
}

impl CalloutDefinition {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_advisor(mut self, advisor: AdvisorType, text: impl Into<String>) -> Self {
        self.advisor_type = Some(advisor);
        self.advisor_text = Some(text.into());
        self
    }

    pub fn with_anchor(mut self, anchor: AnchorPosition) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_option(mut self, option: CalloutOption) -> Self {
        self.options.push(option);
        self
    }

    /// Action keys bound to more than one option.
    pub fn duplicate_action_keys(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.options
            .iter()
            .filter(|option| !seen.insert(option.action_key.as_str()))
            .map(|option| option.action_key.clone())
            .collect()
    }
}

/// Modal panel asking the player to pick an advisor path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QuestPanelDefinition {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub advisors: Vec<AdvisorType>,
}

/// Contents of a quest tracker entry for tracked items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QuestDefinition {
    pub title: String,
    pub description: String,
    pub progress_type: Option<String>,
    pub goal: Option<u32>,
    /// Adds a cancel option to the triggering callout.
    pub cancelable: bool,
    /// Victory quests are legacy items: tracked even in multiplayer.
    pub victory: bool,
}

impl QuestDefinition {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn victory(mut self) -> Self {
        self.victory = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_kind_and_title() {
        let payload = DisplayPayload::Callout(
            CalloutDefinition::new("Move your settler").with_title("Settling"),
        );
        assert_eq!(payload.kind(), DisplayKind::Callout);
        assert_eq!(payload.title(), Some("Settling"));

        let dialog = DisplayPayload::Dialog(
            DialogDefinition::new().with_page(DialogPage::new("Welcome").with_title("Intro")),
        );
        assert_eq!(dialog.kind(), DisplayKind::Dialog);
        assert_eq!(dialog.title(), Some("Intro"));
    }

    #[test]
    fn test_duplicate_action_keys() {
        let callout = CalloutDefinition::new("body")
            .with_option(CalloutOption::new("Ok", "accept"))
            .with_option(CalloutOption::new("Later", "cancel"))
            .with_option(CalloutOption::new("Sure", "accept"));
        assert_eq!(callout.duplicate_action_keys(), vec!["accept".to_string()]);
    }

    #[test]
    fn test_payload_tagged_json() {
        let payload = DisplayPayload::Callout(
            CalloutDefinition::new("b").with_advisor(AdvisorType::Science, "Research!"),
        );
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "callout");
        assert_eq!(json["advisor_type"], "science");
    }
}

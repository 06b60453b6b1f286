//! Display Request Bridge - turns item state changes into show/hide requests
//! for an external display queue.
//!
//! The core never renders anything. It hands requests to a [`DisplayQueue`]
//! and keeps track of which are outstanding so that they can be restored after
//! the display layer suspends them (a higher priority modal, for example).

#[cfg(test)]
pub(crate) mod recording;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use tutorial_rules::{DisplayKind, DisplayPayload, ItemId, TutorialItem};

/// Why a request is taken off screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HideReason {
    /// The item completed.
    Completed,
    /// The item became obsolete while resident.
    Obsolete,
    /// The player lowered the display without completing the item.
    Lowered,
    /// Debug unsee.
    Unseen,
    /// Debug reset.
    Reset,
}

/// Everything the display layer needs to show an item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRequest {
    pub request_id: Uuid,
    pub item_id: ItemId,
    pub kind: DisplayKind,
    pub payload: DisplayPayload,
    /// Selectors to highlight while shown, cleared on hide.
    pub highlights: Vec<String>,
    pub highlight_plots: Vec<u32>,
}

impl DisplayRequest {
    /// Build a request for an item; items without a payload have none.
    pub fn for_item(item: &TutorialItem) -> Option<Self> {
        let payload = item.display.clone()?;
        Some(Self {
            request_id: Uuid::new_v4(),
            item_id: item.id.clone(),
            kind: payload.kind(),
            payload,
            highlights: item.highlights.clone(),
            highlight_plots: item.highlight_plots.clone(),
        })
    }
}

/// The external display queue.
pub trait DisplayQueue {
    fn show(&mut self, request: &DisplayRequest);
    fn hide(&mut self, request: &DisplayRequest, reason: HideReason);

    /// Transient visibility change of a request still on screen.
    fn set_hidden(&mut self, _request: &DisplayRequest, _hidden: bool) {}
}

/// A lower request raised by the user interface.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LowerEvent {
    /// Item to lower; none lowers everything on screen.
    pub item_id: Option<ItemId>,
    /// The player closed the item; it completes.
    #[serde(default)]
    pub closed: bool,
    /// Replaces the item's next id before completing.
    pub next_id: Option<ItemId>,
}

impl LowerEvent {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn item(id: impl Into<ItemId>) -> Self {
        Self {
            item_id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn closing(id: impl Into<ItemId>) -> Self {
        Self {
            item_id: Some(id.into()),
            closed: true,
            next_id: None,
        }
    }

    pub fn with_next(mut self, next_id: impl Into<ItemId>) -> Self {
        self.next_id = Some(next_id.into());
        self
    }
}

/// Keeps the external display queue in step with the items on screen.
pub struct DisplayBridge {
    queue: Box<dyn DisplayQueue>,
    /// Requests handed out and not yet hidden, in show order.
    outstanding: Vec<DisplayRequest>,
    /// Request ids the queue has actually been given.
    delivered: HashSet<Uuid>,
    suspended: bool,
    last_item_id: Option<ItemId>,
}

impl DisplayBridge {
    pub fn new(queue: Box<dyn DisplayQueue>) -> Self {
        Self {
            queue,
            outstanding: Vec::new(),
            delivered: HashSet::new(),
            suspended: false,
            last_item_id: None,
        }
    }

    /// Show an item's display payload. Returns false when it has none.
    ///
    /// While suspended the request is only remembered; it goes out on resume.
    pub fn show(&mut self, item: &TutorialItem) -> bool {
        let Some(request) = DisplayRequest::for_item(item) else {
            return false;
        };
        if self.hide(&item.id, HideReason::Lowered) {
            debug!(item = %item.id, "replacing outstanding display request");
        }

        self.last_item_id = Some(item.id.clone());
        if self.suspended {
            debug!(item = %item.id, "display suspended, request held");
        } else {
            self.queue.show(&request);
            self.delivered.insert(request.request_id);
        }
        self.outstanding.push(request);
        true
    }

    /// Drop an item's request if it has one outstanding. The queue only
    /// hears about requests it was given.
    pub fn hide(&mut self, id: &ItemId, reason: HideReason) -> bool {
        let Some(index) = self.outstanding.iter().position(|r| &r.item_id == id) else {
            return false;
        };
        let request = self.outstanding.remove(index);
        self.forward_hide(&request, reason);
        true
    }

    fn forward_hide(&mut self, request: &DisplayRequest, reason: HideReason) {
        if self.delivered.remove(&request.request_id) {
            self.queue.hide(request, reason);
        } else {
            debug!(item = %request.item_id, "request was never delivered, nothing to hide");
        }
    }

    /// Lower one item's display, or everything when no id is given.
    pub fn lower(&mut self, id: Option<&ItemId>) -> usize {
        let lowered = match id {
            Some(id) => usize::from(self.hide(id, HideReason::Lowered)),
            None => self.hide_all(HideReason::Lowered),
        };
        if lowered == 0 {
            warn!(item = ?id, "nothing on screen to lower");
        }
        lowered
    }

    /// Hide every outstanding request, newest first.
    pub fn hide_all(&mut self, reason: HideReason) -> usize {
        let requests: Vec<_> = self.outstanding.drain(..).rev().collect();
        for request in &requests {
            self.forward_hide(request, reason);
        }
        requests.len()
    }

    pub fn set_hidden(&mut self, id: &ItemId, hidden: bool) {
        let delivered = self
            .outstanding
            .iter()
            .find(|r| &r.item_id == id && self.delivered.contains(&r.request_id));
        if let Some(request) = delivered {
            self.queue.set_hidden(request, hidden);
        }
    }

    /// The display layer took everything off screen on its own. Nothing
    /// completes; outstanding requests come back on resume.
    pub fn suspend(&mut self) {
        if !self.suspended {
            debug!(outstanding = self.outstanding.len(), "display suspended");
        }
        self.suspended = true;
    }

    /// Restore every request held while suspended.
    pub fn resume(&mut self) {
        if !self.suspended {
            return;
        }
        self.suspended = false;
        for request in &self.outstanding {
            self.queue.show(request);
            self.delivered.insert(request.request_id);
        }
        debug!(restored = self.outstanding.len(), "display resumed");
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_showing(&self, id: &ItemId) -> bool {
        self.outstanding.iter().any(|r| &r.item_id == id)
    }

    pub fn outstanding(&self) -> &[DisplayRequest] {
        &self.outstanding
    }

    /// Last item a request was issued for.
    pub fn last_item_id(&self) -> Option<&ItemId> {
        self.last_item_id.as_ref()
    }
}

impl std::fmt::Debug for DisplayBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayBridge")
            .field("outstanding", &self.outstanding)
            .field("suspended", &self.suspended)
            .field("last_item_id", &self.last_item_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::recording::{DisplayCall, RecordingDisplay};
    use super::*;
    use tutorial_rules::CalloutDefinition;

    fn callout_item(id: &str) -> TutorialItem {
        TutorialItem::new(id)
            .with_display(DisplayPayload::Callout(CalloutDefinition::new("body")))
            .with_highlights(["#end-turn"])
    }

    #[test]
    fn test_request_carries_item_data() {
        let request = DisplayRequest::for_item(&callout_item("a")).unwrap();
        assert_eq!(request.item_id.as_str(), "a");
        assert_eq!(request.kind, DisplayKind::Callout);
        assert_eq!(request.highlights, vec!["#end-turn".to_string()]);

        assert!(DisplayRequest::for_item(&TutorialItem::new("plain")).is_none());
    }

    #[test]
    fn test_show_then_hide() {
        let display = RecordingDisplay::new();
        let mut bridge = DisplayBridge::new(Box::new(display.clone()));
        let item = callout_item("a");

        assert!(bridge.show(&item));
        assert!(bridge.is_showing(&item.id));
        assert!(bridge.hide(&item.id, HideReason::Completed));
        assert!(!bridge.hide(&item.id, HideReason::Completed));

        assert_eq!(
            display.calls(),
            vec![
                DisplayCall::Show(item.id.clone()),
                DisplayCall::Hide(item.id.clone(), HideReason::Completed),
            ]
        );
    }

    #[test]
    fn test_suspension_restores_requests() {
        let display = RecordingDisplay::new();
        let mut bridge = DisplayBridge::new(Box::new(display.clone()));
        let shown = callout_item("shown");
        bridge.show(&shown);

        bridge.suspend();
        let held = callout_item("held");
        bridge.show(&held);
        assert_eq!(display.shows(), 1);

        bridge.resume();
        assert_eq!(display.shows(), 3);
        assert_eq!(bridge.outstanding().len(), 2);
        assert_eq!(bridge.last_item_id(), Some(&held.id));
    }

    #[test]
    fn test_held_request_is_not_hidden() {
        let display = RecordingDisplay::new();
        let mut bridge = DisplayBridge::new(Box::new(display.clone()));
        let shown = callout_item("shown");
        bridge.show(&shown);

        bridge.suspend();
        let held = callout_item("held");
        bridge.show(&held);
        bridge.set_hidden(&held.id, true);
        assert!(bridge.hide(&held.id, HideReason::Completed));
        assert!(bridge.hide(&shown.id, HideReason::Completed));

        assert_eq!(
            display.calls(),
            vec![
                DisplayCall::Show(shown.id.clone()),
                DisplayCall::Hide(shown.id.clone(), HideReason::Completed),
            ]
        );

        bridge.resume();
        assert_eq!(display.shows(), 1);
    }

    #[test]
    fn test_lower_all() {
        let display = RecordingDisplay::new();
        let mut bridge = DisplayBridge::new(Box::new(display.clone()));
        bridge.show(&callout_item("a"));
        bridge.show(&callout_item("b"));

        assert_eq!(bridge.lower(None), 2);
        assert!(bridge.outstanding().is_empty());
        assert_eq!(bridge.lower(None), 0);
    }

    #[test]
    fn test_lower_event_json() {
        let event: LowerEvent =
            serde_json::from_str(r#"{ "item_id": "a", "closed": true, "next_id": "b" }"#).unwrap();
        assert_eq!(event, LowerEvent::closing("a").with_next("b"));

        let event: LowerEvent = serde_json::from_str(r#"{ "item_id": null, "next_id": null }"#).unwrap();
        assert_eq!(event, LowerEvent::all());
    }
}

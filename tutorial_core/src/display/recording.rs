//! A display queue that records what it was asked to do.

use std::cell::RefCell;
use std::rc::Rc;

use tutorial_rules::ItemId;

use super::{DisplayQueue, DisplayRequest, HideReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DisplayCall {
    Show(ItemId),
    Hide(ItemId, HideReason),
    SetHidden(ItemId, bool),
}

/// Cloning shares the call log, so a test keeps one handle while the bridge
/// owns the other.
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingDisplay {
    calls: Rc<RefCell<Vec<DisplayCall>>>,
}

impl RecordingDisplay {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn calls(&self) -> Vec<DisplayCall> {
        self.calls.borrow().clone()
    }

    pub(crate) fn shows(&self) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|call| matches!(call, DisplayCall::Show(_)))
            .count()
    }

    pub(crate) fn shown(&self, id: &str) -> bool {
        self.calls
            .borrow()
            .iter()
            .any(|call| matches!(call, DisplayCall::Show(item) if item.as_str() == id))
    }

    pub(crate) fn clear(&self) {
        self.calls.borrow_mut().clear();
    }
}

impl DisplayQueue for RecordingDisplay {
    fn show(&mut self, request: &DisplayRequest) {
        self.calls
            .borrow_mut()
            .push(DisplayCall::Show(request.item_id.clone()));
    }

    fn hide(&mut self, request: &DisplayRequest, reason: HideReason) {
        self.calls
            .borrow_mut()
            .push(DisplayCall::Hide(request.item_id.clone(), reason));
    }

    fn set_hidden(&mut self, request: &DisplayRequest, hidden: bool) {
        self.calls
            .borrow_mut()
            .push(DisplayCall::SetHidden(request.item_id.clone(), hidden));
    }
}

//! Environment context - the re-entrant scope describing which event is being
//! handled.
//!
//! Handling an event may complete an item whose hooks raise further events, so
//! scopes nest. Each scope is entered and left by the manager around a closure,
//! which keeps enter/leave balanced on every exit path.

use tracing::error;
use tutorial_rules::EnvironmentProperties;

use crate::error::TutorialError;

/// Stack of event scopes being handled, innermost last.
#[derive(Debug, Clone)]
pub struct EnvironmentContext {
    stack: Vec<EnvironmentProperties>,
    /// Snapshot kept between dispatches so the displayed item stays inspectable.
    resting: Option<EnvironmentProperties>,
    max_depth: usize,
}

impl EnvironmentContext {
    pub fn new(max_depth: usize) -> Self {
        Self {
            stack: Vec::new(),
            resting: None,
            max_depth,
        }
    }

    /// Enter a scope. Going above the maximum depth is reported, not refused.
    pub fn push(&mut self, properties: EnvironmentProperties) -> usize {
        let event = properties.event_name.clone();
        self.stack.push(properties);

        let depth = self.stack.len();
        if depth > self.max_depth {
            let err = TutorialError::EnvironmentOverflow {
                depth,
                max: self.max_depth,
                event,
            };
            error!(error = %err, "environment depth");
        }
        depth
    }

    /// Leave the innermost scope.
    pub fn pop(&mut self) -> Option<EnvironmentProperties> {
        let popped = self.stack.pop();
        if popped.is_none() {
            error!(error = %TutorialError::EnvironmentUnderflow, "environment depth");
        }
        popped
    }

    /// Current nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Properties of the innermost scope, or the resting snapshot outside of
    /// any dispatch.
    pub fn current(&self) -> Option<&EnvironmentProperties> {
        self.stack.last().or(self.resting.as_ref())
    }

    pub fn set_resting(&mut self, properties: Option<EnvironmentProperties>) {
        self.resting = properties;
    }

    pub fn resting(&self) -> Option<&EnvironmentProperties> {
        self.resting.as_ref()
    }
}

impl Default for EnvironmentContext {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutorial_rules::{EventPayload, PlayerId};

    fn props(name: &str) -> EnvironmentProperties {
        EnvironmentProperties::new(name, EventPayload::empty(), PlayerId(0), true)
    }

    #[test]
    fn test_nested_scopes() {
        let mut env = EnvironmentContext::default();
        assert_eq!(env.push(props("outer")), 1);
        assert_eq!(env.push(props("inner")), 2);
        assert_eq!(env.current().map(|p| p.event_name.as_str()), Some("inner"));

        env.pop();
        assert_eq!(env.current().map(|p| p.event_name.as_str()), Some("outer"));
        env.pop();
        assert_eq!(env.depth(), 0);
        assert!(env.current().is_none());
    }

    #[test]
    fn test_resting_snapshot_visible_outside_dispatch() {
        let mut env = EnvironmentContext::default();
        env.set_resting(Some(props("shown")));
        assert_eq!(env.current().map(|p| p.event_name.as_str()), Some("shown"));

        env.push(props("live"));
        assert_eq!(env.current().map(|p| p.event_name.as_str()), Some("live"));
    }

    #[test]
    fn test_overflow_and_underflow_are_tolerated() {
        let mut env = EnvironmentContext::new(1);
        env.push(props("a"));
        assert_eq!(env.push(props("b")), 2);

        env.pop();
        env.pop();
        assert!(env.pop().is_none());
        assert_eq!(env.depth(), 0);
    }
}

//! Capabilities an item may carry: predicates over (item, environment) and
//! hooks run at lifecycle edges.

use thiserror::Error;

use super::TutorialItem;
use crate::environment::{EnvironmentProperties, EventPayload};

/// Failure reported by item-supplied code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("{0}")]
    Failed(String),

    #[error("required data missing: {0}")]
    MissingData(String),
}

impl CheckError {
    pub fn failed(message: impl Into<String>) -> Self {
        CheckError::Failed(message.into())
    }
}

pub type CheckResult = Result<bool, CheckError>;

/// Extra criteria that must hold for an item to activate.
pub trait Activatable {
    fn can_activate(&self, item: &TutorialItem, env: &EnvironmentProperties) -> CheckResult;
}

/// Condition checked when a completion event arrives for a shown item.
pub trait Completable {
    fn can_complete(&self, item: &TutorialItem, env: &EnvironmentProperties) -> CheckResult;
}

/// An obsolete item completes silently without ever being shown.
pub trait Obsoletable {
    fn is_obsolete(&self, item: &TutorialItem, env: &EnvironmentProperties) -> CheckResult;
}

/// Transient visibility: should a displayed item get out of the way right now?
pub trait Hideable {
    fn should_hide(&self, item: &TutorialItem, env: &EnvironmentProperties) -> CheckResult;
}

impl<F> Activatable for F
where
    F: Fn(&TutorialItem, &EnvironmentProperties) -> CheckResult,
{
    fn can_activate(&self, item: &TutorialItem, env: &EnvironmentProperties) -> CheckResult {
        self(item, env)
    }
}

impl<F> Completable for F
where
    F: Fn(&TutorialItem, &EnvironmentProperties) -> CheckResult,
{
    fn can_complete(&self, item: &TutorialItem, env: &EnvironmentProperties) -> CheckResult {
        self(item, env)
    }
}

impl<F> Obsoletable for F
where
    F: Fn(&TutorialItem, &EnvironmentProperties) -> CheckResult,
{
    fn is_obsolete(&self, item: &TutorialItem, env: &EnvironmentProperties) -> CheckResult {
        self(item, env)
    }
}

impl<F> Hideable for F
where
    F: Fn(&TutorialItem, &EnvironmentProperties) -> CheckResult,
{
    fn should_hide(&self, item: &TutorialItem, env: &EnvironmentProperties) -> CheckResult {
        self(item, env)
    }
}

/// An event raised by a hook.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    pub name: String,
    pub payload: EventPayload,
}

/// What a hook can see and do.
#[derive(Debug, Clone)]
pub struct HookContext {
    environment: EnvironmentProperties,
    emitted: Vec<EmittedEvent>,
}

impl HookContext {
    pub fn new(environment: EnvironmentProperties) -> Self {
        Self {
            environment,
            emitted: Vec::new(),
        }
    }

    /// Environment the hook runs in.
    pub fn environment(&self) -> &EnvironmentProperties {
        &self.environment
    }

    /// Raise a follow-up event. Emitted events are dispatched re-entrantly once
    /// the lifecycle step that ran the hook has finished, nested inside the
    /// environment of the event that triggered it.
    pub fn emit(&mut self, name: impl Into<String>, payload: impl Into<EventPayload>) {
        self.emitted.push(EmittedEvent {
            name: name.into(),
            payload: payload.into(),
        });
    }

    pub fn into_emitted(self) -> Vec<EmittedEvent> {
        self.emitted
    }
}

/// Code run when an item activates or is cleaned up.
pub trait ItemHook {
    fn run(&self, item: &TutorialItem, ctx: &mut HookContext) -> Result<(), CheckError>;
}

impl<F> ItemHook for F
where
    F: Fn(&TutorialItem, &mut HookContext) -> Result<(), CheckError>,
{
    fn run(&self, item: &TutorialItem, ctx: &mut HookContext) -> Result<(), CheckError> {
        self(item, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::PlayerId;
    use serde_json::json;

    #[test]
    fn test_closure_predicates() {
        let item = TutorialItem::new("check");
        let env = EnvironmentProperties::detached(PlayerId(0));

        let predicate = |_: &TutorialItem, env: &EnvironmentProperties| -> CheckResult {
            Ok(env.player == PlayerId(0))
        };
        assert_eq!(predicate.can_activate(&item, &env), Ok(true));
        assert_eq!(predicate.is_obsolete(&item, &env), Ok(true));
    }

    #[test]
    fn test_hook_emits_events() {
        let item = TutorialItem::new("hook");
        let mut ctx = HookContext::new(EnvironmentProperties::detached(PlayerId(0)));

        let hook = |item: &TutorialItem, ctx: &mut HookContext| -> Result<(), CheckError> {
            ctx.emit(format!("{}-done", item.id), json!({ "player": 0 }));
            Ok(())
        };
        hook.run(&item, &mut ctx).unwrap();

        let emitted = ctx.into_emitted();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].name, "hook-done");
    }
}

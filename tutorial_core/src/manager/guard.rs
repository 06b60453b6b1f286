//! Calls into item supplied code. Errors and panics are logged and turned into
//! "no effect" so one broken item can't halt the lifecycle of the others.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;
use tutorial_rules::{CheckError, EmittedEvent, EnvironmentProperties, HookContext, TutorialItem};

use crate::error::TutorialError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Check {
    Activation,
    Completion,
    Obsolescence,
    Hiding,
}

impl Check {
    fn name(self) -> &'static str {
        match self {
            Check::Activation => "activation check",
            Check::Completion => "completion check",
            Check::Obsolescence => "obsolete check",
            Check::Hiding => "hide check",
        }
    }

    /// Outcome when the item has no such check.
    fn default_outcome(self) -> bool {
        matches!(self, Check::Activation | Check::Completion)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Hook {
    Activate,
    Cleanup,
}

impl Hook {
    fn name(self) -> &'static str {
        match self {
            Hook::Activate => "activate hook",
            Hook::Cleanup => "cleanup hook",
        }
    }
}

/// Evaluate one of an item's checks. `None` means the check failed.
pub(super) fn evaluate(
    item: &TutorialItem,
    check: Check,
    env: &EnvironmentProperties,
) -> Option<bool> {
    let outcome = match check {
        Check::Activation => item
            .activation_check
            .as_deref()
            .map(|c| contained(|| c.can_activate(item, env))),
        Check::Completion => item
            .completion_check
            .as_deref()
            .map(|c| contained(|| c.can_complete(item, env))),
        Check::Obsolescence => item
            .obsolete_check
            .as_deref()
            .map(|c| contained(|| c.is_obsolete(item, env))),
        Check::Hiding => item
            .hide_check
            .as_deref()
            .map(|c| contained(|| c.should_hide(item, env))),
    };

    match outcome {
        None => Some(check.default_outcome()),
        Some(outcome) => report(item, check.name(), env, outcome),
    }
}

/// Run one of an item's hooks, returning the events it raised.
pub(super) fn run_hook(
    item: &TutorialItem,
    hook: Hook,
    env: &EnvironmentProperties,
) -> Vec<EmittedEvent> {
    let callback = match hook {
        Hook::Activate => item.on_activate.as_deref(),
        Hook::Cleanup => item.on_cleanup.as_deref(),
    };
    let Some(callback) = callback else {
        return Vec::new();
    };

    let outcome = contained(|| {
        let mut ctx = HookContext::new(env.clone());
        callback.run(item, &mut ctx).map(|()| ctx.into_emitted())
    });
    report(item, hook.name(), env, outcome).unwrap_or_default()
}

type Contained<T> = Result<Result<T, CheckError>, String>;

fn contained<T>(call: impl FnOnce() -> Result<T, CheckError>) -> Contained<T> {
    catch_unwind(AssertUnwindSafe(call)).map_err(panic_message)
}

fn report<T>(
    item: &TutorialItem,
    check: &'static str,
    env: &EnvironmentProperties,
    outcome: Contained<T>,
) -> Option<T> {
    let err = match outcome {
        Ok(Ok(value)) => return Some(value),
        Ok(Err(source)) => TutorialError::CheckFailed {
            id: item.id.clone(),
            check,
            source,
        },
        Err(message) => TutorialError::CheckPanicked {
            id: item.id.clone(),
            check,
            message,
        },
    };
    error!(error = %err, event = %env.event_name, player = %env.player, "item code failed");
    None
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

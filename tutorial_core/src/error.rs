//! Errors raised while orchestrating tutorial items.
//!
//! None of these is fatal. Gameplay paths log them and carry on; debug
//! operations and group processing also hand them back to the caller.

use thiserror::Error;
use tutorial_rules::{CheckError, ItemId, ItemState};

#[derive(Debug, Error)]
pub enum TutorialError {
    #[error("group '{0}' has already been processed")]
    DuplicateGroup(String),

    #[error("two or more items '{id}' have version {version} in the {collection} collection")]
    VersionConflict {
        id: ItemId,
        version: u32,
        collection: &'static str,
    },

    #[error("welcome instructions already held by '{holder}' at version {version}; '{candidate}' ignored")]
    WelcomeConflict {
        holder: ItemId,
        candidate: ItemId,
        version: u32,
    },

    #[error("no tutorial item with id '{0}'")]
    UnknownItem(ItemId),

    #[error("item '{id}' is {state:?}, expected {expected}")]
    UnexpectedState {
        id: ItemId,
        state: ItemState,
        expected: &'static str,
    },

    #[error("unable to activate next item '{to}' from '{from}': {detail}")]
    UnresolvedChain {
        from: ItemId,
        to: ItemId,
        detail: String,
    },

    #[error("item '{from}' attempted to also activate '{to}' but no unseen item has that id")]
    UnresolvedCompanion { from: ItemId, to: ItemId },

    #[error("{check} of item '{id}' failed")]
    CheckFailed {
        id: ItemId,
        check: &'static str,
        #[source]
        source: CheckError,
    },

    #[error("{check} of item '{id}' panicked: {message}")]
    CheckPanicked {
        id: ItemId,
        check: &'static str,
        message: String,
    },

    #[error("stored data version {stored} is newer than the running version {running}")]
    DataVersionTooNew { stored: i64, running: i64 },

    #[error("environment depth {depth} went above {max} (last event '{event}'), leak?")]
    EnvironmentOverflow {
        depth: usize,
        max: usize,
        event: String,
    },

    #[error("environment scope released while none was held")]
    EnvironmentUnderflow,

    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, TutorialError>;

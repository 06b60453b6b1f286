//! # Tutorial Core
//!
//! The orchestrator of the tutorial system. This crate takes the items defined
//! with `tutorial_rules`, decides when each of them is shown in response to
//! host engine and UI events, keeps a single item on screen at a time, chains
//! items together and remembers what the player has already seen.
//!
//! ## Core Components
//!
//! - **persistence**: Versioned key/value access to the save file
//! - **environment**: Re-entrant scope describing the event being handled
//! - **registry**: Item catalog and the state collections
//! - **activation**: FIFO of items waiting for the active slot
//! - **display**: Adapts item state to an external display queue
//! - **manager**: The `TutorialManager` context object that routes events
//!
//! ## Design Philosophy
//!
//! - **Event-Driven**: The core reacts to events, it never drives the game loop
//! - **Contained**: Faults in item supplied code are logged and isolated to that item
//! - **Injected**: Display, storage, quest tracking and telemetry are collaborators

pub mod activation;
pub mod collaborators;
pub mod display;
pub mod environment;
pub mod error;
pub mod manager;
pub mod persistence;
pub mod registry;

pub use activation::*;
pub use collaborators::*;
pub use display::*;
pub use environment::*;
pub use error::*;
pub use manager::*;
pub use persistence::*;
pub use registry::*;

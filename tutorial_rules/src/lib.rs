//! # Tutorial Rules
//!
//! The content crate - defines what a tutorial item is, the states it moves
//! through, what it displays, and the environment it is evaluated against.
//! This crate holds no orchestration logic; `tutorial_core` drives the items.

pub mod environment;
pub mod items;
pub mod settings;

pub use environment::*;
pub use items::*;
pub use settings::*;

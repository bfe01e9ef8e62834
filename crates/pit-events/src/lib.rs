//! Shared data types for the fight pit.
//!
//! This crate contains pure data structures with no scheduling logic.
//! It is a dependency for all other crates in the workspace.

pub mod command;
pub mod participant;
pub mod trace;

// Re-export participant types
pub use participant::ParticipantId;

// Re-export command types
pub use command::{Command, CommandId};

// Re-export trace types
pub use trace::{DirectorEvent, DirectorEventKind, Phase};

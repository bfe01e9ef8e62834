//! Director: the fight pit's interaction scheduler.
//!
//! Commands arrive on a shared queue from any number of producers. One
//! background loop takes them one at a time, puppets the participants
//! involved and plays the interaction out tick by tick against the shared
//! [`pit_core::Registry`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   enqueue   ┌──────────────┐   pop   ┌───────────┐   ticks   ┌──────────┐
//! │ producer │ ──────────▶ │ CommandQueue │ ──────▶ │ Scheduler │ ────────▶ │ Registry │
//! └──────────┘             └──────────────┘         └───────────┘           └──────────┘
//!                                                         │ trace
//!                                                         ▼
//!                                                    EventSink
//! ```
//!
//! # Modules
//!
//! - [`queue`]: Thread-safe FIFO of commands
//! - [`catalog`]: Action kinds, their animations and command validation
//! - [`clock`]: Real-time and stepped tick sources
//! - [`trace`]: Sinks for director trace events
//! - [`config`]: Parameters derived from the pit configuration
//! - [`scheduler`]: The interaction protocol
//! - [`director`]: Background thread start and stop

pub mod catalog;
pub mod clock;
pub mod config;
pub mod director;
pub mod queue;
pub mod scheduler;
pub mod trace;

// Re-export catalog types
pub use catalog::{
    ActionKind, CommandError, DefenseEffect, Interaction, InteractionSpec, PairInteraction,
    SquashOutcome,
};

// Re-export clock types
pub use clock::{FixedRateClock, SteppedClock, TickSource};

pub use config::DirectorConfig;
pub use director::Director;
pub use queue::CommandQueue;

// Re-export scheduler types
pub use scheduler::{slot_beside, DirectorError, PassOutcome, Scheduler};

// Re-export trace sinks
pub use trace::{EventSink, JsonlSink, MemorySink, NullSink};

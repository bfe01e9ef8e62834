//! Director Trace Events
//!
//! The director records what it does as a flat stream of events. The stream
//! is the execution trace used by tests to check ordering and by the binary
//! to write `trace.jsonl`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::command::CommandId;
use crate::participant::ParticipantId;

/// Step of a directed interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Initiator runs to its slot beside the target
    Position,
    /// Both actors turn toward each other
    Face,
    /// Interaction animations play to completion
    Action,
    /// Follow-up faint played in place
    Faint,
    /// Animations return to idle
    Reset,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Position => write!(f, "position"),
            Phase::Face => write!(f, "face"),
            Phase::Action => write!(f, "action"),
            Phase::Faint => write!(f, "faint"),
            Phase::Reset => write!(f, "reset"),
        }
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DirectorEventKind {
    CommandStarted { action: String },
    Puppeted { participants: Vec<ParticipantId> },
    PhaseStarted { phase: Phase },
    Unpuppeted { participants: Vec<ParticipantId> },
    CommandCompleted,
    CommandFailed { reason: String },
    CommandDiscarded { reason: String },
    Stopped { dropped: usize },
}

/// A single trace entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectorEvent {
    /// Director virtual clock tick at which the event happened
    pub tick: u64,
    /// Command being executed, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<CommandId>,
    #[serde(flatten)]
    pub kind: DirectorEventKind,
}

impl DirectorEvent {
    pub fn new(tick: u64, command_id: Option<CommandId>, kind: DirectorEventKind) -> Self {
        Self { tick, command_id, kind }
    }

    /// True if this event puppets or unpuppets `participant`.
    pub fn touches(&self, participant: &ParticipantId) -> bool {
        match &self.kind {
            DirectorEventKind::Puppeted { participants }
            | DirectorEventKind::Unpuppeted { participants } => participants.contains(participant),
            _ => false,
        }
    }
}

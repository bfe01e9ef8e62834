//! Tri-state step result shared by movement and playback.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of advancing a movement or playback step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// The step reached its end state
    Success,
    /// The step needs more ticks
    Running,
    /// Nothing to do (e.g. no goal set); not an error
    Failure,
}

impl Status {
    pub fn is_running(self) -> bool {
        matches!(self, Status::Running)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "SUCCESS"),
            Status::Running => write!(f, "RUNNING"),
            Status::Failure => write!(f, "FAILURE"),
        }
    }
}

//! Command Shape
//!
//! Interaction requests as produced by the external command source. Commands
//! are immutable once enqueued; interpretation of `action` and `metadata`
//! happens in the director's interaction catalog.
//!
//! # Example
//!
//! ```
//! use pit_events::Command;
//!
//! let cmd: Command = serde_json::from_str(r#"{"action":"faint","actor":"a"}"#).unwrap();
//! assert_eq!(cmd.action, "faint");
//! assert_eq!(cmd.actor1.as_ref().map(|id| id.as_str()), Some("a"));
//! assert!(cmd.actor2.is_none());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::participant::ParticipantId;

/// Unique identifier used to correlate a command with its trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form keeps log lines readable.
        let simple = self.0.simple().to_string();
        f.write_str(&simple[..8])
    }
}

/// An interaction request.
///
/// Single-actor forms (`faint`, `update_skin`) may name their participant
/// with `actor` instead of `actor1`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    /// Correlation id, generated when absent from the input
    #[serde(default = "CommandId::generate")]
    pub id: CommandId,
    /// Action kind, e.g. "pet" or "squash"
    pub action: String,
    /// Initiator (or the sole participant)
    #[serde(default, alias = "actor", skip_serializing_if = "Option::is_none")]
    pub actor1: Option<ParticipantId>,
    /// Target of a two-actor interaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor2: Option<ParticipantId>,
    /// Opaque, action-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Command {
    /// Create a two-actor command.
    pub fn pair(
        action: impl Into<String>,
        initiator: impl Into<ParticipantId>,
        target: impl Into<ParticipantId>,
    ) -> Self {
        Self {
            id: CommandId::generate(),
            action: action.into(),
            actor1: Some(initiator.into()),
            actor2: Some(target.into()),
            metadata: None,
        }
    }

    /// Create a single-actor command.
    pub fn single(action: impl Into<String>, actor: impl Into<ParticipantId>) -> Self {
        Self {
            id: CommandId::generate(),
            action: action.into(),
            actor1: Some(actor.into()),
            actor2: None,
            metadata: None,
        }
    }

    /// Attach metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Participants named by this command, in order.
    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> {
        self.actor1.iter().chain(self.actor2.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_command_parses() {
        let cmd: Command =
            serde_json::from_str(r#"{"action":"pet","actor1":"a","actor2":"b"}"#).unwrap();
        assert_eq!(cmd.action, "pet");
        assert_eq!(cmd.actor1, Some(ParticipantId::new("a")));
        assert_eq!(cmd.actor2, Some(ParticipantId::new("b")));
        assert!(cmd.metadata.is_none());
    }

    #[test]
    fn test_mentions_in_json_are_stripped() {
        let cmd: Command =
            serde_json::from_str(r#"{"action":"pet","actor1":"@alice","actor2":"@bob"}"#).unwrap();
        assert_eq!(cmd.actor1, Some(ParticipantId::new("alice")));
        assert_eq!(cmd.actor2.as_ref().map(ParticipantId::as_str), Some("bob"));
    }

    #[test]
    fn test_metadata_is_kept_opaque() {
        let cmd: Command = serde_json::from_str(
            r#"{"action":"squash","actor1":"a","actor2":"b","metadata":{"counter":true}}"#,
        )
        .unwrap();
        assert_eq!(cmd.metadata, Some(serde_json::json!({"counter": true})));
    }

    #[test]
    fn test_missing_id_is_generated() {
        let a: Command = serde_json::from_str(r#"{"action":"faint","actor":"a"}"#).unwrap();
        let b: Command = serde_json::from_str(r#"{"action":"faint","actor":"a"}"#).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_participants_in_order() {
        let cmd = Command::pair("heal", "c", "d");
        let names: Vec<&str> = cmd.participants().map(|p| p.as_str()).collect();
        assert_eq!(names, vec!["c", "d"]);
    }

    #[test]
    fn test_command_id_display_is_short() {
        assert_eq!(CommandId::generate().to_string().len(), 8);
    }
}

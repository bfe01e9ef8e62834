//! Participant Identity
//!
//! Chat participants are identified by their lowercase login name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a chat participant and of the actor that represents them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Creates an id, stripping a leading `@` mention marker.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.strip_prefix('@') {
            Some(stripped) => Self(stripped.to_string()),
            None => Self(name),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ParticipantId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}

impl AsRef<str> for ParticipantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mention_marker_is_stripped() {
        assert_eq!(ParticipantId::new("@aeomech").as_str(), "aeomech");
        assert_eq!(ParticipantId::from("zingochris").as_str(), "zingochris");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = ParticipantId::new("spagettd");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""spagettd""#);
    }

    #[test]
    fn test_deserializing_strips_mention_marker() {
        let id: ParticipantId = serde_json::from_str(r#""@bob""#).unwrap();
        assert_eq!(id, ParticipantId::new("bob"));
    }
}

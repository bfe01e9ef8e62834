//! Input lines from the command source.
//!
//! A line is either a raw JSON [`Command`] or a chat message of the form
//! `author: text`. Chat text starting with `!` is a chat command such as
//! `!squash @bob`.

use pit_events::{Command, ParticipantId};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Chat commands understood by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Squash,
    Defend,
    Heal,
    Pet,
    Skin,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Squash => "squash",
            Verb::Defend => "defend",
            Verb::Heal => "heal",
            Verb::Pet => "pet",
            Verb::Skin => "skin",
        }
    }

    /// Past tense used in replies.
    pub fn past(self) -> &'static str {
        match self {
            Verb::Squash => "squashed",
            Verb::Defend => "defended",
            Verb::Heal => "healed",
            Verb::Pet => "pet",
            Verb::Skin => "changed skin",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "squash" => Ok(Verb::Squash),
            "defend" => Ok(Verb::Defend),
            "heal" => Ok(Verb::Heal),
            "pet" => Ok(Verb::Pet),
            "skin" => Ok(Verb::Skin),
            _ => Err(()),
        }
    }
}

/// `!verb [argument]` taken from a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCommand {
    pub verb: Verb,
    /// First word after the verb, a target or a skin name
    pub argument: Option<String>,
}

impl ChatCommand {
    /// The argument read as a participant id (a leading `@` is dropped).
    pub fn target(&self) -> Option<ParticipantId> {
        self.argument.as_deref().map(ParticipantId::new)
    }
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Command(Command),
    Chat {
        author: ParticipantId,
        command: Option<ChatCommand>,
    },
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("invalid command JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("chat line has no author: {0:?}")]
    MissingAuthor(String),
}

/// Parses one line; blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Input>, InputError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line.starts_with('{') {
        return Ok(Some(Input::Command(serde_json::from_str(line)?)));
    }

    let (author, text) = line
        .split_once(':')
        .ok_or_else(|| InputError::MissingAuthor(line.to_string()))?;
    let author = author.trim();
    if author.is_empty() {
        return Err(InputError::MissingAuthor(line.to_string()));
    }
    Ok(Some(Input::Chat {
        author: ParticipantId::new(author),
        command: parse_chat_command(text),
    }))
}

fn parse_chat_command(text: &str) -> Option<ChatCommand> {
    let mut words = text.trim().strip_prefix('!')?.split_whitespace();
    let verb = words.next()?.parse().ok()?;
    let argument = words
        .next()
        .map(|word| word.trim_start_matches('@').to_string())
        .filter(|word| !word.is_empty());
    Some(ChatCommand { verb, argument })
}

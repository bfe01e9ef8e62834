//! Interaction Catalog
//!
//! Maps each action to the animations the generic two-actor protocol plays,
//! and turns raw [`Command`]s into validated [`Interaction`]s before the
//! scheduler touches any actor.

use pit_core::anim;
use pit_events::{Command, ParticipantId};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Recognized command actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Pet,
    Squash,
    Heal,
    Defend,
    Faint,
    UpdateSkin,
}

impl ActionKind {
    pub const ALL: [ActionKind; 6] = [
        ActionKind::Pet,
        ActionKind::Squash,
        ActionKind::Heal,
        ActionKind::Defend,
        ActionKind::Faint,
        ActionKind::UpdateSkin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Pet => "pet",
            ActionKind::Squash => "squash",
            ActionKind::Heal => "heal",
            ActionKind::Defend => "defend",
            ActionKind::Faint => "faint",
            ActionKind::UpdateSkin => "update_skin",
        }
    }

    /// Catalog row for this action.
    pub fn spec(self) -> &'static InteractionSpec {
        // rows are in declaration order
        &CATALOG[self as usize]
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CommandError::UnknownAction(s.to_string()))
    }
}

/// One catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InteractionSpec {
    pub kind: ActionKind,
    pub initiator_animation: Option<&'static str>,
    pub target_animation: Option<&'static str>,
    /// Whether the initiator walks up to the target first
    pub positioning: bool,
}

const CATALOG: [InteractionSpec; 6] = [
    InteractionSpec {
        kind: ActionKind::Pet,
        initiator_animation: Some(anim::PET),
        target_animation: Some(anim::PETTED),
        positioning: true,
    },
    InteractionSpec {
        kind: ActionKind::Squash,
        initiator_animation: Some(anim::ATTACK),
        target_animation: Some(anim::DAMAGE),
        positioning: true,
    },
    InteractionSpec {
        kind: ActionKind::Heal,
        initiator_animation: Some(anim::HEAL),
        target_animation: Some(anim::HEALED),
        positioning: true,
    },
    InteractionSpec {
        kind: ActionKind::Defend,
        initiator_animation: Some(anim::DEFEND),
        target_animation: Some(anim::DEFENDED),
        positioning: true,
    },
    InteractionSpec {
        kind: ActionKind::Faint,
        initiator_animation: Some(anim::FAINT),
        target_animation: None,
        positioning: false,
    },
    InteractionSpec {
        kind: ActionKind::UpdateSkin,
        initiator_animation: None,
        target_animation: None,
        positioning: false,
    },
];

/// Why a command was rejected before execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("{action} command is missing '{field}'")]
    MissingField {
        action: ActionKind,
        field: &'static str,
    },
    #[error("{action} command names '{participant}' twice")]
    SelfInteraction {
        action: ActionKind,
        participant: ParticipantId,
    },
    #[error("{action} command has bad metadata: {reason}")]
    BadMetadata { action: ActionKind, reason: String },
}

/// Outcome flags a squash command may carry in its metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SquashOutcome {
    /// The target hits back instead of taking damage
    pub counter: bool,
    /// The initiator faints after the exchange
    pub attacker_faint: bool,
    /// The target faints after the exchange
    pub victim_faint: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SkinRequest {
    skin: Option<String>,
}

/// Changes to defended flags applied as the action phase starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefenseEffect {
    pub defend_target: bool,
    pub undefend_target: bool,
    pub undefend_initiator: bool,
}

/// A validated two-actor interaction.
#[derive(Debug, Clone, PartialEq)]
pub struct PairInteraction {
    pub kind: ActionKind,
    pub initiator: ParticipantId,
    pub target: ParticipantId,
    pub initiator_animation: &'static str,
    pub target_animation: &'static str,
    pub positioning: bool,
    pub defense: DefenseEffect,
    pub initiator_faints: bool,
    pub target_faints: bool,
}

impl PairInteraction {
    pub fn participants(&self) -> [ParticipantId; 2] {
        [self.initiator.clone(), self.target.clone()]
    }
}

/// A command ready for the scheduler.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Pair(PairInteraction),
    Faint { actor: ParticipantId },
    UpdateSkin {
        actor: ParticipantId,
        skin: Option<String>,
    },
}

impl Interaction {
    pub fn kind(&self) -> ActionKind {
        match self {
            Interaction::Pair(pair) => pair.kind,
            Interaction::Faint { .. } => ActionKind::Faint,
            Interaction::UpdateSkin { .. } => ActionKind::UpdateSkin,
        }
    }
}

impl TryFrom<&Command> for Interaction {
    type Error = CommandError;

    fn try_from(command: &Command) -> Result<Self, Self::Error> {
        let kind: ActionKind = command.action.parse()?;
        let spec = kind.spec();
        let actor = command
            .actor1
            .clone()
            .ok_or(CommandError::MissingField {
                action: kind,
                field: "actor1",
            })?;

        match kind {
            ActionKind::Faint => Ok(Interaction::Faint { actor }),
            ActionKind::UpdateSkin => {
                let request: SkinRequest = parse_metadata(kind, command)?;
                Ok(Interaction::UpdateSkin {
                    actor,
                    skin: request.skin,
                })
            }
            ActionKind::Pet | ActionKind::Squash | ActionKind::Heal | ActionKind::Defend => {
                let target = command
                    .actor2
                    .clone()
                    .ok_or(CommandError::MissingField {
                        action: kind,
                        field: "actor2",
                    })?;
                if target == actor {
                    return Err(CommandError::SelfInteraction {
                        action: kind,
                        participant: actor,
                    });
                }

                let mut pair = PairInteraction {
                    kind,
                    initiator: actor,
                    target,
                    initiator_animation: spec.initiator_animation.unwrap_or(anim::IDLE),
                    target_animation: spec.target_animation.unwrap_or(anim::IDLE),
                    positioning: spec.positioning,
                    defense: DefenseEffect::default(),
                    initiator_faints: false,
                    target_faints: false,
                };
                match kind {
                    ActionKind::Squash => {
                        let outcome: SquashOutcome = parse_metadata(kind, command)?;
                        pair.defense.undefend_target = true;
                        if outcome.counter {
                            pair.target_animation = anim::COUNTER;
                            pair.defense.undefend_initiator = true;
                        }
                        pair.initiator_faints = outcome.attacker_faint;
                        pair.target_faints = outcome.victim_faint;
                    }
                    ActionKind::Defend => pair.defense.defend_target = true,
                    _ => {}
                }
                Ok(Interaction::Pair(pair))
            }
        }
    }
}

/// Reads typed metadata from an object. Anything else, including absent
/// metadata, means all defaults.
fn parse_metadata<T>(action: ActionKind, command: &Command) -> Result<T, CommandError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    match &command.metadata {
        Some(value @ serde_json::Value::Object(_)) => {
            serde_json::from_value(value.clone()).map_err(|error| CommandError::BadMetadata {
                action,
                reason: error.to_string(),
            })
        }
        _ => Ok(T::default()),
    }
}

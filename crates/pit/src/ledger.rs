//! Chat Ledger
//!
//! Health and defense bookkeeping for chatters, and the rules that turn a
//! chat command into a reply plus (maybe) a director command. Replies are
//! decided up front; the director plays the animation afterwards.

use pit_events::{Command, ParticipantId};
use rand::Rng;
use serde_json::json;
use std::collections::BTreeMap;

use crate::chat::{ChatCommand, Verb};

pub const MAX_HEALTH: i32 = 20_000;
pub const HEAL_AMOUNT: i32 = 2_000;

/// A chatter's standing in the pit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub health: i32,
    pub defended: bool,
}

impl Default for Standing {
    fn default() -> Self {
        Self {
            health: MAX_HEALTH,
            defended: false,
        }
    }
}

/// What a chat command produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outcome {
    pub reply: Option<String>,
    pub command: Option<Command>,
}

impl Outcome {
    fn reply(text: String) -> Self {
        Self {
            reply: Some(text),
            command: None,
        }
    }
}

/// Random values behind one squash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquashRoll {
    pub damage: i32,
    pub counter_damage: i32,
    pub counter: bool,
}

impl SquashRoll {
    pub fn roll(rng: &mut impl Rng) -> Self {
        Self {
            damage: rng.gen_range(100..=9999),
            counter_damage: rng.gen_range(100..=9999),
            counter: rng.gen_range(0..4) == 0,
        }
    }
}

/// Applied result of one squash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SquashResult {
    pub damage: i32,
    /// Counter damage dealt, when the target countered
    pub countered: Option<i32>,
    pub attacker_faint: bool,
    pub victim_faint: bool,
}

/// Applies a squash to both standings.
///
/// Damage is halved against a defended target, counter damage against a
/// defended attacker. Whoever drops below zero faints and is restored to
/// full health.
pub fn resolve_squash(attacker: &mut Standing, victim: &mut Standing, roll: SquashRoll) -> SquashResult {
    let damage = if victim.defended { roll.damage / 2 } else { roll.damage };
    let counter_damage = if attacker.defended {
        roll.counter_damage / 2
    } else {
        roll.counter_damage
    };

    victim.health -= damage;
    victim.defended = false;
    let countered = roll.counter.then(|| {
        attacker.health -= counter_damage;
        attacker.defended = false;
        counter_damage
    });

    let attacker_faint = attacker.health < 0;
    let victim_faint = victim.health < 0;
    if attacker_faint {
        attacker.health = MAX_HEALTH;
    }
    if victim_faint {
        victim.health = MAX_HEALTH;
    }
    SquashResult {
        damage,
        countered,
        attacker_faint,
        victim_faint,
    }
}

/// Per-chatter bookkeeping.
#[derive(Debug)]
pub struct Ledger<R: Rng> {
    chatters: BTreeMap<ParticipantId, Standing>,
    rng: R,
}

impl<R: Rng> Ledger<R> {
    pub fn new(rng: R) -> Self {
        Self {
            chatters: BTreeMap::new(),
            rng,
        }
    }

    /// Adds a chatter at full health. Returns false if already present.
    pub fn join(&mut self, id: &ParticipantId) -> bool {
        if self.chatters.contains_key(id) {
            return false;
        }
        self.chatters.insert(id.clone(), Standing::default());
        true
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.chatters.contains_key(id)
    }

    pub fn standing(&self, id: &ParticipantId) -> Option<Standing> {
        self.chatters.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.chatters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chatters.is_empty()
    }

    /// Applies one chat command from `author`, who must have joined.
    pub fn handle(&mut self, author: &ParticipantId, command: &ChatCommand) -> Outcome {
        if command.verb == Verb::Skin {
            let metadata = match &command.argument {
                Some(skin) => json!({ "skin": skin }),
                None => json!({}),
            };
            return Outcome {
                reply: None,
                command: Some(Command::single("update_skin", author.clone()).with_metadata(metadata)),
            };
        }

        let verb = command.verb;
        let target = match command.target() {
            None => return Outcome::reply(format!("{} {} a zingo!", author, verb.past())),
            Some(target) if &target == author => {
                return Outcome::reply(format!("{} can't {} themselves!", author, verb))
            }
            Some(target) => target,
        };
        if !self.contains(&target) {
            return Outcome::reply(format!(
                "{} tried to {} {}, but they were nowhere to be found!",
                author, verb, target
            ));
        }

        match verb {
            Verb::Squash => self.squash(author, &target),
            Verb::Defend => self.defend(author, &target),
            Verb::Heal => self.heal(author, &target),
            Verb::Pet => Outcome {
                reply: Some(format!("{} pet {}!", author, target)),
                command: Some(Command::pair("pet", author.clone(), target)),
            },
            Verb::Skin => Outcome::default(),
        }
    }

    fn squash(&mut self, author: &ParticipantId, target: &ParticipantId) -> Outcome {
        let roll = SquashRoll::roll(&mut self.rng);
        let mut attacker = self.standing(author).unwrap_or_default();
        let mut victim = self.standing(target).unwrap_or_default();
        let result = resolve_squash(&mut attacker, &mut victim, roll);
        self.chatters.insert(author.clone(), attacker);
        self.chatters.insert(target.clone(), victim);

        let mut reply = format!("{} squashed {} for {} damage!", author, target, result.damage);
        if let Some(counter_damage) = result.countered {
            reply.push_str(&format!(" {} counters for {} damage!", target, counter_damage));
        }
        if result.attacker_faint {
            reply.push_str(&format!(" {} fainted!", author));
        }
        if result.victim_faint {
            reply.push_str(&format!(" {} fainted!", target));
        }

        let command = Command::pair("squash", author.clone(), target.clone()).with_metadata(json!({
            "counter": result.countered.is_some(),
            "attacker_faint": result.attacker_faint,
            "victim_faint": result.victim_faint,
        }));
        Outcome {
            reply: Some(reply),
            command: Some(command),
        }
    }

    fn defend(&mut self, author: &ParticipantId, target: &ParticipantId) -> Outcome {
        if self.rng.gen_range(0..4) == 0 {
            return Outcome::reply(format!("{} tried to defend {}, but they failed!", author, target));
        }
        if let Some(standing) = self.chatters.get_mut(target) {
            standing.defended = true;
        }
        Outcome {
            reply: Some(format!("{} defended {}!", author, target)),
            command: Some(Command::pair("defend", author.clone(), target.clone())),
        }
    }

    fn heal(&mut self, author: &ParticipantId, target: &ParticipantId) -> Outcome {
        if self.rng.gen_range(0..3) == 0 {
            return Outcome::reply(format!("{} tried to heal {}, but they failed!", author, target));
        }
        let health = match self.chatters.get_mut(target) {
            Some(standing) => {
                standing.health = (standing.health + HEAL_AMOUNT).min(MAX_HEALTH);
                standing.health
            }
            None => MAX_HEALTH,
        };
        Outcome {
            reply: Some(format!(
                "{} healed {}! They now have {}/{} health points.",
                author, target, health, MAX_HEALTH
            )),
            command: Some(Command::pair("heal", author.clone(), target.clone())),
        }
    }
}

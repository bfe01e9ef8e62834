//! The pit application: turns input lines into registry changes and
//! director commands.

use director::CommandQueue;
use pit_core::{ChatConfig, Registry, SkinError, SkinSource};
use pit_events::ParticipantId;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chat::{parse_line, Input};
use crate::ledger::Ledger;

/// Horizontal range new chatters appear in.
pub const SPAWN_RANGE: RangeInclusive<f32> = 100.0..=700.0;

pub struct App {
    registry: Arc<Registry>,
    skins: Arc<dyn SkinSource>,
    commands: CommandQueue,
    ledger: Ledger<SmallRng>,
    rng: SmallRng,
    chat: ChatConfig,
}

impl App {
    pub fn new(
        registry: Arc<Registry>,
        skins: Arc<dyn SkinSource>,
        commands: CommandQueue,
        mut rng: SmallRng,
    ) -> Self {
        let ledger_rng = SmallRng::seed_from_u64(rng.gen());
        Self {
            registry,
            skins,
            commands,
            ledger: Ledger::new(ledger_rng),
            rng,
            chat: ChatConfig::default(),
        }
    }

    /// Replaces the list of accounts whose chat lines are dropped.
    pub fn with_ignored(mut self, chat: ChatConfig) -> Self {
        self.chat = chat;
        self
    }

    pub fn ledger(&self) -> &Ledger<SmallRng> {
        &self.ledger
    }

    /// Registers a participant at a random spot if they are new.
    pub fn join(&mut self, id: &ParticipantId) -> Result<(), SkinError> {
        self.ledger.join(id);
        if self.registry.contains(id) {
            return Ok(());
        }
        let library = self.skins.resolve(id, None)?;
        let x = self.rng.gen_range(SPAWN_RANGE);
        if self.registry.add_participant(id.clone(), x, library) {
            info!("{} joined the pit at x={:.0}", id, x);
        }
        Ok(())
    }

    /// Handles one line from the command source.
    pub fn handle_line(&mut self, line: &str) {
        let input = match parse_line(line) {
            Ok(Some(input)) => input,
            Ok(None) => return,
            Err(error) => {
                warn!("Ignoring input line: {}", error);
                return;
            }
        };

        match input {
            Input::Command(command) => {
                debug!("Queueing raw command {:?}", command);
                self.commands.enqueue(command);
            }
            Input::Chat { author, command } => {
                if self.chat.is_ignored(author.as_str()) {
                    debug!("Ignoring chat from {}", author);
                    return;
                }
                if let Err(error) = self.join(&author) {
                    warn!("Could not add {}: {}", author, error);
                    return;
                }
                let Some(chat) = command else {
                    return;
                };
                let outcome = self.ledger.handle(&author, &chat);
                if let Some(reply) = outcome.reply {
                    info!("{}", reply);
                }
                if let Some(command) = outcome.command {
                    self.commands.enqueue(command);
                }
            }
        }
    }
}

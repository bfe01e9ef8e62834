//! Director parameters.
//!
//! Derived from the shared [`PitConfig`] so the interaction protocol never
//! hardcodes speeds, distances or rates.

use pit_core::PitConfig;
use std::time::Duration;
use tracing::warn;

/// Join timeout used when the configured one cannot be represented.
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything the scheduler needs to run interactions.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorConfig {
    /// Ticks per second of the director clock
    pub tick_rate: u32,
    /// Initiator speed during the position phase
    pub run_speed: f32,
    pub move_epsilon: f32,
    /// Height at which initiators stop beside their target
    pub floor_elevation: f32,
    /// Horizontal gap between initiator and target
    pub sprite_spacing: f32,
    /// Phase tick budget; unlimited when unset
    pub max_phase_ticks: Option<u64>,
    /// How long `stop` waits for the worker thread
    pub join_timeout: Duration,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self::from_pit(&PitConfig::default())
    }
}

impl DirectorConfig {
    pub fn from_pit(config: &PitConfig) -> Self {
        Self {
            tick_rate: config.timing.framerate.max(1),
            run_speed: config.movement.run_speed,
            move_epsilon: config.movement.move_epsilon,
            floor_elevation: config.floor_elevation(),
            sprite_spacing: config.director.sprite_spacing,
            max_phase_ticks: config.director.max_phase_ticks,
            join_timeout: config.director.join_timeout().unwrap_or_else(|| {
                warn!(
                    "Join timeout of {}s is out of range, using {:?}",
                    config.director.join_timeout_secs, DEFAULT_JOIN_TIMEOUT
                );
                DEFAULT_JOIN_TIMEOUT
            }),
        }
    }

    /// Seconds per tick.
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}

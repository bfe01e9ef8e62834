//! Ambient Simulation
//!
//! What actors do when nobody is directing them: stand idle, now and then
//! wander to a random spot on the floor, and finish whatever one-shot clip
//! they were left on. Puppeted participants are never touched.

use pit_events::ParticipantId;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::actor::Point;
use crate::animation::names;
use crate::config::PitConfig;
use crate::registry::{Participant, Registry};
use crate::status::Status;

/// Parameters of the ambient simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientSettings {
    /// An idle actor starts wandering with probability 1/move_chance per tick
    pub move_chance: u32,
    pub walk_speed: f32,
    pub move_epsilon: f32,
    /// Leftmost wander goal
    pub wander_min_x: f32,
    /// Rightmost wander goal
    pub wander_max_x: f32,
    pub floor_elevation: f32,
}

impl AmbientSettings {
    pub fn from_config(config: &PitConfig) -> Self {
        let spacing = config.director.sprite_spacing;
        Self {
            move_chance: config.ambient.move_chance.max(1),
            walk_speed: config.movement.walk_speed,
            move_epsilon: config.movement.move_epsilon,
            wander_min_x: spacing,
            wander_max_x: config.stage.screen_width as f32 - spacing,
            floor_elevation: config.floor_elevation(),
        }
    }
}

/// Summary of one ambient tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmbientStep {
    /// Participants whose deferred removal was applied
    pub removed: Vec<ParticipantId>,
    /// Actors that picked a new wander goal
    pub wanders_started: usize,
    /// Puppeted participants left alone
    pub puppets_skipped: usize,
}

/// Drives non-puppeted actors from the main loop.
#[derive(Debug)]
pub struct AmbientSim {
    settings: AmbientSettings,
    rng: SmallRng,
}

impl AmbientSim {
    /// Creates the simulation; a `seed` makes wandering reproducible.
    pub fn new(settings: AmbientSettings, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        Self { settings, rng }
    }

    pub fn settings(&self) -> &AmbientSettings {
        &self.settings
    }

    /// Runs one tick of `dt` seconds.
    pub fn step(&mut self, registry: &Registry, dt: f32) -> AmbientStep {
        let mut report = AmbientStep {
            removed: registry.apply_pending_removals(),
            ..AmbientStep::default()
        };
        for id in &report.removed {
            debug!("Removed participant {}", id);
        }

        let settings = &self.settings;
        let rng = &mut self.rng;
        registry.for_each_mut(|id, participant| {
            if participant.is_puppet() {
                report.puppets_skipped += 1;
                return;
            }

            let wants_to_move = rng.gen_range(1..=settings.move_chance) == 1;
            if wants_to_move
                && participant.animator.animation_name() == names::IDLE
                && participant.animator.set_animation(names::WALK).is_ok()
            {
                let x = if settings.wander_min_x < settings.wander_max_x {
                    rng.gen_range(settings.wander_min_x..=settings.wander_max_x)
                } else {
                    settings.wander_min_x
                };
                participant
                    .actor
                    .set_goal(Point::new(x, settings.floor_elevation));
                report.wanders_started += 1;
                debug!("Participant {} wanders to x={:.0}", id, x);
            }

            if participant.actor.goal().is_none()
                && participant.animator.animation_name() == names::WALK
            {
                return_to_idle(id, participant);
            }

            participant
                .actor
                .run_with(dt, settings.walk_speed, settings.move_epsilon);

            if participant.animator.play(dt) != Status::Running {
                return_to_idle(id, participant);
            }
            participant.sync_facing();
        });
        report
    }
}

fn return_to_idle(id: &ParticipantId, participant: &mut Participant) {
    if let Err(error) = participant.animator.set_animation(names::IDLE) {
        debug!("Participant {} cannot return to idle: {}", id, error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::AnimationLibrary;
    use std::sync::Arc;

    const DT: f32 = 1.0 / 60.0;

    fn settings(move_chance: u32) -> AmbientSettings {
        AmbientSettings {
            move_chance,
            walk_speed: 40.0,
            move_epsilon: 3.0,
            wander_min_x: 64.0,
            wander_max_x: 736.0,
            floor_elevation: 400.0,
        }
    }

    fn registry_with(names: &[&str]) -> Registry {
        let registry = Registry::new(400.0);
        let library = Arc::new(AnimationLibrary::standard());
        for (i, name) in names.iter().enumerate() {
            registry.add_participant(*name, 100.0 + 100.0 * i as f32, Arc::clone(&library));
        }
        registry
    }

    #[test]
    fn test_settings_from_config() {
        let settings = AmbientSettings::from_config(&PitConfig::default());
        assert_eq!(settings.wander_min_x, 64.0);
        assert_eq!(settings.wander_max_x, 736.0);
        assert_eq!(settings.floor_elevation, 236.0);
    }

    #[test]
    fn test_certain_move_assigns_goal_and_walks() {
        let registry = registry_with(&["a"]);
        let mut sim = AmbientSim::new(settings(1), Some(42));

        let step = sim.step(&registry, DT);
        assert_eq!(step.wanders_started, 1);

        let goal = registry
            .with_participant(&"a".into(), |p| {
                assert_eq!(p.animator.animation_name(), names::WALK);
                p.actor.goal()
            })
            .unwrap()
            .expect("goal set");
        assert!((64.0..=736.0).contains(&goal.x));
        assert_eq!(goal.y, 400.0);
    }

    #[test]
    fn test_puppets_are_skipped() {
        let registry = registry_with(&["a", "b"]);
        registry.set_puppet(&"a".into(), true).unwrap();
        let before = registry
            .with_participant(&"a".into(), |p| p.actor.position())
            .unwrap();

        let mut sim = AmbientSim::new(settings(1), Some(7));
        for _ in 0..120 {
            let step = sim.step(&registry, DT);
            assert_eq!(step.puppets_skipped, 1);
        }

        registry
            .with_participant(&"a".into(), |p| {
                assert!(p.actor.goal().is_none());
                assert_eq!(p.actor.position(), before);
                assert_eq!(p.animator.animation_name(), names::IDLE);
                assert_eq!(p.animator.elapsed(), 0.0);
            })
            .unwrap();
    }

    #[test]
    fn test_walker_returns_to_idle_after_arrival() {
        let registry = registry_with(&["a"]);
        registry
            .with_participant(&"a".into(), |p| {
                p.animator.set_animation(names::WALK).unwrap();
                p.actor.set_goal(Point::new(110.0, 400.0));
            })
            .unwrap();

        // move_chance is huge so no new wander starts
        let mut sim = AmbientSim::new(settings(u32::MAX), Some(1));
        for _ in 0..120 {
            sim.step(&registry, DT);
        }
        registry
            .with_participant(&"a".into(), |p| {
                assert!(p.actor.goal().is_none());
                assert_eq!(p.animator.animation_name(), names::IDLE);
                assert!(!p.animator.flipped());
            })
            .unwrap();
    }

    #[test]
    fn test_finished_one_shot_returns_to_idle() {
        let registry = registry_with(&["a"]);
        registry
            .with_participant(&"a".into(), |p| p.animator.set_animation(names::PETTED).unwrap())
            .unwrap();

        let mut sim = AmbientSim::new(settings(u32::MAX), Some(1));
        for _ in 0..90 {
            sim.step(&registry, DT);
        }
        let animation = registry
            .with_participant(&"a".into(), |p| p.animator.animation_name().to_string())
            .unwrap();
        assert_eq!(animation, names::IDLE);
    }

    #[test]
    fn test_pending_removals_applied_each_step() {
        let registry = registry_with(&["a", "b"]);
        registry.enqueue_removal("b");
        let mut sim = AmbientSim::new(settings(u32::MAX), Some(1));

        let step = sim.step(&registry, DT);
        assert_eq!(step.removed, vec![ParticipantId::new("b")]);
        assert_eq!(registry.ids(), vec![ParticipantId::new("a")]);
    }
}

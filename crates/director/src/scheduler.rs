//! Interaction Scheduler
//!
//! Pops one command at a time and runs it to completion on a fixed-step
//! virtual clock. Participants are puppeted for the whole interaction so
//! the ambient simulation leaves them alone.
//!
//! A two-actor interaction runs these phases:
//!
//! ```text
//! puppet ─▶ position ─▶ face ─▶ action ─▶ [faint] ─▶ reset ─▶ unpuppet
//! ```
//!
//! Every phase that waits advances the clock one tick per iteration. The
//! stop flag is only looked at between commands.

use pit_core::{
    anim, AnimationError, Animator, Participant, Point, Registry, RegistryError, SkinError,
    SkinSource, Status,
};
use pit_events::{Command, CommandId, DirectorEvent, DirectorEventKind, ParticipantId, Phase};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::catalog::{ActionKind, Interaction, PairInteraction};
use crate::clock::{FixedRateClock, TickSource};
use crate::config::DirectorConfig;
use crate::queue::CommandQueue;
use crate::trace::{EventSink, NullSink};

/// Errors raised while executing or managing interactions.
#[derive(Debug, Error)]
pub enum DirectorError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Animation(#[from] AnimationError),
    #[error(transparent)]
    Skin(#[from] SkinError),
    #[error("{phase} phase stalled after {ticks} ticks")]
    PhaseStalled { phase: Phase, ticks: u64 },
    #[error("handler panicked: {0}")]
    HandlerPanicked(String),
    #[error("director is already started")]
    AlreadyStarted,
    #[error("failed to spawn director thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("director did not stop within {0:?}")]
    ShutdownTimeout(Duration),
    #[error("director thread exited without reporting")]
    WorkerLost,
}

/// Result of one scheduling pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// The queue was empty; one idle tick elapsed
    Idle,
    Completed,
    Failed,
    /// The command was malformed and nothing ran
    Discarded,
}

/// Single-consumer interaction executor.
pub struct Scheduler {
    config: DirectorConfig,
    registry: Arc<Registry>,
    skins: Arc<dyn SkinSource>,
    queue: CommandQueue,
    clock: Box<dyn TickSource>,
    sink: Box<dyn EventSink>,
    tick: u64,
    current: Option<CommandId>,
}

impl Scheduler {
    /// Creates a scheduler that paces itself in real time and discards its
    /// trace.
    pub fn new(
        config: DirectorConfig,
        registry: Arc<Registry>,
        skins: Arc<dyn SkinSource>,
        queue: CommandQueue,
    ) -> Self {
        let clock = FixedRateClock::new(config.tick_rate);
        Self {
            config,
            registry,
            skins,
            queue,
            clock: Box::new(clock),
            sink: Box::new(NullSink),
            tick: 0,
            current: None,
        }
    }

    pub fn with_clock(mut self, clock: impl TickSource + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Virtual clock ticks elapsed so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Runs passes until `stop` is set, then drops whatever is still queued.
    ///
    /// Returns the number of dropped commands.
    pub fn run(&mut self, stop: &AtomicBool) -> usize {
        while !stop.load(Ordering::SeqCst) {
            self.run_pass();
        }
        let dropped = self.queue.drain().len();
        if dropped > 0 {
            info!("Dropping {} pending commands on shutdown", dropped);
        }
        self.record(DirectorEventKind::Stopped { dropped });
        dropped
    }

    /// Runs passes until the queue is empty. Returns how many commands were
    /// taken off the queue.
    pub fn run_until_idle(&mut self) -> usize {
        let mut handled = 0;
        while self.run_pass() != PassOutcome::Idle {
            handled += 1;
        }
        handled
    }

    /// Executes the next command, or idles one tick when there is none.
    pub fn run_pass(&mut self) -> PassOutcome {
        match self.queue.pop() {
            Some(command) => self.dispatch(command),
            None => {
                self.advance();
                PassOutcome::Idle
            }
        }
    }

    fn dispatch(&mut self, command: Command) -> PassOutcome {
        self.current = Some(command.id);
        let outcome = match Interaction::try_from(&command) {
            Err(error) => {
                warn!("Discarding command {}: {}", command.id, error);
                self.record(DirectorEventKind::CommandDiscarded {
                    reason: error.to_string(),
                });
                PassOutcome::Discarded
            }
            Ok(interaction) => {
                info!("Starting {} ({})", interaction.kind(), command.id);
                self.record(DirectorEventKind::CommandStarted {
                    action: command.action.clone(),
                });
                let result = panic::catch_unwind(AssertUnwindSafe(|| self.execute(interaction)))
                    .unwrap_or_else(|payload| Err(panicked(payload)));
                match result {
                    Ok(()) => {
                        info!("Completed {} ({})", command.action, command.id);
                        self.record(DirectorEventKind::CommandCompleted);
                        PassOutcome::Completed
                    }
                    Err(failure) => {
                        error!("Command {:?} failed: {}", command, failure);
                        self.record(DirectorEventKind::CommandFailed {
                            reason: failure.to_string(),
                        });
                        PassOutcome::Failed
                    }
                }
            }
        };
        self.current = None;
        outcome
    }

    fn execute(&mut self, interaction: Interaction) -> Result<(), DirectorError> {
        match interaction {
            Interaction::Pair(pair) => {
                let ids = pair.participants();
                self.execute_puppeted(&ids, |scheduler| scheduler.pair_interaction(&pair))
            }
            Interaction::Faint { actor } => {
                let ids = [actor.clone()];
                self.execute_puppeted(&ids, |scheduler| scheduler.faint(&actor))
            }
            Interaction::UpdateSkin { actor, skin } => self.update_skin(&actor, skin.as_deref()),
        }
    }

    /// Puppets `ids`, runs `body`, then unpuppets them whatever happened.
    fn execute_puppeted(
        &mut self,
        ids: &[ParticipantId],
        body: impl FnOnce(&mut Self) -> Result<(), DirectorError>,
    ) -> Result<(), DirectorError> {
        self.registry.puppet_all(ids)?;
        for id in ids {
            // An ambient wander goal no longer applies once puppeted.
            self.registry.with_participant(id, |p| p.actor.clear_goal())?;
        }
        self.record(DirectorEventKind::Puppeted {
            participants: ids.to_vec(),
        });

        let result = panic::catch_unwind(AssertUnwindSafe(|| body(self)))
            .unwrap_or_else(|payload| Err(panicked(payload)));

        if result.is_err() {
            for id in ids {
                let reset = self
                    .registry
                    .with_participant(id, |p| p.animator.set_animation(anim::IDLE));
                if let Ok(Err(error)) = reset {
                    warn!("Participant {} cannot return to idle: {}", id, error);
                }
            }
        }
        let released = self.registry.unpuppet_all(ids);
        for id in ids.iter().filter(|id| !released.contains(id)) {
            warn!("Participant {} vanished during an interaction", id);
        }
        self.record(DirectorEventKind::Unpuppeted {
            participants: ids.to_vec(),
        });
        result
    }

    fn pair_interaction(&mut self, pair: &PairInteraction) -> Result<(), DirectorError> {
        let (initiator, target) = (&pair.initiator, &pair.target);

        if pair.positioning {
            self.position(initiator, target)?;
        }

        self.start_phase(Phase::Face);
        self.registry.with_pair(initiator, target, face_each_other)?;

        self.start_phase(Phase::Action);
        self.registry.with_pair(initiator, target, |i, t| {
            if pair.defense.defend_target {
                t.set_defended(true);
            }
            if pair.defense.undefend_target {
                t.set_defended(false);
            }
            if pair.defense.undefend_initiator {
                i.set_defended(false);
            }
            i.animator.set_animation(pair.initiator_animation)?;
            t.animator.set_animation(pair.target_animation)
        })??;
        self.wait_for(Phase::Action, |registry, dt| {
            registry.with_pair(initiator, target, |i, t| {
                let first = i.animator.play(dt);
                let second = t.animator.play(dt);
                !first.is_running() && !second.is_running()
            })
        })?;

        let fainting: Vec<ParticipantId> = [
            (pair.initiator_faints, initiator),
            (pair.target_faints, target),
        ]
        .into_iter()
        .filter(|(faints, _)| *faints)
        .map(|(_, id)| id.clone())
        .collect();
        if !fainting.is_empty() {
            self.play_in_place(Phase::Faint, &fainting, faint_animation())?;
        }

        self.start_phase(Phase::Reset);
        self.registry.with_pair(initiator, target, |i, t| {
            i.animator.set_animation(anim::IDLE)?;
            t.animator.set_animation(anim::IDLE)
        })??;
        Ok(())
    }

    /// Runs the initiator to the slot beside the target and snaps it there.
    fn position(
        &mut self,
        initiator: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<(), DirectorError> {
        self.start_phase(Phase::Position);
        let spacing = self.config.sprite_spacing;
        let floor = self.config.floor_elevation;
        let slot = self.registry.with_pair(initiator, target, |i, t| {
            i.animator.set_animation(anim::RUN)?;
            t.animator.set_animation(anim::IDLE)?;
            face_each_other(i, t);
            Ok::<_, AnimationError>(slot_beside(i.actor.x(), t.actor.x(), spacing, floor))
        })??;
        debug!("{} runs to ({:.0}, {:.0})", initiator, slot.x, slot.y);

        let speed = self.config.run_speed;
        let epsilon = self.config.move_epsilon;
        self.wait_for(Phase::Position, |registry, dt| {
            registry.with_pair(initiator, target, |i, t| {
                i.animator.play(dt);
                t.animator.play(dt);
                let arrived = i.actor.move_to_point(slot, speed, epsilon, dt) == Status::Success;
                if arrived {
                    i.actor.set_position(slot);
                }
                i.sync_facing();
                arrived
            })
        })
    }

    fn faint(&mut self, actor: &ParticipantId) -> Result<(), DirectorError> {
        self.play_in_place(Phase::Faint, std::slice::from_ref(actor), faint_animation())?;
        self.start_phase(Phase::Reset);
        self.registry
            .with_participant(actor, |p| p.animator.set_animation(anim::IDLE))??;
        Ok(())
    }

    /// Plays `animation` on every id until all of them finish.
    fn play_in_place(
        &mut self,
        phase: Phase,
        ids: &[ParticipantId],
        animation: &str,
    ) -> Result<(), DirectorError> {
        self.start_phase(phase);
        for id in ids {
            self.registry
                .with_participant(id, |p| p.animator.set_animation(animation))??;
        }
        self.wait_for(phase, |registry, dt| {
            let mut done = true;
            for id in ids {
                let status = registry.with_participant(id, |p| p.animator.play(dt))?;
                done &= !status.is_running();
            }
            Ok(done)
        })
    }

    fn update_skin(
        &mut self,
        actor: &ParticipantId,
        skin: Option<&str>,
    ) -> Result<(), DirectorError> {
        if !self.registry.contains(actor) {
            return Err(RegistryError::UnknownParticipant(actor.clone()).into());
        }
        let library = self.skins.resolve(actor, skin)?;
        self.registry.with_participant(actor, |p| {
            p.animator = Animator::new(library);
            p.sync_facing();
            p.animator.set_animation(anim::IDLE)
        })??;
        info!("Updated skin of {} to {}", actor, skin.unwrap_or("default choice"));
        Ok(())
    }

    /// Ticks until `step` reports done, failing when the phase budget runs
    /// out.
    fn wait_for(
        &mut self,
        phase: Phase,
        mut step: impl FnMut(&Registry, f32) -> Result<bool, RegistryError>,
    ) -> Result<(), DirectorError> {
        let mut ticks = 0;
        loop {
            let dt = self.advance();
            ticks += 1;
            if step(&self.registry, dt)? {
                debug!("{} phase finished after {} ticks", phase, ticks);
                return Ok(());
            }
            if let Some(limit) = self.config.max_phase_ticks {
                if ticks >= limit {
                    return Err(DirectorError::PhaseStalled { phase, ticks });
                }
            }
        }
    }

    fn advance(&mut self) -> f32 {
        let dt = self.clock.tick();
        self.tick += 1;
        dt
    }

    fn start_phase(&mut self, phase: Phase) {
        debug!("Phase {} at tick {}", phase, self.tick);
        self.record(DirectorEventKind::PhaseStarted { phase });
    }

    fn record(&mut self, kind: DirectorEventKind) {
        self.sink
            .record(DirectorEvent::new(self.tick, self.current, kind));
    }
}

/// Where an initiator at `initiator_x` stands to interact with a target at
/// `target_x`: on the initiator's side, `spacing` away, on the floor.
pub fn slot_beside(initiator_x: f32, target_x: f32, spacing: f32, floor_elevation: f32) -> Point {
    let x = if initiator_x <= target_x {
        target_x - spacing
    } else {
        target_x + spacing
    };
    Point::new(x, floor_elevation)
}

fn faint_animation() -> &'static str {
    ActionKind::Faint
        .spec()
        .initiator_animation
        .unwrap_or(anim::FAINT)
}

fn face_each_other(initiator: &mut Participant, target: &mut Participant) {
    let (initiator_x, target_x) = (initiator.actor.x(), target.actor.x());
    initiator.actor.face_toward(target_x);
    target.actor.face_toward(initiator_x);
    initiator.sync_facing();
    target.sync_facing();
}

fn panicked(payload: Box<dyn Any + Send>) -> DirectorError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    DirectorError::HandlerPanicked(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SteppedClock;
    use crate::trace::MemorySink;
    use pit_core::{AnimationLibrary, ClipSpec, SkinCatalog};

    fn quick_library() -> AnimationLibrary {
        AnimationLibrary::new([
            ClipSpec::new(anim::IDLE, 2, 4.0, true),
            ClipSpec::new(anim::RUN, 2, 4.0, true),
            ClipSpec::new(anim::PET, 4, 4.0, false),
            ClipSpec::new(anim::PETTED, 8, 4.0, false),
            ClipSpec::new(anim::FAINT, 4, 4.0, false),
        ])
        .unwrap()
    }

    fn config() -> DirectorConfig {
        DirectorConfig {
            tick_rate: 4,
            floor_elevation: 400.0,
            ..DirectorConfig::default()
        }
    }

    fn scheduler(config: DirectorConfig, positions: &[(&str, f32)]) -> (Scheduler, MemorySink) {
        let registry = Arc::new(Registry::new(400.0));
        let library = Arc::new(quick_library());
        for (name, x) in positions {
            registry.add_participant(*name, *x, Arc::clone(&library));
        }
        let skins = Arc::new(SkinCatalog::new().with_pool_skin("quick", quick_library()));
        let sink = MemorySink::new();
        let scheduler = Scheduler::new(config, registry, skins, CommandQueue::new())
            .with_clock(SteppedClock::new(4))
            .with_sink(sink.clone());
        (scheduler, sink)
    }

    fn kinds(sink: &MemorySink) -> Vec<DirectorEventKind> {
        sink.events().into_iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_slot_is_on_initiator_side() {
        assert_eq!(slot_beside(100.0, 600.0, 64.0, 400.0), Point::new(536.0, 400.0));
        assert_eq!(slot_beside(700.0, 600.0, 64.0, 400.0), Point::new(664.0, 400.0));
        assert_eq!(slot_beside(600.0, 600.0, 64.0, 400.0), Point::new(536.0, 400.0));
    }

    #[test]
    fn test_empty_queue_idles_one_tick() {
        let (mut scheduler, sink) = scheduler(config(), &[]);
        assert_eq!(scheduler.run_pass(), PassOutcome::Idle);
        assert_eq!(scheduler.tick(), 1);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_pet_phases_in_order() {
        let (mut scheduler, sink) = scheduler(config(), &[("a", 100.0), ("b", 600.0)]);
        scheduler.queue().enqueue(Command::pair("pet", "a", "b"));
        assert_eq!(scheduler.run_pass(), PassOutcome::Completed);

        let phases: Vec<Phase> = kinds(&sink)
            .into_iter()
            .filter_map(|kind| match kind {
                DirectorEventKind::PhaseStarted { phase } => Some(phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![Phase::Position, Phase::Face, Phase::Action, Phase::Reset]
        );
        assert!(matches!(
            kinds(&sink).last(),
            Some(DirectorEventKind::CommandCompleted)
        ));
    }

    #[test]
    fn test_unknown_participant_fails_without_puppeting() {
        let (mut scheduler, sink) = scheduler(config(), &[("a", 100.0)]);
        scheduler.queue().enqueue(Command::pair("pet", "a", "ghost"));
        assert_eq!(scheduler.run_pass(), PassOutcome::Failed);

        assert!(!scheduler.registry().is_puppet(&"a".into()));
        assert!(!kinds(&sink)
            .iter()
            .any(|kind| matches!(kind, DirectorEventKind::Puppeted { .. })));
    }

    #[test]
    fn test_animation_error_still_unpuppets() {
        // the quick library has no attack clip
        let (mut scheduler, sink) = scheduler(config(), &[("a", 100.0), ("b", 600.0)]);
        scheduler.queue().enqueue(Command::pair("squash", "a", "b"));
        assert_eq!(scheduler.run_pass(), PassOutcome::Failed);

        let registry = scheduler.registry();
        assert!(!registry.is_puppet(&"a".into()));
        assert!(!registry.is_puppet(&"b".into()));
        let kinds = kinds(&sink);
        let unpuppet = kinds
            .iter()
            .position(|k| matches!(k, DirectorEventKind::Unpuppeted { .. }))
            .unwrap();
        let failed = kinds
            .iter()
            .position(|k| matches!(k, DirectorEventKind::CommandFailed { .. }))
            .unwrap();
        assert!(unpuppet < failed);
    }

    #[test]
    fn test_failed_reset_to_idle_still_unpuppets() {
        let (mut scheduler, sink) = scheduler(config(), &[]);
        let bare = AnimationLibrary::new([ClipSpec::new(anim::RUN, 2, 4.0, true)]).unwrap();
        scheduler.registry().add_participant("bare", 10.0, Arc::new(bare));
        scheduler.queue().enqueue(Command::single("faint", "bare"));

        assert_eq!(scheduler.run_pass(), PassOutcome::Failed);
        assert!(!scheduler.registry().is_puppet(&"bare".into()));
        assert!(kinds(&sink)
            .iter()
            .any(|kind| matches!(kind, DirectorEventKind::Unpuppeted { .. })));
    }

    #[test]
    fn test_panicking_handler_is_contained() {
        let (mut scheduler, sink) = scheduler(config(), &[("a", 100.0)]);
        let ids = [ParticipantId::new("a")];
        let result = scheduler.execute_puppeted(&ids, |_| panic!("boom"));

        match result {
            Err(DirectorError::HandlerPanicked(message)) => assert_eq!(message, "boom"),
            other => panic!("unexpected result {:?}", other),
        }
        assert!(!scheduler.registry().is_puppet(&ids[0]));
        assert!(matches!(
            kinds(&sink).last(),
            Some(DirectorEventKind::Unpuppeted { .. })
        ));
    }

    #[test]
    fn test_faint_plays_in_place() {
        let (mut scheduler, _sink) = scheduler(config(), &[("a", 250.0)]);
        scheduler.queue().enqueue(Command::single("faint", "a"));
        assert_eq!(scheduler.run_pass(), PassOutcome::Completed);
        // four 0.25s frames
        assert_eq!(scheduler.tick(), 4);

        scheduler
            .registry()
            .with_participant(&"a".into(), |p| {
                assert_eq!(p.actor.x(), 250.0);
                assert_eq!(p.animator.animation_name(), anim::IDLE);
            })
            .unwrap();
    }

    #[test]
    fn test_update_skin_replaces_animator() {
        let (mut scheduler, sink) = scheduler(config(), &[("a", 250.0)]);
        scheduler
            .queue()
            .enqueue(Command::single("update_skin", "a").with_metadata(serde_json::json!({"skin": "quick"})));
        assert_eq!(scheduler.run_pass(), PassOutcome::Completed);
        assert_eq!(scheduler.tick(), 0);
        assert!(!kinds(&sink)
            .iter()
            .any(|kind| matches!(kind, DirectorEventKind::Puppeted { .. })));
    }

    #[test]
    fn test_update_skin_unknown_skin_fails() {
        let (mut scheduler, _sink) = scheduler(config(), &[("a", 250.0)]);
        scheduler
            .queue()
            .enqueue(Command::single("update_skin", "a").with_metadata(serde_json::json!({"skin": "nope"})));
        assert_eq!(scheduler.run_pass(), PassOutcome::Failed);
    }

    #[test]
    fn test_run_drops_pending_when_stopped() {
        let (mut scheduler, sink) = scheduler(config(), &[("a", 100.0), ("b", 600.0)]);
        for _ in 0..3 {
            scheduler.queue().enqueue(Command::pair("pet", "a", "b"));
        }
        let stop = AtomicBool::new(true);
        assert_eq!(scheduler.run(&stop), 3);
        assert_eq!(kinds(&sink), vec![DirectorEventKind::Stopped { dropped: 3 }]);
        assert!(scheduler.queue().is_empty());
    }
}

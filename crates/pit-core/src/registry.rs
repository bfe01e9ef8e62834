//! Participant Registry
//!
//! Maps participant ids to their actor, animator and flags. The director
//! and the main loop both work through this registry.
//!
//! While a participant is puppeted only the director may change its
//! position, goal or animation; the ambient simulation skips it. The puppet
//! flag is the arbiter of who writes, and the registry lock makes every
//! read and write (including add and remove) atomic with respect to
//! iteration.

use pit_events::ParticipantId;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

use crate::actor::{Actor, Point};
use crate::animation::{names, AnimationLibrary, Animator, CropRect};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("participant '{0}' is not registered")]
    UnknownParticipant(ParticipantId),
    #[error("participant '{0}' appears twice in one interaction")]
    SameParticipant(ParticipantId),
    #[error("participant '{0}' is already puppeted")]
    AlreadyPuppeted(ParticipantId),
}

/// One registry entry.
#[derive(Debug, Clone)]
pub struct Participant {
    pub actor: Actor,
    pub animator: Animator,
    /// Text drawn above the actor
    pub nametag: String,
    puppet: bool,
    defended: bool,
}

impl Participant {
    pub fn new(actor: Actor, animator: Animator, nametag: impl Into<String>) -> Self {
        Self {
            actor,
            animator,
            nametag: nametag.into(),
            puppet: false,
            defended: false,
        }
    }

    pub fn is_puppet(&self) -> bool {
        self.puppet
    }

    pub fn is_defended(&self) -> bool {
        self.defended
    }

    pub fn set_defended(&mut self, defended: bool) {
        self.defended = defended;
    }

    /// Copies the actor's facing into the animator.
    pub fn sync_facing(&mut self) {
        self.animator.set_flipped(self.actor.flipped());
    }

    fn view(&self, id: &ParticipantId) -> ParticipantView {
        ParticipantView {
            id: id.clone(),
            position: self.actor.position(),
            crop: self.animator.crop_rect(),
            flipped: self.animator.flipped(),
            defended: self.defended,
            puppet: self.puppet,
            animation: self.animator.animation_name().to_string(),
            nametag: self.nametag.clone(),
        }
    }
}

/// What the renderer needs to draw one participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantView {
    pub id: ParticipantId,
    pub position: Point,
    pub crop: CropRect,
    pub flipped: bool,
    pub defended: bool,
    pub puppet: bool,
    pub animation: String,
    pub nametag: String,
}

#[derive(Debug, Default)]
struct RegistryState {
    participants: BTreeMap<ParticipantId, Participant>,
    pending_removals: VecDeque<ParticipantId>,
}

/// Thread-safe participant registry.
#[derive(Debug)]
pub struct Registry {
    state: Mutex<RegistryState>,
    floor_elevation: f32,
}

impl Registry {
    /// Creates an empty registry whose actors stand at `floor_elevation`.
    pub fn new(floor_elevation: f32) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            floor_elevation,
        }
    }

    pub fn floor_elevation(&self) -> f32 {
        self.floor_elevation
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a participant standing at `x` on the floor, playing `idle`.
    ///
    /// Returns false if the participant already exists.
    pub fn add_participant(
        &self,
        id: impl Into<ParticipantId>,
        x: f32,
        library: Arc<AnimationLibrary>,
    ) -> bool {
        let id = id.into();
        let mut state = self.lock();
        if state.participants.contains_key(&id) {
            return false;
        }
        let mut animator = Animator::new(library);
        if let Err(error) = animator.set_animation(names::IDLE) {
            debug!("Participant {} has no idle clip: {}", id, error);
        }
        let participant = Participant::new(
            Actor::new(x, self.floor_elevation),
            animator,
            id.to_string(),
        );
        state.participants.insert(id, participant);
        true
    }

    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.lock().participants.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().participants.is_empty()
    }

    pub fn ids(&self) -> Vec<ParticipantId> {
        self.lock().participants.keys().cloned().collect()
    }

    /// Queues a participant for removal by [`Registry::apply_pending_removals`].
    pub fn enqueue_removal(&self, id: impl Into<ParticipantId>) {
        self.lock().pending_removals.push_back(id.into());
    }

    pub fn pending_removals(&self) -> usize {
        self.lock().pending_removals.len()
    }

    /// Removes every queued participant that is not puppeted. Puppeted ones
    /// stay queued; unknown ids are dropped.
    pub fn apply_pending_removals(&self) -> Vec<ParticipantId> {
        let mut state = self.lock();
        let state = &mut *state;
        let mut removed = Vec::new();
        let mut still_pending = VecDeque::new();

        while let Some(id) = state.pending_removals.pop_front() {
            match state.participants.get(&id) {
                Some(participant) if participant.is_puppet() => still_pending.push_back(id),
                Some(_) => {
                    state.participants.remove(&id);
                    removed.push(id);
                }
                None => debug!("Dropping removal of unknown participant {}", id),
            }
        }
        state.pending_removals = still_pending;
        removed
    }

    /// Runs `f` on one participant under the registry lock.
    pub fn with_participant<R>(
        &self,
        id: &ParticipantId,
        f: impl FnOnce(&mut Participant) -> R,
    ) -> Result<R, RegistryError> {
        let mut state = self.lock();
        let participant = state
            .participants
            .get_mut(id)
            .ok_or_else(|| RegistryError::UnknownParticipant(id.clone()))?;
        Ok(f(participant))
    }

    /// Runs `f` on two distinct participants under one lock.
    pub fn with_pair<R>(
        &self,
        first: &ParticipantId,
        second: &ParticipantId,
        f: impl FnOnce(&mut Participant, &mut Participant) -> R,
    ) -> Result<R, RegistryError> {
        if first == second {
            return Err(RegistryError::SameParticipant(first.clone()));
        }
        let mut state = self.lock();
        let mut a = None;
        let mut b = None;
        for (id, participant) in state.participants.iter_mut() {
            if id == first {
                a = Some(participant);
            } else if id == second {
                b = Some(participant);
            }
        }
        match (a, b) {
            (Some(a), Some(b)) => Ok(f(a, b)),
            (None, _) => Err(RegistryError::UnknownParticipant(first.clone())),
            (_, None) => Err(RegistryError::UnknownParticipant(second.clone())),
        }
    }

    /// Runs `f` on every participant in id order under one lock.
    pub fn for_each_mut(&self, mut f: impl FnMut(&ParticipantId, &mut Participant)) {
        let mut state = self.lock();
        for (id, participant) in state.participants.iter_mut() {
            f(id, participant);
        }
    }

    pub fn set_puppet(&self, id: &ParticipantId, puppet: bool) -> Result<(), RegistryError> {
        self.with_participant(id, |participant| participant.puppet = puppet)
    }

    /// Puppets all of `ids` or none of them.
    pub fn puppet_all(&self, ids: &[ParticipantId]) -> Result<(), RegistryError> {
        let mut state = self.lock();
        for (index, id) in ids.iter().enumerate() {
            if ids[..index].contains(id) {
                return Err(RegistryError::SameParticipant(id.clone()));
            }
            match state.participants.get(id) {
                None => return Err(RegistryError::UnknownParticipant(id.clone())),
                Some(participant) if participant.puppet => {
                    return Err(RegistryError::AlreadyPuppeted(id.clone()))
                }
                Some(_) => {}
            }
        }
        for id in ids {
            if let Some(participant) = state.participants.get_mut(id) {
                participant.puppet = true;
            }
        }
        Ok(())
    }

    /// Releases `ids`, returning those that were still registered.
    pub fn unpuppet_all(&self, ids: &[ParticipantId]) -> Vec<ParticipantId> {
        let mut state = self.lock();
        ids.iter()
            .filter(|id| match state.participants.get_mut(*id) {
                Some(participant) => {
                    participant.puppet = false;
                    true
                }
                None => false,
            })
            .cloned()
            .collect()
    }

    pub fn is_puppet(&self, id: &ParticipantId) -> bool {
        self.lock()
            .participants
            .get(id)
            .is_some_and(Participant::is_puppet)
    }

    pub fn set_defended(&self, id: &ParticipantId, defended: bool) -> Result<(), RegistryError> {
        self.with_participant(id, |participant| participant.defended = defended)
    }

    /// Marks a participant defended; unknown ids are ignored.
    pub fn defend(&self, id: &ParticipantId) {
        let _ = self.set_defended(id, true);
    }

    /// Clears a participant's defended flag; unknown ids are ignored.
    pub fn undefend(&self, id: &ParticipantId) {
        let _ = self.set_defended(id, false);
    }

    pub fn is_defended(&self, id: &ParticipantId) -> bool {
        self.lock()
            .participants
            .get(id)
            .is_some_and(Participant::is_defended)
    }

    /// Render views of every participant in id order.
    pub fn snapshot(&self) -> Vec<ParticipantView> {
        self.lock()
            .participants
            .iter()
            .map(|(id, participant)| participant.view(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(names: &[(&str, f32)]) -> Registry {
        let registry = Registry::new(400.0);
        let library = Arc::new(AnimationLibrary::standard());
        for (name, x) in names {
            assert!(registry.add_participant(*name, *x, Arc::clone(&library)));
        }
        registry
    }

    fn id(name: &str) -> ParticipantId {
        ParticipantId::new(name)
    }

    #[test]
    fn test_add_places_actor_on_floor_idle() {
        let registry = registry_with(&[("a", 100.0)]);
        let view = &registry.snapshot()[0];
        assert_eq!(view.position, Point::new(100.0, 400.0));
        assert_eq!(view.animation, names::IDLE);
        assert!(!view.puppet);
        assert!(!view.defended);
        assert_eq!(view.nametag, "a");
    }

    #[test]
    fn test_add_twice_keeps_original() {
        let registry = registry_with(&[("a", 100.0)]);
        let library = Arc::new(AnimationLibrary::standard());
        assert!(!registry.add_participant("a", 700.0, library));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()[0].position.x, 100.0);
    }

    #[test]
    fn test_removal_deferred_while_puppeted() {
        let registry = registry_with(&[("a", 100.0), ("b", 600.0)]);
        registry.set_puppet(&id("a"), true).unwrap();
        registry.enqueue_removal("a");
        registry.enqueue_removal("b");
        registry.enqueue_removal("ghost");

        assert_eq!(registry.apply_pending_removals(), vec![id("b")]);
        assert!(registry.contains(&id("a")));
        assert_eq!(registry.pending_removals(), 1);

        registry.set_puppet(&id("a"), false).unwrap();
        assert_eq!(registry.apply_pending_removals(), vec![id("a")]);
        assert!(registry.is_empty());
        assert_eq!(registry.pending_removals(), 0);
    }

    #[test]
    fn test_with_pair_rejects_same_and_unknown() {
        let registry = registry_with(&[("a", 100.0), ("b", 600.0)]);
        assert_eq!(
            registry.with_pair(&id("a"), &id("a"), |_, _| ()),
            Err(RegistryError::SameParticipant(id("a")))
        );
        assert_eq!(
            registry.with_pair(&id("a"), &id("zz"), |_, _| ()),
            Err(RegistryError::UnknownParticipant(id("zz")))
        );
        let xs = registry
            .with_pair(&id("b"), &id("a"), |b, a| (b.actor.x(), a.actor.x()))
            .unwrap();
        assert_eq!(xs, (600.0, 100.0));
    }

    #[test]
    fn test_puppet_all_is_atomic() {
        let registry = registry_with(&[("a", 100.0), ("b", 600.0)]);
        assert_eq!(
            registry.puppet_all(&[id("a"), id("missing")]),
            Err(RegistryError::UnknownParticipant(id("missing")))
        );
        assert!(!registry.is_puppet(&id("a")));

        registry.puppet_all(&[id("a"), id("b")]).unwrap();
        assert!(registry.is_puppet(&id("a")) && registry.is_puppet(&id("b")));
        assert_eq!(
            registry.puppet_all(&[id("b")]),
            Err(RegistryError::AlreadyPuppeted(id("b")))
        );

        assert_eq!(registry.unpuppet_all(&[id("a"), id("b"), id("c")]), vec![id("a"), id("b")]);
        assert!(!registry.is_puppet(&id("a")));
    }

    #[test]
    fn test_defended_flags() {
        let registry = registry_with(&[("a", 100.0)]);
        registry.defend(&id("a"));
        assert!(registry.is_defended(&id("a")));
        registry.undefend(&id("a"));
        assert!(!registry.is_defended(&id("a")));

        registry.defend(&id("ghost"));
        assert!(!registry.is_defended(&id("ghost")));
        assert!(registry.set_defended(&id("ghost"), true).is_err());
    }

    #[test]
    fn test_snapshot_in_id_order() {
        let registry = registry_with(&[("zed", 1.0), ("amy", 2.0), ("kim", 3.0)]);
        let names: Vec<String> = registry.snapshot().into_iter().map(|v| v.nametag).collect();
        assert_eq!(names, vec!["amy", "kim", "zed"]);
    }
}

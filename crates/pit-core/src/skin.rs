//! Skin Resolution
//!
//! A skin is the animation library an actor is drawn with. Participants may
//! have a special skin under their own name; everyone else gets a random
//! pick from the pool unless they chose one.

use pit_events::ParticipantId;
use rand::seq::IteratorRandom;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use crate::animation::AnimationLibrary;

/// Pool name of the built-in skin.
pub const DEFAULT_SKIN: &str = "default";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkinError {
    #[error("no special skin exists for '{0}'")]
    NoSpecialSkin(ParticipantId),
    #[error("unknown skin '{0}'")]
    UnknownSkin(String),
    #[error("the random skin pool is empty")]
    EmptyPool,
}

/// Collaborator that decides what a participant looks like.
pub trait SkinSource: Send + Sync {
    /// Returns the library `participant` should be drawn with.
    ///
    /// With `requested` set, switches the participant to that skin;
    /// otherwise returns their current choice or a fresh default.
    fn resolve(
        &self,
        participant: &ParticipantId,
        requested: Option<&str>,
    ) -> Result<Arc<AnimationLibrary>, SkinError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SkinChoice {
    Special,
    Pool(String),
}

/// In-memory skin source. Overrides live only as long as the catalog.
#[derive(Debug, Default)]
pub struct SkinCatalog {
    special: HashMap<String, Arc<AnimationLibrary>>,
    pool: BTreeMap<String, Arc<AnimationLibrary>>,
    overrides: Mutex<HashMap<ParticipantId, SkinChoice>>,
}

impl SkinCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog whose pool holds only the built-in skin.
    pub fn standard() -> Self {
        Self::new().with_pool_skin(DEFAULT_SKIN, AnimationLibrary::standard())
    }

    pub fn with_pool_skin(mut self, name: impl Into<String>, library: AnimationLibrary) -> Self {
        self.pool.insert(name.into(), Arc::new(library));
        self
    }

    pub fn with_special_skin(
        mut self,
        participant: impl Into<String>,
        library: AnimationLibrary,
    ) -> Self {
        self.special.insert(participant.into(), Arc::new(library));
        self
    }

    pub fn pool_names(&self) -> impl Iterator<Item = &str> {
        self.pool.keys().map(String::as_str)
    }

    /// The skin name a participant picked, if any.
    pub fn override_for(&self, participant: &ParticipantId) -> Option<String> {
        let overrides = self.overrides.lock().unwrap_or_else(PoisonError::into_inner);
        overrides.get(participant).map(|choice| match choice {
            SkinChoice::Special => participant.to_string(),
            SkinChoice::Pool(name) => name.clone(),
        })
    }

    fn lookup(
        &self,
        participant: &ParticipantId,
        choice: &SkinChoice,
    ) -> Result<Arc<AnimationLibrary>, SkinError> {
        match choice {
            SkinChoice::Special => self
                .special
                .get(participant.as_str())
                .cloned()
                .ok_or_else(|| SkinError::NoSpecialSkin(participant.clone())),
            SkinChoice::Pool(name) => self
                .pool
                .get(name)
                .cloned()
                .ok_or_else(|| SkinError::UnknownSkin(name.clone())),
        }
    }
}

impl SkinSource for SkinCatalog {
    fn resolve(
        &self,
        participant: &ParticipantId,
        requested: Option<&str>,
    ) -> Result<Arc<AnimationLibrary>, SkinError> {
        let mut overrides = self.overrides.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(skin) = requested {
            let choice = if skin == participant.as_str() {
                SkinChoice::Special
            } else {
                SkinChoice::Pool(skin.to_string())
            };
            let library = self.lookup(participant, &choice)?;
            overrides.insert(participant.clone(), choice);
            return Ok(library);
        }

        if let Some(choice) = overrides.get(participant) {
            return self.lookup(participant, choice);
        }
        if let Some(library) = self.special.get(participant.as_str()) {
            return Ok(Arc::clone(library));
        }
        self.pool
            .values()
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or(SkinError::EmptyPool)
    }
}

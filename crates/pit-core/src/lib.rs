//! Core fight pit state: actors, animation playback, skins, the participant
//! registry and the ambient (wandering) simulation.
//!
//! # Modules
//!
//! - [`actor`]: 2D goal-seeking movement and facing
//! - [`animation`]: clip specs, animation libraries and per-actor playback
//! - [`skin`]: appearance resolution for participants
//! - [`registry`]: participant registry shared by the director and the main loop
//! - [`ambient`]: idle/wander behaviour for non-puppeted actors
//! - [`config`]: TOML configuration

pub mod actor;
pub mod ambient;
pub mod animation;
pub mod config;
pub mod registry;
pub mod skin;
pub mod status;

pub use actor::{Actor, Point, DEFAULT_WALK_EPSILON, DEFAULT_WALK_SPEED, MIN_APPROACH_SPEED};
pub use ambient::{AmbientSettings, AmbientSim, AmbientStep};
pub use animation::{
    names as anim, AnimationError, AnimationLibrary, Animator, ClipSpec, CropRect,
    DEFAULT_FRAME_SIZE, DEFAULT_SHEET_FPS,
};
pub use config::{
    default_config_toml, AmbientConfig, ChatConfig, ConfigError, InteractionConfig, MovementConfig,
    PitConfig, StageConfig, TimingConfig,
};
pub use registry::{Participant, ParticipantView, Registry, RegistryError};
pub use skin::{SkinCatalog, SkinError, SkinSource, DEFAULT_SKIN};
pub use status::Status;

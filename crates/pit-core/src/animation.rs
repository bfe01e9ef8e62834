//! Animation Playback
//!
//! A [`ClipSpec`] describes one sprite-sheet animation; an
//! [`AnimationLibrary`] groups the clips of one skin by name (a name may
//! have several variants); an [`Animator`] plays one clip at a time for one
//! actor. Image loading stays outside this crate: the loader only needs to
//! report sheet dimensions to [`ClipSpec::from_sheet_name`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::status::Status;

/// Playback rate assumed for sheets named without an explicit rate.
pub const DEFAULT_SHEET_FPS: f32 = 12.0;

/// Frame edge length of the built-in clips, in pixels.
pub const DEFAULT_FRAME_SIZE: u32 = 128;

/// Animation names the director and the ambient simulation rely on.
pub mod names {
    pub const IDLE: &str = "idle";
    pub const WALK: &str = "walk";
    pub const RUN: &str = "run";
    pub const PET: &str = "pet";
    pub const PETTED: &str = "petted";
    pub const ATTACK: &str = "attack";
    pub const DAMAGE: &str = "damage";
    pub const COUNTER: &str = "counter";
    pub const HEAL: &str = "heal";
    pub const HEALED: &str = "healed";
    pub const DEFEND: &str = "defend";
    pub const DEFENDED: &str = "defended";
    pub const FAINT: &str = "faint";
}

/// Errors from building or driving animations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnimationError {
    #[error("unknown animation '{0}'")]
    UnknownAnimation(String),
    #[error("animation '{name}' has no variant {index}")]
    UnknownVariant { name: String, index: usize },
    #[error("animation library has no clips")]
    EmptyLibrary,
    #[error("clip '{name}' is invalid: {reason}")]
    InvalidClip { name: String, reason: &'static str },
    #[error("sheet file name '{0}' is not of the form name_fps_loop.png")]
    BadSheetName(String),
}

/// Static description of one animation clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipSpec {
    pub name: String,
    pub frame_count: u32,
    pub frames_per_second: f32,
    pub looping: bool,
    /// Edge length of one square frame
    #[serde(default = "default_frame_size")]
    pub frame_size: u32,
}

fn default_frame_size() -> u32 {
    DEFAULT_FRAME_SIZE
}

impl ClipSpec {
    pub fn new(name: impl Into<String>, frame_count: u32, frames_per_second: f32, looping: bool) -> Self {
        Self {
            name: name.into(),
            frame_count,
            frames_per_second,
            looping,
            frame_size: DEFAULT_FRAME_SIZE,
        }
    }

    pub fn with_frame_size(mut self, frame_size: u32) -> Self {
        self.frame_size = frame_size;
        self
    }

    /// Seconds each frame stays on screen.
    pub fn frame_duration(&self) -> f32 {
        1.0 / self.frames_per_second
    }

    /// Seconds for one full pass through the clip.
    pub fn duration(&self) -> f32 {
        self.frame_count as f32 * self.frame_duration()
    }

    pub fn validate(&self) -> Result<(), AnimationError> {
        let invalid = |reason| AnimationError::InvalidClip {
            name: self.name.clone(),
            reason,
        };
        if self.name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.frame_count == 0 {
            return Err(invalid("clip has no frames"));
        }
        if !(self.frames_per_second.is_finite() && self.frames_per_second > 0.0) {
            return Err(invalid("frame rate must be positive"));
        }
        if self.frame_size == 0 {
            return Err(invalid("frame size must be positive"));
        }
        Ok(())
    }

    /// Derives a clip from a sprite-sheet file name and its pixel size.
    ///
    /// `run_12_true.png` is a looping clip named `run` at 12 frames per
    /// second; `idle.png` uses [`DEFAULT_SHEET_FPS`] and does not loop.
    /// Frames are square, so the sheet height is the frame size.
    pub fn from_sheet_name(
        file_name: &str,
        sheet_width: u32,
        sheet_height: u32,
    ) -> Result<Self, AnimationError> {
        let bad_name = || AnimationError::BadSheetName(file_name.to_string());
        let stem = file_name
            .strip_suffix(".png")
            .or_else(|| file_name.strip_suffix(".PNG"))
            .ok_or_else(bad_name)?;

        let (name, frames_per_second, looping) = if stem.contains('_') {
            let parts: Vec<&str> = stem.split('_').collect();
            if parts.len() < 3 {
                return Err(bad_name());
            }
            let fps: f32 = parts[1].parse().map_err(|_| bad_name())?;
            (parts[0], fps, parts[2].eq_ignore_ascii_case("true"))
        } else {
            (stem, DEFAULT_SHEET_FPS, false)
        };

        if sheet_height == 0 {
            return Err(AnimationError::InvalidClip {
                name: name.to_string(),
                reason: "sheet has no height",
            });
        }
        let clip = ClipSpec {
            name: name.to_string(),
            frame_count: sheet_width / sheet_height,
            frames_per_second,
            looping,
            frame_size: sheet_height,
        };
        clip.validate()?;
        Ok(clip)
    }
}

/// Clip source region within a sprite sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The clips of one skin, grouped by name.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationLibrary {
    clips: BTreeMap<String, Vec<ClipSpec>>,
    default_name: String,
}

impl AnimationLibrary {
    /// Builds a library. The default clip is `idle` when present, otherwise
    /// the first clip given.
    pub fn new(clips: impl IntoIterator<Item = ClipSpec>) -> Result<Self, AnimationError> {
        let mut grouped: BTreeMap<String, Vec<ClipSpec>> = BTreeMap::new();
        let mut first_name = None;
        for clip in clips {
            clip.validate()?;
            if first_name.is_none() {
                first_name = Some(clip.name.clone());
            }
            grouped.entry(clip.name.clone()).or_default().push(clip);
        }
        let first_name = first_name.ok_or(AnimationError::EmptyLibrary)?;
        let default_name = if grouped.contains_key(names::IDLE) {
            names::IDLE.to_string()
        } else {
            first_name
        };
        Ok(Self {
            clips: grouped,
            default_name,
        })
    }

    /// The built-in clip set used when no skins are configured.
    pub fn standard() -> Self {
        let clips = [
            ClipSpec::new(names::IDLE, 8, 8.0, true),
            ClipSpec::new(names::WALK, 8, 12.0, true),
            ClipSpec::new(names::RUN, 8, 16.0, true),
            ClipSpec::new(names::PET, 12, 12.0, false),
            ClipSpec::new(names::PETTED, 12, 12.0, false),
            ClipSpec::new(names::ATTACK, 10, 12.0, false),
            ClipSpec::new(names::DAMAGE, 8, 12.0, false),
            ClipSpec::new(names::COUNTER, 10, 12.0, false),
            ClipSpec::new(names::HEAL, 12, 12.0, false),
            ClipSpec::new(names::HEALED, 12, 12.0, false),
            ClipSpec::new(names::DEFEND, 10, 12.0, false),
            ClipSpec::new(names::DEFENDED, 10, 12.0, false),
            ClipSpec::new(names::FAINT, 16, 8.0, false),
        ];
        let mut grouped = BTreeMap::new();
        for clip in clips {
            grouped.insert(clip.name.clone(), vec![clip]);
        }
        Self {
            clips: grouped,
            default_name: names::IDLE.to_string(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clips.contains_key(name)
    }

    pub fn variants(&self, name: &str) -> Option<&[ClipSpec]> {
        self.clips.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clips.keys().map(String::as_str)
    }

    fn default_clip(&self) -> &ClipSpec {
        // default_name always refers to a non-empty group
        &self.clips[&self.default_name][0]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Playback {
    frame: u32,
    elapsed: f32,
}

/// Per-actor animation state: which clip is showing and how far along it is.
#[derive(Debug, Clone)]
pub struct Animator {
    library: Arc<AnimationLibrary>,
    current: ClipSpec,
    playback: Playback,
    flipped: bool,
}

impl Animator {
    pub fn new(library: Arc<AnimationLibrary>) -> Self {
        let current = library.default_clip().clone();
        Self {
            library,
            current,
            playback: Playback::default(),
            flipped: false,
        }
    }

    pub fn library(&self) -> &Arc<AnimationLibrary> {
        &self.library
    }

    /// Switches to `name`, choosing a random variant when there are several,
    /// and restarts playback.
    pub fn set_animation(&mut self, name: &str) -> Result<(), AnimationError> {
        let count = self
            .library
            .variants(name)
            .map(<[ClipSpec]>::len)
            .ok_or_else(|| AnimationError::UnknownAnimation(name.to_string()))?;
        let index = if count > 1 {
            rand::thread_rng().gen_range(0..count)
        } else {
            0
        };
        self.set_animation_variant(name, index)
    }

    pub fn set_animation_variant(&mut self, name: &str, index: usize) -> Result<(), AnimationError> {
        let variants = self
            .library
            .variants(name)
            .ok_or_else(|| AnimationError::UnknownAnimation(name.to_string()))?;
        let clip = variants.get(index).ok_or_else(|| AnimationError::UnknownVariant {
            name: name.to_string(),
            index,
        })?;
        self.current = clip.clone();
        self.reset();
        Ok(())
    }

    pub fn animation_name(&self) -> &str {
        &self.current.name
    }

    pub fn clip(&self) -> &ClipSpec {
        &self.current
    }

    pub fn is_looping(&self) -> bool {
        self.current.looping
    }

    pub fn current_frame(&self) -> u32 {
        self.playback.frame
    }

    pub fn elapsed(&self) -> f32 {
        self.playback.elapsed
    }

    pub fn reset(&mut self) {
        self.playback = Playback::default();
    }

    /// Advances playback by `dt` seconds.
    ///
    /// A one-shot clip reports [`Status::Success`] once its full duration has
    /// elapsed and stays frozen on its last frame. A looping clip wraps and
    /// keeps reporting [`Status::Running`].
    pub fn play(&mut self, dt: f32) -> Status {
        let clip = &self.current;
        let total = clip.duration();
        self.playback.elapsed += dt.max(0.0);

        if self.playback.elapsed >= total {
            if clip.looping {
                self.playback.elapsed %= total;
                self.playback.frame = 0;
            } else {
                self.playback.elapsed = total;
                self.playback.frame = clip.frame_count - 1;
                return Status::Success;
            }
        }

        let frame_duration = clip.frame_duration();
        while self.playback.frame + 1 < clip.frame_count
            && self.playback.elapsed >= frame_duration * (self.playback.frame + 1) as f32
        {
            self.playback.frame += 1;
        }
        Status::Running
    }

    pub fn flipped(&self) -> bool {
        self.flipped
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        self.flipped = flipped;
    }

    /// Source region of the displayed frame. When flipped the whole sheet is
    /// mirrored, so frames are counted from the right edge.
    pub fn crop_rect(&self) -> CropRect {
        let size = self.current.frame_size;
        let column = if self.flipped {
            self.current.frame_count - 1 - self.playback.frame
        } else {
            self.playback.frame
        };
        CropRect {
            x: column * size,
            y: 0,
            width: size,
            height: size,
        }
    }
}

//! Configuration loading for the fight pit.
//!
//! All tunables are loaded from a TOML file. Every section is optional and
//! falls back to its defaults, so a partial file is fine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "fight-pit.toml";

const MIN_SCREEN_WIDTH: u32 = 320;
const MIN_SCREEN_HEIGHT: u32 = 240;
const MIN_FRAMERATE: u32 = 12;

/// Complete fight pit configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PitConfig {
    /// Screen and floor geometry
    #[serde(default)]
    pub stage: StageConfig,
    /// Actor speeds and arrival tolerance
    #[serde(default)]
    pub movement: MovementConfig,
    /// Wandering behaviour
    #[serde(default)]
    pub ambient: AmbientConfig,
    /// Loop rates
    #[serde(default)]
    pub timing: TimingConfig,
    /// Directed interaction settings
    #[serde(default)]
    pub director: InteractionConfig,
    /// Command source filtering
    #[serde(default)]
    pub chat: ChatConfig,
}

impl PitConfig {
    /// Loads and normalizes configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parses and normalizes configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: PitConfig = toml::from_str(content)?;
        config.normalized()
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Raises values below their minimums and rejects values the simulation
    /// cannot run with.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        self.stage.screen_width = self.stage.screen_width.max(MIN_SCREEN_WIDTH);
        self.stage.screen_height = self.stage.screen_height.max(MIN_SCREEN_HEIGHT);
        self.timing.framerate = self.timing.framerate.max(MIN_FRAMERATE);

        positive("movement.walk_speed", self.movement.walk_speed)?;
        positive("movement.run_speed", self.movement.run_speed)?;
        positive("movement.move_epsilon", self.movement.move_epsilon)?;
        if self.director.sprite_spacing < 0.0 || !self.director.sprite_spacing.is_finite() {
            return Err(ConfigError::Invalid {
                field: "director.sprite_spacing",
                reason: "must be zero or positive",
            });
        }
        if self.ambient.move_chance == 0 {
            return Err(ConfigError::Invalid {
                field: "ambient.move_chance",
                reason: "must be at least 1",
            });
        }
        if self.director.join_timeout().is_none() {
            return Err(ConfigError::Invalid {
                field: "director.join_timeout_secs",
                reason: "must be a finite number of seconds, zero or more",
            });
        }
        if self.director.max_phase_ticks == Some(0) {
            return Err(ConfigError::Invalid {
                field: "director.max_phase_ticks",
                reason: "must be at least 1 when set",
            });
        }
        Ok(self)
    }

    /// Height actors stand at.
    pub fn floor_elevation(&self) -> f32 {
        self.stage.floor_elevation()
    }

    /// Seconds per tick at the configured framerate.
    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.timing.framerate as f32
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be positive",
        })
    }
}

/// Screen and floor geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    /// Floor line; half the screen height when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_height: Option<f32>,
    /// Distance from a sprite's centre to its feet
    pub sprite_mid_height: f32,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            screen_width: 800,
            screen_height: 600,
            floor_height: None,
            sprite_mid_height: 64.0,
        }
    }
}

impl StageConfig {
    pub fn floor_elevation(&self) -> f32 {
        let floor = self
            .floor_height
            .unwrap_or(self.screen_height as f32 / 2.0);
        floor - self.sprite_mid_height
    }
}

/// Actor speeds, in units per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    pub walk_speed: f32,
    pub run_speed: f32,
    /// Arrival tolerance on each axis
    pub move_epsilon: f32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            walk_speed: 40.0,
            run_speed: 100.0,
            move_epsilon: 3.0,
        }
    }
}

/// Wandering behaviour of idle actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    /// An idle actor starts wandering with probability 1/move_chance per tick
    pub move_chance: u32,
    /// Seed for the wander RNG; entropy when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            move_chance: 250,
            seed: None,
        }
    }
}

/// Loop rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Ticks per second of both the main loop and the director
    pub framerate: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self { framerate: 60 }
    }
}

/// Directed interaction settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Horizontal gap between an initiator and its target
    pub sprite_spacing: f32,
    /// Fail a phase that waits longer than this many ticks; unlimited when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_phase_ticks: Option<u64>,
    /// How long shutdown waits for the director thread
    pub join_timeout_secs: f32,
}

impl InteractionConfig {
    /// The join timeout, or `None` when it is negative or out of range.
    pub fn join_timeout(&self) -> Option<Duration> {
        if self.join_timeout_secs < 0.0 {
            return None;
        }
        Duration::try_from_secs_f32(self.join_timeout_secs).ok()
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            sprite_spacing: 64.0,
            max_phase_ticks: None,
            join_timeout_secs: 10.0,
        }
    }
}

/// Command source filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Accounts whose chat lines are ignored, compared case-insensitively
    pub ignore: Vec<String>,
}

impl ChatConfig {
    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore
            .iter()
            .any(|ignored| ignored.trim_start_matches('@').eq_ignore_ascii_case(name))
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            ignore: ["nightbot", "streamelements", "streamlabs", "moobot"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

/// Generates a default configuration file content.
pub fn default_config_toml() -> String {
    r#"# Fight Pit Configuration

[stage]
screen_width = 800
screen_height = 600
# floor_height = 300
sprite_mid_height = 64.0

[movement]
walk_speed = 40.0
run_speed = 100.0
move_epsilon = 3.0

[ambient]
move_chance = 250
# seed = 42

[timing]
framerate = 60

[director]
sprite_spacing = 64.0
# max_phase_ticks = 1800
join_timeout_secs = 10.0

[chat]
ignore = ["nightbot", "streamelements", "streamlabs", "moobot"]
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = PitConfig::default();

        assert_eq!(config.stage.screen_width, 800);
        assert_eq!(config.movement.run_speed, 100.0);
        assert_eq!(config.ambient.move_chance, 250);
        assert_eq!(config.timing.framerate, 60);
        assert_eq!(config.director.sprite_spacing, 64.0);
        assert!(config.director.max_phase_ticks.is_none());
    }

    #[test]
    fn test_floor_elevation_defaults_to_half_screen() {
        let config = PitConfig::default();
        assert_eq!(config.floor_elevation(), 300.0 - 64.0);

        let stage = StageConfig {
            floor_height: Some(464.0),
            ..StageConfig::default()
        };
        assert_eq!(stage.floor_elevation(), 400.0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
            [director]
            sprite_spacing = 80.0
        "#;

        let config = PitConfig::from_str(toml).unwrap();

        assert_eq!(config.director.sprite_spacing, 80.0);
        assert_eq!(config.director.join_timeout_secs, 10.0);
        assert_eq!(config.movement.walk_speed, 40.0);
    }

    #[test]
    fn test_minimums_are_raised() {
        let toml = r#"
            [stage]
            screen_width = 100
            screen_height = 100

            [timing]
            framerate = 1
        "#;

        let config = PitConfig::from_str(toml).unwrap();

        assert_eq!(config.stage.screen_width, 320);
        assert_eq!(config.stage.screen_height, 240);
        assert_eq!(config.timing.framerate, 12);
    }

    #[test]
    fn test_invalid_values_rejected() {
        for toml in [
            "[movement]\nmove_epsilon = 0.0",
            "[movement]\nrun_speed = -1.0",
            "[ambient]\nmove_chance = 0",
            "[director]\nmax_phase_ticks = 0",
            "[director]\nsprite_spacing = -5.0",
            "[director]\njoin_timeout_secs = -1.0",
            "[director]\njoin_timeout_secs = 1e30",
            "[director]\njoin_timeout_secs = inf",
            "[director]\njoin_timeout_secs = nan",
        ] {
            assert!(
                matches!(PitConfig::from_str(toml), Err(ConfigError::Invalid { .. })),
                "accepted {toml}"
            );
        }
    }

    #[test]
    fn test_join_timeout_converts() {
        let config = PitConfig::from_str("[director]\njoin_timeout_secs = 0.5").unwrap();
        assert_eq!(config.director.join_timeout(), Some(Duration::from_millis(500)));
        assert_eq!(
            PitConfig::default().director.join_timeout(),
            Some(Duration::from_secs(10))
        );
    }

    #[test]
    fn test_chat_ignore_list() {
        let chat = ChatConfig::default();
        assert!(chat.is_ignored("nightbot"));
        assert!(chat.is_ignored("NightBot"));
        assert!(!chat.is_ignored("alice"));

        let config = PitConfig::from_str("[chat]\nignore = [\"@robo\"]").unwrap();
        assert!(config.chat.is_ignored("robo"));
        assert!(!config.chat.is_ignored("nightbot"));
    }

    #[test]
    fn test_parse_error_reported() {
        assert!(matches!(
            PitConfig::from_str("[timing]\nframerate = \"fast\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_default_config_toml_parses() {
        let config = PitConfig::from_str(&default_config_toml()).unwrap();
        assert_eq!(config, PitConfig::default());
    }

    #[test]
    fn test_config_to_toml_round_trips() {
        let mut config = PitConfig::default();
        config.director.max_phase_ticks = Some(600);
        config.ambient.seed = Some(7);

        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[director]"));
        assert_eq!(PitConfig::from_str(&toml).unwrap(), config);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[timing]\nframerate = 30").unwrap();

        let config = PitConfig::from_file(file.path()).unwrap();
        assert_eq!(config.timing.framerate, 30);
        assert!((config.tick_seconds() - 1.0 / 30.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = PitConfig::from_file(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}

//! Configuration system
//!
//! Two kinds of settings live here:
//!
//! - [`AudioConfig`]: engine tuning (sample rate, fade windows, recurrence timing).
//! - [`AudioPreferences`]: the user's volume/mute choices, the only data this
//!   subsystem ever asks a host to persist.
//!
//! The engine never touches the filesystem itself. Hosts use the [`Config`] trait
//! to load and save these structs and push the values in through setters.

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Load configuration from file, falling back to defaults if it is missing
    fn load_or_default(path: &str) -> Result<Self, ConfigError> {
        match Self::load_from_file(path) {
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            other => other,
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Random delay window in seconds, sampled uniformly
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Shortest delay
    pub min: f32,
    /// Longest delay
    pub max: f32,
}

impl DelayRange {
    /// Create a delay range
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Pick a delay inside the range
    ///
    /// Non-finite or negative bounds collapse to the nearest usable delay.
    pub fn sample<R: rand::Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let min = if self.min.is_finite() { self.min.max(0.0) } else { 0.0 };
        if !self.max.is_finite() || self.max <= min {
            return min;
        }
        rng.gen_range(min..self.max)
    }

    fn is_usable(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.max >= self.min
    }
}

/// Engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Mixer sample rate in Hz
    pub sample_rate: u32,
    /// Samples rendered per mixer block
    pub block_size: usize,
    /// Fade-out window applied by every `stop()` in seconds
    pub stop_fade: f32,
    /// Fade-in window of sustained music pads in seconds
    pub pad_fade_in: f32,
    /// Music volume used until the host pushes a preference
    pub default_music_volume: f32,
    /// Highest music volume a host may set
    pub music_volume_ceiling: f32,
    /// Ambiance volume used until the host pushes a preference
    pub default_ambiance_volume: f32,
    /// Highest ambiance volume a host may set
    pub ambiance_volume_ceiling: f32,
    /// Delay before the first distant siren
    pub siren_first: DelayRange,
    /// Delay between subsequent sirens
    pub siren_repeat: DelayRange,
    /// Delay before the first thunder clap of a storm
    pub thunder_first: DelayRange,
    /// Delay between subsequent thunder claps
    pub thunder_repeat: DelayRange,
    /// Rain droplet polling interval in seconds
    pub droplet_interval: f32,
    /// Chance a droplet fires on a poll while raining
    pub droplet_chance_rain: f32,
    /// Chance a droplet fires on a poll during a storm
    pub droplet_chance_storm: f32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            block_size: 512,
            stop_fade: 1.5,
            pad_fade_in: 2.0,
            default_music_volume: 0.3,
            music_volume_ceiling: 0.5,
            default_ambiance_volume: 0.25,
            ambiance_volume_ceiling: 0.4,
            siren_first: DelayRange::new(5.0, 15.0),
            siren_repeat: DelayRange::new(8.0, 28.0),
            thunder_first: DelayRange::new(2.0, 7.0),
            thunder_repeat: DelayRange::new(6.0, 21.0),
            droplet_interval: 0.15,
            droplet_chance_rain: 0.3,
            droplet_chance_storm: 0.55,
        }
    }
}

impl AudioConfig {
    /// Copy with every unusable value replaced by its default
    ///
    /// Loaded files may carry `nan`, `inf`, zero rates or inverted ranges.
    #[must_use]
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let positive = |value: f32, fallback: f32| if value.is_finite() && value > 0.0 { value } else { fallback };
        let unit = |value: f32, fallback: f32| if value.is_finite() { value.clamp(0.0, 1.0) } else { fallback };
        let range = |value: DelayRange, fallback: DelayRange| if value.is_usable() { value } else { fallback };

        Self {
            sample_rate: if self.sample_rate > 0 { self.sample_rate } else { defaults.sample_rate },
            block_size: if self.block_size > 0 { self.block_size } else { defaults.block_size },
            stop_fade: positive(self.stop_fade, defaults.stop_fade),
            pad_fade_in: positive(self.pad_fade_in, defaults.pad_fade_in),
            default_music_volume: unit(self.default_music_volume, defaults.default_music_volume),
            music_volume_ceiling: unit(self.music_volume_ceiling, defaults.music_volume_ceiling),
            default_ambiance_volume: unit(self.default_ambiance_volume, defaults.default_ambiance_volume),
            ambiance_volume_ceiling: unit(self.ambiance_volume_ceiling, defaults.ambiance_volume_ceiling),
            siren_first: range(self.siren_first, defaults.siren_first),
            siren_repeat: range(self.siren_repeat, defaults.siren_repeat),
            thunder_first: range(self.thunder_first, defaults.thunder_first),
            thunder_repeat: range(self.thunder_repeat, defaults.thunder_repeat),
            droplet_interval: positive(self.droplet_interval, defaults.droplet_interval),
            droplet_chance_rain: unit(self.droplet_chance_rain, defaults.droplet_chance_rain),
            droplet_chance_storm: unit(self.droplet_chance_storm, defaults.droplet_chance_storm),
        }
    }
}

impl Config for AudioConfig {}

/// User volume preferences, persisted by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioPreferences {
    /// Master volume (0.0 - 1.0)
    pub volume: f32,
    /// Master mute
    pub muted: bool,
    /// Music volume, clamped to the music ceiling
    pub music_volume: f32,
    /// Ambiance volume, clamped to the ambiance ceiling
    pub ambiance_volume: f32,
}

impl Default for AudioPreferences {
    fn default() -> Self {
        let config = AudioConfig::default();
        Self {
            volume: 0.7,
            muted: false,
            music_volume: config.default_music_volume,
            ambiance_volume: config.default_ambiance_volume,
        }
    }
}

impl Config for AudioPreferences {}

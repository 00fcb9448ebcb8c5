//! # Soundscape
//!
//! Procedural audio for a city game. Every sound is synthesized at runtime
//! from oscillators and noise; there are no audio assets.
//!
//! ## Features
//!
//! - **One-shot effects**: coins, alarms, UI clicks, casino and combat cues
//! - **Scene music**: layered drone pads and sparse arpeggios per game scene
//! - **City ambiance**: rumble and wind bed, rain and storm layers, sirens and thunder
//! - **Single output stream**: master volume and mute over effects, music and ambiance buses
//! - **Headless rendering**: the whole graph can be rendered without hardware
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use soundscape::prelude::*;
//!
//! let mut sound = SoundSystem::new(AudioConfig::default());
//! sound.apply_preferences(&AudioPreferences::default());
//!
//! sound.set_music_scene(Scene::City);
//! sound.start_ambiance();
//! sound.set_weather(Weather::from_name("rain"));
//! sound.play_coin();
//!
//! // Once per frame
//! sound.update(1.0 / 60.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Signal graph
pub mod dsp;
pub mod node;
pub mod output;
pub mod primitives;

// Engines
pub mod ambiance;
pub mod effects;
pub mod music;
pub mod schedule;

// Ambient stack
pub mod config;
pub mod error;
pub mod logging;

mod system;

#[cfg(test)]
mod tests;

pub use ambiance::{AmbianceEngine, AmbianceStats, Weather};
pub use config::{AudioConfig, AudioPreferences, Config, ConfigError};
pub use effects::Effect;
pub use error::AudioError;
pub use music::{MusicEngine, Scene};
pub use output::{Bus, HeadlessTap, OutputBackend, OutputDevice};
pub use system::SoundSystem;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        AudioConfig, AudioPreferences, Config, Effect, Scene, SoundSystem, Weather,
    };
}

//! Ambient music engine
//!
//! Keeps at most one scene of looping layers alive. Every scene is a few
//! detuned drone pads plus, for most scenes, a sparse arpeggio; combat adds a
//! low tremolo pulse. Switching scenes retires the old layers into a
//! [`FadeArena`] before the new ones start, so the only overlap is the fade.

use crate::dsp::{Envelope, Enveloped, FilterKind, Filtered, Gain, Lfo, Oscillator, Signal, Waveform};
use crate::error::AudioError;
use crate::node::{ActiveNode, FadeArena, NodeId};
use crate::output::{Bus, OutputDevice};
use crate::primitives::{Arpeggio, Pad};

/// Named music context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scene {
    /// City overview
    City,
    /// Market and trading screens
    Trade,
    /// Operations planning
    Ops,
    /// Empire management
    Empire,
    /// Player profile
    Profile,
    /// Fights
    Combat,
    /// Silence
    #[default]
    None,
}

impl Scene {
    /// Every scene including `None`
    pub const ALL: [Self; 7] = [Self::City, Self::Trade, Self::Ops, Self::Empire, Self::Profile, Self::Combat, Self::None];

    /// Lowercase name used by collaborators
    pub const fn name(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Trade => "trade",
            Self::Ops => "ops",
            Self::Empire => "empire",
            Self::Profile => "profile",
            Self::Combat => "combat",
            Self::None => "none",
        }
    }

    /// Parse a scene name; anything unknown means silence
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|scene| scene.name().eq_ignore_ascii_case(name.trim()))
            .unwrap_or(Self::None)
    }

    const fn definition(self) -> Option<&'static SceneDefinition> {
        match self {
            Self::City => Some(&CITY),
            Self::Trade => Some(&TRADE),
            Self::Ops => Some(&OPS),
            Self::Empire => Some(&EMPIRE),
            Self::Profile => Some(&PROFILE),
            Self::Combat => Some(&COMBAT),
            Self::None => None,
        }
    }
}

impl std::fmt::Display for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Layer set of one scene
#[derive(Debug)]
struct SceneDefinition {
    pads: &'static [f32],
    pad_waveform: Waveform,
    cutoff: f32,
    arpeggio: Option<(&'static [f32], f32)>,
    tremolo: bool,
}

const CITY: SceneDefinition = SceneDefinition {
    pads: &[110.0, 164.81],
    pad_waveform: Waveform::Sawtooth,
    cutoff: 800.0,
    arpeggio: Some((&[220.0, 261.63, 329.63, 392.0], 1.2)),
    tremolo: false,
};

const TRADE: SceneDefinition = SceneDefinition {
    pads: &[146.83, 220.0, 174.61],
    pad_waveform: Waveform::Triangle,
    cutoff: 1200.0,
    arpeggio: Some((&[293.66, 349.23, 440.0, 523.25], 0.9)),
    tremolo: false,
};

const OPS: SceneDefinition = SceneDefinition {
    pads: &[65.41, 98.0],
    pad_waveform: Waveform::Sawtooth,
    cutoff: 500.0,
    arpeggio: Some((&[130.81, 155.56, 196.0], 1.6)),
    tremolo: false,
};

const EMPIRE: SceneDefinition = SceneDefinition {
    pads: &[87.31, 130.81, 220.0],
    pad_waveform: Waveform::Sawtooth,
    cutoff: 900.0,
    arpeggio: Some((&[349.23, 440.0, 523.25, 659.25], 1.4)),
    tremolo: false,
};

const PROFILE: SceneDefinition = SceneDefinition {
    pads: &[98.0, 146.83],
    pad_waveform: Waveform::Triangle,
    cutoff: 700.0,
    arpeggio: None,
    tremolo: false,
};

const COMBAT: SceneDefinition = SceneDefinition {
    pads: &[82.41, 123.47],
    pad_waveform: Waveform::Sawtooth,
    cutoff: 1000.0,
    arpeggio: Some((&[164.81, 196.0, 164.81, 246.94], 0.35)),
    tremolo: true,
};

/// Tremolo pulse frequency and modulation rate
const TREMOLO_PITCH: f32 = 55.0;
const TREMOLO_RATE: f32 = 3.0;

/// Pad detune as a fraction of its frequency
const PAD_DETUNE: f32 = 0.006;

/// Engine owning the current scene's layers
pub struct MusicEngine {
    current: Scene,
    layers: Vec<ActiveNode>,
    fading: FadeArena,
    volume: f32,
    ceiling: f32,
    stop_fade: f32,
    pad_fade_in: f32,
}

impl MusicEngine {
    /// Create the engine and set the music bus to the default volume
    pub fn new(device: &mut OutputDevice) -> Self {
        let config = device.config();
        let mut engine = Self {
            current: Scene::None,
            layers: Vec::new(),
            fading: FadeArena::new(),
            volume: config.default_music_volume,
            ceiling: config.music_volume_ceiling,
            stop_fade: config.stop_fade,
            pad_fade_in: config.pad_fade_in,
        };
        engine.apply_volume(device);
        engine
    }

    /// Switch to `next`
    ///
    /// Same scene is a no-op. Otherwise the current layers start fading and
    /// the new set starts. If the new set cannot be built the scene is still
    /// recorded as current and left silent.
    pub fn set_scene(&mut self, next: Scene, device: &mut OutputDevice) {
        if next == self.current {
            return;
        }

        self.fading.retire_all(self.layers.drain(..), self.stop_fade);
        log::info!("Music scene {} -> {}", self.current, next);
        self.current = next;

        if let Some(definition) = next.definition() {
            match self.start_layers(definition, device) {
                Ok(layers) => self.layers = layers,
                Err(e) => log::warn!("Music scene {next} failed to start, staying silent: {e}"),
            }
        }
    }

    /// Equivalent to `set_scene(Scene::None)`
    pub fn stop(&mut self, device: &mut OutputDevice) {
        self.set_scene(Scene::None, device);
    }

    fn start_layers(&self, definition: &SceneDefinition, device: &mut OutputDevice) -> Result<Vec<ActiveNode>, AudioError> {
        let sample_rate = device.sample_rate();
        let mut signals: Vec<(&'static str, Box<dyn Signal>)> = Vec::new();

        for &frequency in definition.pads {
            let pad = Pad::new(frequency, frequency * PAD_DETUNE)
                .waveform(definition.pad_waveform)
                .cutoff(definition.cutoff)
                .fade_in(self.pad_fade_in);
            signals.push(("pad", pad.build(sample_rate)?));
        }
        if let Some((notes, interval)) = definition.arpeggio {
            signals.push(("arpeggio", Arpeggio::new(notes, interval).build(sample_rate)?));
        }
        if definition.tremolo {
            signals.push(("tremolo", self.tremolo(sample_rate)));
        }

        // Everything is built before anything is spawned, so a failure here
        // leaves nothing half-started behind
        let mut layers = Vec::with_capacity(signals.len());
        for (label, signal) in signals {
            match device.spawn(Bus::Music, label, signal) {
                Ok(node) => layers.push(node),
                Err(e) => {
                    for node in layers {
                        node.release();
                    }
                    return Err(e);
                }
            }
        }
        Ok(layers)
    }

    fn tremolo(&self, sample_rate: u32) -> Box<dyn Signal> {
        let pulse = Filtered::new(
            Oscillator::new(Waveform::Square, TREMOLO_PITCH, sample_rate),
            FilterKind::Lowpass,
            300.0,
            0.707,
            sample_rate,
        );
        let swell = Lfo::new(0.05, 0.05, TREMOLO_RATE, sample_rate).with_waveform(Waveform::Square);
        Box::new(Enveloped::new(
            Gain::new(pulse, swell),
            Envelope::sustain(self.pad_fade_in, 1.0, sample_rate),
        ))
    }

    /// Set the music volume, clamped to the music ceiling
    pub fn set_volume(&mut self, volume: f32, device: &mut OutputDevice) {
        if volume.is_nan() {
            return;
        }
        self.volume = volume.clamp(0.0, self.ceiling);
        self.apply_volume(device);
        device.ensure_open();
    }

    fn apply_volume(&self, device: &mut OutputDevice) {
        device.set_bus_gain(Bus::Music, self.volume);
    }

    /// Advance fades; call once per frame
    pub fn update(&mut self, delta_time: f32) {
        let released = self.fading.tick(delta_time);
        if released > 0 {
            log::debug!("Released {released} music layer(s)");
        }
    }

    /// Current scene
    pub fn scene(&self) -> Scene {
        self.current
    }

    /// Music volume
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Number of layers belonging to the current scene
    pub fn active_layers(&self) -> usize {
        self.layers.len()
    }

    /// Number of retired layers still fading out
    pub fn fading_layers(&self) -> usize {
        self.fading.len()
    }

    /// Ids of the current scene's layers
    pub fn layer_ids(&self) -> Vec<NodeId> {
        self.layers.iter().map(ActiveNode::id).collect()
    }

    /// Labels of the current scene's layers
    pub fn layer_labels(&self) -> Vec<&'static str> {
        self.layers.iter().map(ActiveNode::label).collect()
    }

    /// Whether the node `id` is still fading out
    pub fn is_fading(&self, id: NodeId) -> bool {
        self.fading.contains(id)
    }
}

impl Drop for MusicEngine {
    fn drop(&mut self) {
        for node in self.layers.drain(..) {
            node.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use crate::tests::FailingBackend;
    use approx::assert_relative_eq;

    fn engine() -> (MusicEngine, OutputDevice) {
        let (mut device, _tap) = OutputDevice::headless(AudioConfig::default());
        (MusicEngine::new(&mut device), device)
    }

    #[test]
    fn test_scene_names() {
        assert_eq!(Scene::from_name("combat"), Scene::Combat);
        assert_eq!(Scene::from_name(" Trade "), Scene::Trade);
        assert_eq!(Scene::from_name("disco"), Scene::None);
        assert_eq!(Scene::default(), Scene::None);
    }

    #[test]
    fn test_every_scene_has_pads() {
        for scene in Scene::ALL {
            let Some(definition) = scene.definition() else {
                assert_eq!(scene, Scene::None);
                continue;
            };
            assert!((2..=3).contains(&definition.pads.len()), "{scene}");
        }
        assert!(COMBAT.tremolo);
        assert!(PROFILE.arpeggio.is_none());
    }

    #[test]
    fn test_tremolo_gates_in_pulses() {
        let config = AudioConfig { sample_rate: 8000, ..AudioConfig::default() };
        let (mut device, _tap) = OutputDevice::headless(config);
        let music = MusicEngine::new(&mut device);
        let mut tremolo = music.tremolo(8000);

        // Skip the fade-in, then look at one second
        for _ in 0..(2.5 * 8000.0) as usize {
            tremolo.next_sample();
        }
        let samples: Vec<f32> = (0..8000).map(|_| tremolo.next_sample()).collect();
        let silent = samples.iter().filter(|s| **s == 0.0).count();
        assert!(silent > 2000, "{silent} gated samples");
        assert!(samples.len() - silent > 2000);
    }

    #[test]
    fn test_same_scene_is_noop() {
        let (mut music, mut device) = engine();
        music.set_scene(Scene::City, &mut device);
        let ids = music.layer_ids();
        assert_eq!(ids.len(), 3);

        music.set_scene(Scene::City, &mut device);
        assert_eq!(music.layer_ids(), ids);
        assert_eq!(music.fading_layers(), 0);
    }

    #[test]
    fn test_switch_retires_old_layers() {
        let (mut music, mut device) = engine();
        music.set_scene(Scene::Ops, &mut device);
        let old = music.layer_ids();

        music.set_scene(Scene::Combat, &mut device);
        assert_eq!(music.scene(), Scene::Combat);
        assert_eq!(music.layer_labels(), vec!["pad", "pad", "arpeggio", "tremolo"]);
        assert!(old.iter().all(|id| music.is_fading(*id)));

        music.update(1.0);
        assert_eq!(music.fading_layers(), old.len());
        music.update(0.6);
        assert_eq!(music.fading_layers(), 0);
        assert_eq!(music.active_layers(), 4);
    }

    #[test]
    fn test_stop_is_scene_none() {
        let (mut music, mut device) = engine();
        music.set_scene(Scene::Empire, &mut device);
        music.stop(&mut device);
        assert_eq!(music.scene(), Scene::None);
        assert_eq!(music.active_layers(), 0);
        assert_eq!(music.fading_layers(), 3 + 1);
    }

    #[test]
    fn test_volume_is_clamped_to_ceiling() {
        let (mut music, mut device) = engine();
        assert_relative_eq!(device.bus_gain(Bus::Music), 0.3);
        music.set_volume(0.9, &mut device);
        assert_relative_eq!(music.volume(), 0.5);
        assert_relative_eq!(device.bus_gain(Bus::Music), 0.5);
        music.set_volume(f32::NAN, &mut device);
        assert_relative_eq!(music.volume(), 0.5);
        music.set_volume(-1.0, &mut device);
        assert_relative_eq!(music.volume(), 0.0);
    }

    #[test]
    fn test_failed_start_records_scene_and_stays_silent() {
        let mut device = OutputDevice::with_backend(AudioConfig::default(), Box::new(FailingBackend));
        let mut music = MusicEngine::new(&mut device);
        music.set_scene(Scene::Trade, &mut device);
        assert_eq!(music.scene(), Scene::Trade);
        assert_eq!(music.active_layers(), 0);

        // Same scene again stays a no-op; a different one is tried fresh
        music.set_scene(Scene::Trade, &mut device);
        music.set_scene(Scene::City, &mut device);
        assert_eq!(music.scene(), Scene::City);
        assert_eq!(music.active_layers(), 0);
    }
}

//! City ambiance engine
//!
//! While running, a persistent bed (brown-noise rumble plus band-passed wind)
//! plays under everything. Weather adds its own layers on top of the bed and
//! never replaces it. Sirens, thunder and rain droplets are recurrences: tasks
//! on a [`Scheduler`] that re-check the engine state when they fire and
//! reschedule themselves with a fresh random delay.
//!
//! # Lifecycle
//!
//! - `start` is idempotent while running.
//! - `set_weather` to the current weather is a no-op; otherwise only the
//!   weather layers and their recurrences are replaced.
//! - `stop` retires every node into the fade arena and cancels every pending
//!   task before returning.

use crate::config::AudioConfig;
use crate::dsp::{FilterKind, Mix, NoiseBank, NoiseColor, Signal, Waveform};
use crate::error::AudioError;
use crate::node::{ActiveNode, FadeArena, NodeId};
use crate::output::{Bus, OutputDevice};
use crate::primitives::{NoiseLayer, Tone};
use crate::schedule::{Scheduler, TaskHandle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Weather conditions the city reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Weather {
    /// No weather layers
    #[default]
    Clear,
    /// Rain hiss and droplets
    Rain,
    /// Heavy rain, heavy wind and thunder
    Storm,
}

impl Weather {
    /// Lowercase name used by collaborators
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Rain => "rain",
            Self::Storm => "storm",
        }
    }

    /// Parse a weather name; anything unknown is treated as clear
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "rain" => Self::Rain,
            "storm" => Self::Storm,
            _ => Self::Clear,
        }
    }
}

impl std::fmt::Display for Weather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Kinds of recurring event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recurrence {
    Siren,
    Thunder,
    Droplet,
}

/// Counters of recurrences that actually made sound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AmbianceStats {
    /// Distant sirens played
    pub sirens: u32,
    /// Thunder claps played
    pub thunder_claps: u32,
    /// Rain droplets played
    pub droplets: u32,
    /// Recurrences that fired after their condition went away
    pub discarded: u32,
}

/// A self-finishing event sound tracked until its envelope ends
#[derive(Debug)]
struct Transient {
    node: ActiveNode,
    expires_at: f64,
}

/// Weather-reactive city soundscape
pub struct AmbianceEngine {
    running: bool,
    weather: Weather,
    bed: Vec<ActiveNode>,
    weather_layers: Vec<ActiveNode>,
    transients: Vec<Transient>,
    fading: FadeArena,
    timers: Scheduler<Recurrence>,
    siren: Option<TaskHandle>,
    thunder: Option<TaskHandle>,
    droplets: Option<TaskHandle>,
    bank: NoiseBank,
    rng: StdRng,
    config: AudioConfig,
    volume: f32,
    stats: AmbianceStats,
}

impl AmbianceEngine {
    /// Create a stopped engine seeded from entropy
    pub fn new(device: &mut OutputDevice) -> Self {
        Self::with_rng(device, StdRng::from_entropy())
    }

    /// Create a stopped engine with reproducible randomness
    pub fn with_seed(device: &mut OutputDevice, seed: u64) -> Self {
        Self::with_rng(device, StdRng::seed_from_u64(seed))
    }

    fn with_rng(device: &mut OutputDevice, mut rng: StdRng) -> Self {
        let config = device.config().clone();
        let bank = NoiseBank::new(config.sample_rate, &mut rng);
        let engine = Self {
            running: false,
            weather: Weather::Clear,
            bed: Vec::new(),
            weather_layers: Vec::new(),
            transients: Vec::new(),
            fading: FadeArena::new(),
            timers: Scheduler::new(),
            siren: None,
            thunder: None,
            droplets: None,
            bank,
            rng,
            volume: config.default_ambiance_volume,
            config,
            stats: AmbianceStats::default(),
        };
        device.set_bus_gain(Bus::Ambiance, engine.volume);
        engine
    }

    /// Start the persistent bed and the siren recurrence
    ///
    /// No-op while already running, except that a bed which failed to start
    /// is tried again. Weather recorded while stopped starts with the bed.
    pub fn start(&mut self, device: &mut OutputDevice) {
        if self.running {
            self.restore_bed(device);
            return;
        }
        self.running = true;
        log::info!("City ambiance started");

        match self.start_bed(device) {
            Ok(bed) => self.bed = bed,
            Err(e) => log::warn!("City ambiance bed failed to start: {e}"),
        }

        let delay = self.config.siren_first.sample(&mut self.rng);
        self.siren = Some(self.timers.schedule(delay, Recurrence::Siren));

        if self.weather != Weather::Clear {
            self.start_weather(device);
        }
    }

    fn start_bed(&mut self, device: &mut OutputDevice) -> Result<Vec<ActiveNode>, AudioError> {
        let rumble = NoiseLayer::new(NoiseColor::Brown)
            .filter(FilterKind::Lowpass, 200.0, 0.7)
            .level(0.5)
            .fade_in(3.0);
        let wind = NoiseLayer::new(NoiseColor::White)
            .filter(FilterKind::Bandpass, 500.0, 0.8)
            .modulate_cutoff(300.0, 0.08)
            .level(0.08)
            .modulate_level(0.04, 0.05)
            .fade_in(3.0);

        let rumble = self.spawn_layer("rumble", &rumble, device)?;
        match self.spawn_layer("wind", &wind, device) {
            Ok(wind) => Ok(vec![rumble, wind]),
            Err(e) => {
                rumble.release();
                Err(e)
            }
        }
    }

    /// Retry a bed that is missing while running
    fn restore_bed(&mut self, device: &mut OutputDevice) {
        if !self.running || !self.bed.is_empty() {
            return;
        }
        match self.start_bed(device) {
            Ok(bed) => {
                log::info!("City ambiance bed restored");
                self.bed = bed;
            }
            Err(e) => log::debug!("City ambiance bed still unavailable: {e}"),
        }
    }

    /// Stop everything and cancel every pending recurrence
    ///
    /// Layers fade out in the background; no new sound starts after this
    /// returns.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        let fade = self.config.stop_fade;
        self.fading.retire_all(self.bed.drain(..), fade);
        self.fading.retire_all(self.weather_layers.drain(..), fade);
        self.fading
            .retire_all(self.transients.drain(..).map(|transient| transient.node), fade);

        self.timers.cancel_all();
        self.siren = None;
        self.thunder = None;
        self.droplets = None;
        log::info!("City ambiance stopped");
    }

    /// Switch weather, replacing only the weather layers
    pub fn set_weather(&mut self, weather: Weather, device: &mut OutputDevice) {
        device.ensure_open();
        if weather == self.weather {
            return;
        }
        log::debug!("Weather {} -> {}", self.weather, weather);

        self.fading.retire_all(self.weather_layers.drain(..), self.config.stop_fade);
        for handle in [self.thunder.take(), self.droplets.take()].into_iter().flatten() {
            self.timers.cancel(handle);
        }
        self.weather = weather;

        if self.running {
            self.restore_bed(device);
            self.start_weather(device);
        }
    }

    fn start_weather(&mut self, device: &mut OutputDevice) {
        let layers = match self.weather {
            Weather::Clear => return,
            Weather::Rain => vec![(
                "rain",
                NoiseLayer::new(NoiseColor::White)
                    .filter(FilterKind::Bandpass, 2500.0, 0.5)
                    .level(0.12)
                    .fade_in(2.0),
            )],
            Weather::Storm => vec![
                (
                    "heavy_rain",
                    NoiseLayer::new(NoiseColor::White)
                        .filter(FilterKind::Bandpass, 2000.0, 0.4)
                        .level(0.22)
                        .modulate_level(0.05, 0.3)
                        .fade_in(1.5),
                ),
                (
                    "storm_wind",
                    NoiseLayer::new(NoiseColor::White)
                        .filter(FilterKind::Bandpass, 400.0, 0.6)
                        .modulate_cutoff(250.0, 0.15)
                        .level(0.14)
                        .modulate_level(0.06, 0.2)
                        .fade_in(2.0),
                ),
            ],
        };

        for (label, layer) in layers {
            match self.spawn_layer(label, &layer, device) {
                Ok(node) => self.weather_layers.push(node),
                Err(e) => log::warn!("Weather layer {label} failed to start: {e}"),
            }
        }

        self.droplets = Some(self.timers.schedule(self.config.droplet_interval, Recurrence::Droplet));
        if self.weather == Weather::Storm {
            let delay = self.config.thunder_first.sample(&mut self.rng);
            self.thunder = Some(self.timers.schedule(delay, Recurrence::Thunder));
        }
    }

    fn spawn_layer(&mut self, label: &'static str, layer: &NoiseLayer, device: &mut OutputDevice) -> Result<ActiveNode, AudioError> {
        let signal = layer.build(&self.bank, &mut self.rng, device.sample_rate())?;
        device.spawn(Bus::Ambiance, label, signal)
    }

    /// Set the ambiance volume, clamped to the ambiance ceiling
    pub fn set_volume(&mut self, volume: f32, device: &mut OutputDevice) {
        if volume.is_nan() {
            return;
        }
        self.volume = volume.clamp(0.0, self.config.ambiance_volume_ceiling);
        device.set_bus_gain(Bus::Ambiance, self.volume);
        device.ensure_open();
    }

    /// Advance fades and recurrences; call once per frame
    pub fn update(&mut self, delta_time: f32, device: &mut OutputDevice) {
        self.fading.tick(delta_time);

        let now = self.timers.now() + f64::from(delta_time.max(0.0));
        self.transients.retain(|transient| {
            let alive = !transient.node.is_finished() && transient.expires_at > now;
            if !alive {
                transient.node.release();
            }
            alive
        });

        for (handle, recurrence) in self.timers.advance(delta_time) {
            self.fire(handle, recurrence, device);
        }
    }

    fn fire(&mut self, handle: TaskHandle, recurrence: Recurrence, device: &mut OutputDevice) {
        let slot = match recurrence {
            Recurrence::Siren => &mut self.siren,
            Recurrence::Thunder => &mut self.thunder,
            Recurrence::Droplet => &mut self.droplets,
        };
        if *slot == Some(handle) {
            *slot = None;
        }

        let still_wanted = self.running
            && match recurrence {
                Recurrence::Siren => true,
                Recurrence::Thunder => self.weather == Weather::Storm,
                Recurrence::Droplet => self.weather != Weather::Clear,
            };
        if !still_wanted {
            log::debug!("Discarding stale {recurrence:?}");
            self.stats.discarded += 1;
            return;
        }
        self.restore_bed(device);

        match recurrence {
            Recurrence::Siren => {
                self.play_siren(device);
                let delay = self.config.siren_repeat.sample(&mut self.rng);
                self.siren = Some(self.timers.schedule(delay, Recurrence::Siren));
            }
            Recurrence::Thunder => {
                self.play_thunder(device);
                let delay = self.config.thunder_repeat.sample(&mut self.rng);
                self.thunder = Some(self.timers.schedule(delay, Recurrence::Thunder));
            }
            Recurrence::Droplet => {
                let chance = if self.weather == Weather::Storm {
                    self.config.droplet_chance_storm
                } else {
                    self.config.droplet_chance_rain
                };
                let chance = if chance.is_finite() { chance.clamp(0.0, 1.0) } else { 0.0 };
                if self.rng.gen_bool(f64::from(chance)) {
                    self.play_droplet(device);
                }
                self.droplets = Some(self.timers.schedule(self.config.droplet_interval, Recurrence::Droplet));
            }
        }
    }

    fn play_siren(&mut self, device: &mut OutputDevice) {
        let siren = Tone::new(self.rng.gen_range(650.0..780.0), 4.0)
            .waveform(Waveform::Sawtooth)
            .wobble(120.0, self.rng.gen_range(0.4..0.8))
            .lowpass(900.0)
            .peak(0.04);
        let length = siren.length();
        match siren.build(device.sample_rate()) {
            Ok(signal) => {
                if self.spawn_transient("siren", signal, length, device) {
                    self.stats.sirens += 1;
                    log::debug!("Distant siren");
                }
            }
            Err(e) => log::warn!("Siren failed to build: {e}"),
        }
    }

    fn play_thunder(&mut self, device: &mut OutputDevice) {
        let boom = Tone::new(self.rng.gen_range(70.0..90.0), 2.5)
            .glide_to(30.0)
            .waveform(Waveform::Sawtooth)
            .lowpass(200.0)
            .peak(0.3);
        let tail = NoiseLayer::new(NoiseColor::Brown)
            .filter(FilterKind::Lowpass, 150.0, 0.7)
            .level(0.6)
            .burst(3.5, 0.05);

        let sample_rate = device.sample_rate();
        let built = boom.build(sample_rate).and_then(|boom| {
            let tail = tail.build(&self.bank, &mut self.rng, sample_rate)?;
            let mut clap = Mix::new();
            clap.push(boom);
            clap.push(tail);
            Ok(Box::new(clap) as Box<dyn Signal>)
        });
        match built {
            Ok(signal) => {
                if self.spawn_transient("thunder", signal, 3.55, device) {
                    self.stats.thunder_claps += 1;
                    log::debug!("Thunder clap");
                }
            }
            Err(e) => log::warn!("Thunder failed to build: {e}"),
        }
    }

    fn play_droplet(&mut self, device: &mut OutputDevice) {
        let droplet = Tone::new(self.rng.gen_range(2000.0..4500.0), self.rng.gen_range(0.05..0.08))
            .peak(self.rng.gen_range(0.02..0.05));
        let length = droplet.length();
        match droplet.build(device.sample_rate()) {
            Ok(signal) => {
                if self.spawn_transient("droplet", signal, length, device) {
                    self.stats.droplets += 1;
                }
            }
            Err(e) => log::warn!("Droplet failed to build: {e}"),
        }
    }

    fn spawn_transient(&mut self, label: &'static str, signal: Box<dyn Signal>, length: f32, device: &mut OutputDevice) -> bool {
        match device.spawn(Bus::Ambiance, label, signal) {
            Ok(node) => {
                let expires_at = self.timers.now() + f64::from(length);
                self.transients.push(Transient { node, expires_at });
                true
            }
            Err(e) => {
                log::debug!("Ambiance {label} skipped: {e}");
                false
            }
        }
    }

    /// Whether the engine is running
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current weather
    pub fn weather(&self) -> Weather {
        self.weather
    }

    /// Ambiance volume
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Every live node owned by the engine: bed, weather layers and events
    pub fn active_nodes(&self) -> usize {
        self.bed.len() + self.weather_layers.len() + self.transients.len()
    }

    /// Ids of the persistent bed layers
    pub fn bed_ids(&self) -> Vec<NodeId> {
        self.bed.iter().map(ActiveNode::id).collect()
    }

    /// Ids of the current weather layers
    pub fn weather_layer_ids(&self) -> Vec<NodeId> {
        self.weather_layers.iter().map(ActiveNode::id).collect()
    }

    /// Number of nodes still fading out
    pub fn fading_nodes(&self) -> usize {
        self.fading.len()
    }

    /// Number of recurrences waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.timers.pending()
    }

    /// Whether a thunder recurrence is armed
    pub fn thunder_armed(&self) -> bool {
        self.thunder.is_some_and(|handle| self.timers.is_pending(handle))
    }

    /// Recurrence counters
    pub fn stats(&self) -> AmbianceStats {
        self.stats
    }

    /// Noise blocks shared by every layer
    pub fn noise_bank(&self) -> &NoiseBank {
        &self.bank
    }
}

impl Drop for AmbianceEngine {
    fn drop(&mut self) {
        let nodes = self.bed.drain(..).chain(self.weather_layers.drain(..));
        for node in nodes {
            node.release();
        }
        for transient in self.transients.drain(..) {
            transient.node.release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{FailingBackend, FlakyBackend};
    use approx::assert_relative_eq;

    fn engine(seed: u64) -> (AmbianceEngine, OutputDevice) {
        let config = AudioConfig { sample_rate: 8000, ..AudioConfig::default() };
        let (mut device, _tap) = OutputDevice::headless(config);
        (AmbianceEngine::with_seed(&mut device, seed), device)
    }

    fn run(ambiance: &mut AmbianceEngine, device: &mut OutputDevice, seconds: f32) {
        let steps = (seconds / 0.05).round() as usize;
        for _ in 0..steps {
            ambiance.update(0.05, device);
        }
    }

    #[test]
    fn test_weather_names() {
        assert_eq!(Weather::from_name("rain"), Weather::Rain);
        assert_eq!(Weather::from_name("STORM"), Weather::Storm);
        assert_eq!(Weather::from_name("snow"), Weather::Clear);
        assert_eq!(Weather::from_name(""), Weather::Clear);
    }

    #[test]
    fn test_start_creates_bed_and_siren() {
        let (mut ambiance, mut device) = engine(1);
        ambiance.start(&mut device);
        assert!(ambiance.is_running());
        assert_eq!(ambiance.bed_ids().len(), 2);
        assert_eq!(ambiance.pending_timers(), 1);
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut ambiance, mut device) = engine(2);
        ambiance.start(&mut device);
        let bed = ambiance.bed_ids();
        ambiance.start(&mut device);
        assert_eq!(ambiance.bed_ids(), bed);
        assert_eq!(ambiance.active_nodes(), 2);
        assert_eq!(ambiance.pending_timers(), 1);
    }

    #[test]
    fn test_siren_recurs_within_window() {
        let (mut ambiance, mut device) = engine(3);
        ambiance.start(&mut device);
        run(&mut ambiance, &mut device, 4.9);
        assert_eq!(ambiance.stats().sirens, 0);
        run(&mut ambiance, &mut device, 10.2);
        assert!(ambiance.stats().sirens >= 1);
        run(&mut ambiance, &mut device, 28.1);
        assert!(ambiance.stats().sirens >= 2);
        assert_eq!(ambiance.pending_timers(), 1);
    }

    #[test]
    fn test_rain_adds_layers_and_droplets() {
        let (mut ambiance, mut device) = engine(4);
        ambiance.start(&mut device);
        let bed = ambiance.bed_ids();
        ambiance.set_weather(Weather::Rain, &mut device);
        assert_eq!(ambiance.weather_layer_ids().len(), 1);
        assert_eq!(ambiance.bed_ids(), bed);

        run(&mut ambiance, &mut device, 6.0);
        let droplets = ambiance.stats().droplets;
        assert!(droplets > 0 && droplets <= 40, "{droplets} droplets");
    }

    #[test]
    fn test_same_weather_keeps_layers() {
        let (mut ambiance, mut device) = engine(5);
        ambiance.start(&mut device);
        ambiance.set_weather(Weather::Rain, &mut device);
        let layers = ambiance.weather_layer_ids();
        let timers = ambiance.pending_timers();
        ambiance.set_weather(Weather::Rain, &mut device);
        assert_eq!(ambiance.weather_layer_ids(), layers);
        assert_eq!(ambiance.pending_timers(), timers);
        assert_eq!(ambiance.fading_nodes(), 0);
    }

    #[test]
    fn test_storm_thunders_until_cleared() {
        let (mut ambiance, mut device) = engine(6);
        ambiance.start(&mut device);
        ambiance.set_weather(Weather::Storm, &mut device);
        assert!(ambiance.thunder_armed());
        assert_eq!(ambiance.weather_layer_ids().len(), 2);

        run(&mut ambiance, &mut device, 7.1);
        let claps = ambiance.stats().thunder_claps;
        assert!(claps >= 1);

        ambiance.set_weather(Weather::Clear, &mut device);
        assert!(!ambiance.thunder_armed());
        assert!(ambiance.weather_layer_ids().is_empty());
        assert_eq!(ambiance.bed_ids().len(), 2);
        run(&mut ambiance, &mut device, 30.0);
        assert_eq!(ambiance.stats().thunder_claps, claps);
    }

    #[test]
    fn test_weather_while_stopped_waits_for_start() {
        let (mut ambiance, mut device) = engine(7);
        ambiance.set_weather(Weather::Storm, &mut device);
        assert_eq!(ambiance.weather(), Weather::Storm);
        assert_eq!(ambiance.active_nodes(), 0);
        assert_eq!(ambiance.pending_timers(), 0);

        ambiance.start(&mut device);
        assert_eq!(ambiance.weather_layer_ids().len(), 2);
        assert!(ambiance.thunder_armed());
    }

    #[test]
    fn test_stop_retires_everything() {
        let (mut ambiance, mut device) = engine(8);
        ambiance.start(&mut device);
        ambiance.set_weather(Weather::Rain, &mut device);
        ambiance.stop();
        assert!(!ambiance.is_running());
        assert_eq!(ambiance.active_nodes(), 0);
        assert_eq!(ambiance.pending_timers(), 0);
        assert_eq!(ambiance.fading_nodes(), 3);

        run(&mut ambiance, &mut device, 2.0);
        assert_eq!(ambiance.fading_nodes(), 0);
        assert_eq!(ambiance.stats().droplets, 0);
    }

    #[test]
    fn test_volume_is_clamped_to_ceiling() {
        let (mut ambiance, mut device) = engine(9);
        assert_relative_eq!(device.bus_gain(Bus::Ambiance), 0.25);
        ambiance.set_volume(1.0, &mut device);
        assert_relative_eq!(ambiance.volume(), 0.4);
        assert_relative_eq!(device.bus_gain(Bus::Ambiance), 0.4);
    }

    #[test]
    fn test_missing_device_still_runs_timers() {
        let mut device = OutputDevice::with_backend(AudioConfig::default(), Box::new(FailingBackend));
        let mut ambiance = AmbianceEngine::with_seed(&mut device, 10);
        ambiance.start(&mut device);
        assert!(ambiance.is_running());
        assert_eq!(ambiance.active_nodes(), 0);

        run(&mut ambiance, &mut device, 16.0);
        assert_eq!(ambiance.stats().sirens, 0);
        assert_eq!(ambiance.pending_timers(), 1);
        ambiance.stop();
        assert_eq!(ambiance.pending_timers(), 0);
    }

    #[test]
    fn test_bed_retries_after_cold_failure() {
        let config = AudioConfig { sample_rate: 8000, ..AudioConfig::default() };
        let (backend, tap) = FlakyBackend::new(1);
        let mut device = OutputDevice::with_backend(config, Box::new(backend));
        let mut ambiance = AmbianceEngine::with_seed(&mut device, 11);

        ambiance.start(&mut device);
        assert!(ambiance.is_running());
        assert!(ambiance.bed_ids().is_empty());
        assert_eq!(ambiance.pending_timers(), 1);

        ambiance.start(&mut device);
        assert_eq!(ambiance.bed_ids().len(), 2);
        assert_eq!(ambiance.pending_timers(), 1);
        tap.render(512);
        assert_eq!(tap.node_count(), 2);
    }

    #[test]
    fn test_bed_returns_before_next_siren() {
        let config = AudioConfig { sample_rate: 8000, ..AudioConfig::default() };
        let (backend, _tap) = FlakyBackend::new(1);
        let mut device = OutputDevice::with_backend(config, Box::new(backend));
        let mut ambiance = AmbianceEngine::with_seed(&mut device, 12);

        ambiance.start(&mut device);
        assert!(ambiance.bed_ids().is_empty());

        // Past the latest first siren
        run(&mut ambiance, &mut device, 15.1);
        assert!(ambiance.stats().sirens >= 1);
        assert_eq!(ambiance.bed_ids().len(), 2);
    }

    #[test]
    fn test_siren_firing_after_running_cleared_is_discarded() {
        let (mut ambiance, mut device) = engine(13);
        ambiance.start(&mut device);
        let bed = ambiance.active_nodes();

        // Leave the task armed so only the fire-time check can stop it
        ambiance.running = false;
        run(&mut ambiance, &mut device, 15.1);
        assert_eq!(ambiance.stats().sirens, 0);
        assert_eq!(ambiance.stats().discarded, 1);
        assert_eq!(ambiance.pending_timers(), 0);
        assert_eq!(ambiance.active_nodes(), bed);
    }

    #[test]
    fn test_thunder_firing_after_weather_changed_is_discarded() {
        let (mut ambiance, mut device) = engine(14);
        ambiance.start(&mut device);
        ambiance.set_weather(Weather::Storm, &mut device);
        assert!(ambiance.thunder_armed());

        // Thunder and droplet tasks stay armed; the siren is still wanted
        ambiance.weather = Weather::Clear;
        run(&mut ambiance, &mut device, 7.1);
        assert_eq!(ambiance.stats().thunder_claps, 0);
        assert_eq!(ambiance.stats().droplets, 0);
        assert_eq!(ambiance.stats().discarded, 2);
        assert!(!ambiance.thunder_armed());
    }

    #[test]
    fn test_unusable_timing_config_does_not_panic() {
        let config = AudioConfig {
            sample_rate: 8000,
            siren_first: crate::config::DelayRange::new(f32::NAN, f32::INFINITY),
            droplet_chance_rain: f32::NAN,
            droplet_interval: f32::NAN,
            ..AudioConfig::default()
        };
        let (mut device, _tap) = OutputDevice::headless(config);
        let mut ambiance = AmbianceEngine::with_seed(&mut device, 15);
        ambiance.start(&mut device);
        ambiance.set_weather(Weather::Rain, &mut device);
        run(&mut ambiance, &mut device, 16.0);
        assert!(ambiance.stats().sirens >= 1);
        assert!(ambiance.stats().droplets > 0);
    }
}

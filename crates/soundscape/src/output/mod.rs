//! Output device management
//!
//! [`OutputDevice`] owns the single output stream and the master gain stage
//! every sound passes through. The stream is opened lazily on the first
//! request and kept for the life of the process.
//!
//! Platform specifics live behind the [`OutputBackend`] trait:
//!
//! - [`RodioBackend`] plays through the default hardware device.
//! - [`HeadlessBackend`] renders only on demand through a [`HeadlessTap`],
//!   for tests and hosts without audio hardware.

pub mod headless;
pub mod mixer;
pub mod rodio_backend;

pub use headless::{HeadlessBackend, HeadlessTap};
pub use mixer::MixerSource;
pub use rodio_backend::RodioBackend;

use crate::config::AudioConfig;
use crate::dsp::Signal;
use crate::error::AudioError;
use crate::node::{ActiveNode, NodeControl, NodeIds};
use mixer::{GraphCommand, GraphNode};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;

/// Platform abstraction over the audio output
///
/// # Threading
/// Backends are driven from the single control thread; the mixer they are
/// handed runs wherever the platform renders audio.
pub trait OutputBackend {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Open the device and start pulling samples from `source`
    ///
    /// Called again with a fresh mixer if the previous one went away.
    fn start(&mut self, source: MixerSource) -> Result<(), AudioError>;

    /// Resume a device the platform left suspended
    ///
    /// Failure is not fatal; the next interaction tries again.
    fn resume(&mut self) -> Result<(), AudioError>;
}

/// Group of sounds sharing a gain stage ahead of the master
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bus {
    /// One-shot effects
    Effects,
    /// Scene music layers
    Music,
    /// City bed, weather layers and recurring events
    Ambiance,
}

impl Bus {
    /// Number of buses
    pub const COUNT: usize = 3;

    /// Every bus, in index order
    pub const ALL: [Self; Self::COUNT] = [Self::Effects, Self::Music, Self::Ambiance];

    /// Array index of the bus
    pub const fn index(self) -> usize {
        match self {
            Self::Effects => 0,
            Self::Music => 1,
            Self::Ambiance => 2,
        }
    }
}

/// An `f32` shared between threads
#[derive(Debug)]
struct AtomicGain(AtomicU32);

impl AtomicGain {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn set(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Gain stages read by the mixer every block
#[derive(Debug)]
pub struct BusGains {
    master: AtomicGain,
    buses: [AtomicGain; Bus::COUNT],
}

impl BusGains {
    /// Master at `master`, every bus at unity
    pub fn new(master: f32) -> Self {
        Self {
            master: AtomicGain::new(master),
            buses: std::array::from_fn(|_| AtomicGain::new(1.0)),
        }
    }

    /// Effective master gain
    pub fn master(&self) -> f32 {
        self.master.get()
    }

    /// Set the effective master gain
    pub fn set_master(&self, gain: f32) {
        self.master.set(gain);
    }

    /// Gain of `bus`
    pub fn bus(&self, bus: Bus) -> f32 {
        self.buses[bus.index()].get()
    }

    /// Set the gain of `bus`
    pub fn set_bus(&self, bus: Bus, gain: f32) {
        self.buses[bus.index()].set(gain);
    }
}

/// Control-side end of an open stream
struct StreamLink {
    commands: Sender<GraphCommand>,
}

/// The shared output stream plus master volume and mute
pub struct OutputDevice {
    config: AudioConfig,
    backend: Box<dyn OutputBackend>,
    link: Option<StreamLink>,
    gains: Arc<BusGains>,
    clock: Arc<AtomicU64>,
    ids: NodeIds,
    volume: f32,
    muted: bool,
    failures: u32,
}

impl OutputDevice {
    /// Device playing through the default hardware output
    pub fn new(config: AudioConfig) -> Self {
        Self::with_backend(config, Box::new(RodioBackend::new()))
    }

    /// Device using a custom backend
    pub fn with_backend(config: AudioConfig, backend: Box<dyn OutputBackend>) -> Self {
        let volume = 1.0;
        Self {
            config: config.sanitized(),
            backend,
            link: None,
            gains: Arc::new(BusGains::new(volume)),
            clock: Arc::new(AtomicU64::new(0)),
            ids: NodeIds::default(),
            volume,
            muted: false,
            failures: 0,
        }
    }

    /// Device with no hardware behind it, plus the tap that renders it
    pub fn headless(config: AudioConfig) -> (Self, HeadlessTap) {
        let (backend, tap) = HeadlessBackend::new();
        (Self::with_backend(config, Box::new(backend)), tap)
    }

    /// Open the stream if needed and nudge a suspended device
    ///
    /// Returns `false` when no device is available; callers treat that as
    /// "play nothing" and the next call tries again.
    pub fn ensure_open(&mut self) -> bool {
        if self.link.is_none() {
            let (commands, receiver) = mpsc::channel();
            let source = MixerSource::new(
                receiver,
                Arc::clone(&self.gains),
                Arc::clone(&self.clock),
                self.config.sample_rate,
                self.config.block_size,
            );
            match self.backend.start(source) {
                Ok(()) => {
                    log::info!("Audio output opened ({}, {} Hz)", self.backend.name(), self.config.sample_rate);
                    self.link = Some(StreamLink { commands });
                    self.failures = 0;
                }
                Err(e) => {
                    if self.failures == 0 {
                        log::warn!("Audio output unavailable, continuing silently: {e}");
                    } else {
                        log::debug!("Audio output still unavailable: {e}");
                    }
                    self.failures += 1;
                    return false;
                }
            }
        }

        if let Err(e) = self.backend.resume() {
            log::debug!("Audio output resume failed, will retry: {e}");
        }
        true
    }

    /// Whether the stream is open
    pub fn is_open(&self) -> bool {
        self.link.is_some()
    }

    /// Set the master volume, clamped to `[0, 1]`
    ///
    /// Takes effect immediately unless muted. NaN is ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_nan() {
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.apply_master();
        self.ensure_open();
    }

    /// Master volume preference (unaffected by mute)
    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Flip mute and return the new state
    pub fn toggle_mute(&mut self) -> bool {
        self.set_muted(!self.muted);
        self.muted
    }

    /// Set mute explicitly
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        self.apply_master();
        self.ensure_open();
    }

    /// Whether output is muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Gain actually applied at the master stage
    pub fn master_gain(&self) -> f32 {
        self.gains.master()
    }

    fn apply_master(&self) {
        let gain = if self.muted { 0.0 } else { self.volume };
        self.gains.set_master(gain);
    }

    /// Set the gain stage of one bus
    pub fn set_bus_gain(&mut self, bus: Bus, gain: f32) {
        self.gains.set_bus(bus, gain);
    }

    /// Gain stage of one bus
    pub fn bus_gain(&self, bus: Bus) -> f32 {
        self.gains.bus(bus)
    }

    /// Engine tuning
    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Mixer sample rate
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Seconds of audio rendered so far
    pub fn clock_seconds(&self) -> f64 {
        self.clock.load(Ordering::Relaxed) as f64 / f64::from(self.config.sample_rate)
    }

    /// Add a long-lived node to the graph and return its handle
    ///
    /// # Errors
    /// - `DeviceUnavailable` if the stream cannot be opened
    /// - `PlaybackFailed` if the render thread has gone away
    pub fn spawn(&mut self, bus: Bus, label: &'static str, signal: Box<dyn Signal>) -> Result<ActiveNode, AudioError> {
        if !self.ensure_open() {
            return Err(AudioError::DeviceUnavailable("output stream could not be opened".to_string()));
        }
        let link = self.link.as_ref().ok_or(AudioError::BackendNotInitialized)?;

        let id = self.ids.next();
        let control = Arc::new(NodeControl::default());
        let node = GraphNode::new(id, bus, signal, Arc::clone(&control));
        if link.commands.send(GraphCommand::Add(node)).is_err() {
            // Render side is gone; reopen on the next request
            self.link = None;
            return Err(AudioError::PlaybackFailed("render thread disconnected".to_string()));
        }
        Ok(ActiveNode::new(id, label, control))
    }

    /// Fire-and-forget: the node lives until its envelope ends
    pub fn play_oneshot(&mut self, bus: Bus, label: &'static str, signal: Box<dyn Signal>) -> Result<(), AudioError> {
        self.spawn(bus, label, signal).map(drop)
    }
}

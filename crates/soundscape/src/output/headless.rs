//! Output backend without hardware
//!
//! The mixer is parked in a shared slot instead of being handed to a device.
//! Whoever holds the [`HeadlessTap`] decides when samples get rendered.

use super::{MixerSource, OutputBackend};
use crate::error::AudioError;
use std::sync::{Arc, Mutex, PoisonError};

type MixerSlot = Arc<Mutex<Option<MixerSource>>>;

/// Backend that never touches a device
pub struct HeadlessBackend {
    slot: MixerSlot,
}

impl HeadlessBackend {
    /// Create a backend and the tap reading from it
    pub fn new() -> (Self, HeadlessTap) {
        let slot: MixerSlot = Arc::new(Mutex::new(None));
        (Self { slot: Arc::clone(&slot) }, HeadlessTap { slot })
    }
}

impl OutputBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn start(&mut self, source: MixerSource) -> Result<(), AudioError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(source);
        Ok(())
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Pulls samples from a headless device on demand
#[derive(Clone)]
pub struct HeadlessTap {
    slot: MixerSlot,
}

impl HeadlessTap {
    /// Whether the device has been opened
    pub fn is_attached(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Render `samples` mono samples; silence if the device is not open yet
    pub fn render(&self, samples: usize) -> Vec<f32> {
        let mut guard = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut() {
            Some(mixer) => mixer.by_ref().take(samples).collect(),
            None => vec![0.0; samples],
        }
    }

    /// Render `seconds` of audio at `sample_rate`
    pub fn render_seconds(&self, seconds: f32, sample_rate: u32) -> Vec<f32> {
        self.render((seconds * sample_rate as f32) as usize)
    }

    /// Number of nodes the mixer is currently rendering
    pub fn node_count(&self) -> usize {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, MixerSource::node_count)
    }
}

/// Root-mean-square level of a block of samples
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

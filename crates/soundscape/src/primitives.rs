//! Reusable sound building blocks
//!
//! Each primitive is a small validated description that builds a boxed
//! [`Signal`] ready to hand to [`OutputDevice::spawn`](crate::output::OutputDevice::spawn):
//!
//! - [`Tone`]: oscillator with a fast attack and exponential decay, the "ding"
//!   behind every discrete effect. Optional glide or LFO wobble on the pitch.
//! - [`NoiseLayer`]: looping white/brown noise, optionally filtered, with LFO
//!   movement on the cutoff or the level. Sustained or as a burst.
//! - [`Pad`]: two detuned oscillators through a lowpass, fading in slowly.
//! - [`Arpeggio`]: a note list stepped through on a fixed interval.
//!
//! Invalid parameters are rejected here, on the control thread.

use crate::dsp::{
    Envelope, Enveloped, FilterKind, Filtered, Gain, Lfo, Mix, NoiseBank, NoiseColor, Oscillator, Param, Signal,
    Waveform,
};
use crate::error::{ensure_finite, ensure_positive, AudioError};
use rand::Rng;

/// A short enveloped tone
#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    frequency: f32,
    duration: f32,
    waveform: Waveform,
    delay: f32,
    peak: f32,
    glide_to: Option<f32>,
    wobble: Option<(f32, f32)>,
    lowpass: Option<f32>,
}

impl Tone {
    /// Sine tone at `frequency` Hz lasting `duration` seconds
    pub const fn new(frequency: f32, duration: f32) -> Self {
        Self {
            frequency,
            duration,
            waveform: Waveform::Sine,
            delay: 0.0,
            peak: 0.3,
            glide_to: None,
            wobble: None,
            lowpass: None,
        }
    }

    /// Oscillator shape
    #[must_use]
    pub const fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Start after `seconds`
    #[must_use]
    pub const fn delay(mut self, seconds: f32) -> Self {
        self.delay = seconds;
        self
    }

    /// Peak gain reached at the end of the attack
    #[must_use]
    pub const fn peak(mut self, peak: f32) -> Self {
        self.peak = peak;
        self
    }

    /// Exponential pitch glide to `frequency` over the tone's duration
    #[must_use]
    pub const fn glide_to(mut self, frequency: f32) -> Self {
        self.glide_to = Some(frequency);
        self
    }

    /// Pitch LFO swinging `depth` Hz either side at `rate` Hz
    #[must_use]
    pub const fn wobble(mut self, depth: f32, rate: f32) -> Self {
        self.wobble = Some((depth, rate));
        self
    }

    /// Soften the tone with a lowpass at `cutoff` Hz
    #[must_use]
    pub const fn lowpass(mut self, cutoff: f32) -> Self {
        self.lowpass = Some(cutoff);
        self
    }

    /// Total time from call to silence
    pub fn length(&self) -> f32 {
        self.delay.max(0.0) + self.duration
    }

    /// Build the render-thread signal
    ///
    /// # Errors
    /// `InvalidParameter` for non-positive frequency, duration or peak, or a
    /// non-finite delay.
    pub fn build(&self, sample_rate: u32) -> Result<Box<dyn Signal>, AudioError> {
        let frequency = ensure_positive("tone frequency", self.frequency)?;
        let duration = ensure_positive("tone duration", self.duration)?;
        let peak = ensure_positive("tone peak", self.peak)?;
        let delay = ensure_finite("tone delay", self.delay)?;

        let pitch: Param = match (self.glide_to, self.wobble) {
            (Some(target), _) => Param::sweep(frequency, ensure_positive("glide target", target)?, duration, sample_rate),
            (None, Some((depth, rate))) => {
                Lfo::new(frequency, ensure_finite("wobble depth", depth)?, ensure_positive("wobble rate", rate)?, sample_rate).into()
            }
            (None, None) => Param::Constant(frequency),
        };

        let osc = Oscillator::new(self.waveform, pitch, sample_rate);
        let envelope = Envelope::percussive(duration, peak, sample_rate);
        let signal: Box<dyn Signal> = match self.lowpass {
            Some(cutoff) => {
                let cutoff = ensure_positive("tone cutoff", cutoff)?;
                let filtered = Filtered::new(osc, FilterKind::Lowpass, cutoff, 0.707, sample_rate);
                Box::new(Enveloped::new(filtered, envelope).delayed(delay, sample_rate))
            }
            None => Box::new(Enveloped::new(osc, envelope).delayed(delay, sample_rate)),
        };
        Ok(signal)
    }
}

/// How a noise layer is shaped over time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoiseShape {
    /// Fades in, then plays until stopped
    Sustain {
        /// Fade-in length in seconds
        fade_in: f32,
    },
    /// Percussive burst that ends by itself
    Burst {
        /// Burst length in seconds
        duration: f32,
        /// Silence before the burst
        delay: f32,
    },
}

/// A looping, optionally filtered noise layer
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseLayer {
    color: NoiseColor,
    filter: Option<(FilterKind, f32, f32)>,
    cutoff_lfo: Option<(f32, f32)>,
    level: f32,
    level_lfo: Option<(f32, f32)>,
    shape: NoiseShape,
}

impl NoiseLayer {
    /// Unfiltered sustained noise of `color`
    pub const fn new(color: NoiseColor) -> Self {
        Self {
            color,
            filter: None,
            cutoff_lfo: None,
            level: 0.3,
            level_lfo: None,
            shape: NoiseShape::Sustain { fade_in: 2.0 },
        }
    }

    /// Shape the texture with a filter
    #[must_use]
    pub const fn filter(mut self, kind: FilterKind, cutoff: f32, q: f32) -> Self {
        self.filter = Some((kind, cutoff, q));
        self
    }

    /// Move the filter cutoff `depth` Hz either side at `rate` Hz
    #[must_use]
    pub const fn modulate_cutoff(mut self, depth: f32, rate: f32) -> Self {
        self.cutoff_lfo = Some((depth, rate));
        self
    }

    /// Output level
    #[must_use]
    pub const fn level(mut self, level: f32) -> Self {
        self.level = level;
        self
    }

    /// Swing the level by `depth` either side at `rate` Hz
    #[must_use]
    pub const fn modulate_level(mut self, depth: f32, rate: f32) -> Self {
        self.level_lfo = Some((depth, rate));
        self
    }

    /// Fade in over `seconds` and sustain
    #[must_use]
    pub const fn fade_in(mut self, seconds: f32) -> Self {
        self.shape = NoiseShape::Sustain { fade_in: seconds };
        self
    }

    /// Play a single burst of `duration` seconds after `delay`
    #[must_use]
    pub const fn burst(mut self, duration: f32, delay: f32) -> Self {
        self.shape = NoiseShape::Burst { duration, delay };
        self
    }

    /// Build the render-thread signal
    ///
    /// # Errors
    /// `InvalidParameter` for non-positive cutoff, Q, level, fade or duration.
    pub fn build<R: Rng + ?Sized>(&self, bank: &NoiseBank, rng: &mut R, sample_rate: u32) -> Result<Box<dyn Signal>, AudioError> {
        let level = ensure_positive("noise level", self.level)?;
        let mut signal: Box<dyn Signal> = Box::new(bank.source(self.color, rng));

        if let Some((kind, cutoff, q)) = self.filter {
            let cutoff = ensure_positive("noise cutoff", cutoff)?;
            let q = ensure_positive("noise q", q)?;
            let cutoff: Param = match self.cutoff_lfo {
                Some((depth, rate)) => Lfo::new(cutoff, ensure_finite("cutoff depth", depth)?, ensure_positive("cutoff rate", rate)?, sample_rate)
                    .with_phase(rng.gen())
                    .into(),
                None => Param::Constant(cutoff),
            };
            signal = Box::new(Filtered::new(signal, kind, cutoff, q, sample_rate));
        }

        let gain: Param = match self.level_lfo {
            Some((depth, rate)) => Lfo::new(level, ensure_finite("level depth", depth)?, ensure_positive("level rate", rate)?, sample_rate)
                .with_phase(rng.gen())
                .into(),
            None => Param::Constant(level),
        };
        signal = Box::new(Gain::new(signal, gain));

        let shaped: Box<dyn Signal> = match self.shape {
            NoiseShape::Sustain { fade_in } => {
                let fade_in = ensure_finite("noise fade-in", fade_in)?.max(0.0);
                Box::new(Enveloped::new(signal, Envelope::sustain(fade_in, 1.0, sample_rate)))
            }
            NoiseShape::Burst { duration, delay } => {
                let duration = ensure_positive("noise burst", duration)?;
                let delay = ensure_finite("noise delay", delay)?;
                Box::new(Enveloped::new(signal, Envelope::percussive(duration, 1.0, sample_rate)).delayed(delay, sample_rate))
            }
        };
        Ok(shaped)
    }
}

/// Sustained pad: two slightly detuned oscillators through a lowpass
#[derive(Debug, Clone, PartialEq)]
pub struct Pad {
    frequency: f32,
    detune: f32,
    waveform: Waveform,
    cutoff: f32,
    level: f32,
    fade_in: f32,
}

impl Pad {
    /// Pad centered on `frequency`, detuned by `detune` Hz
    pub const fn new(frequency: f32, detune: f32) -> Self {
        Self {
            frequency,
            detune,
            waveform: Waveform::Sawtooth,
            cutoff: 900.0,
            level: 0.06,
            fade_in: 2.0,
        }
    }

    /// Oscillator shape
    #[must_use]
    pub const fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Lowpass cutoff in Hz
    #[must_use]
    pub const fn cutoff(mut self, cutoff: f32) -> Self {
        self.cutoff = cutoff;
        self
    }

    /// Held level
    #[must_use]
    pub const fn level(mut self, level: f32) -> Self {
        self.level = level;
        self
    }

    /// Fade-in length
    #[must_use]
    pub const fn fade_in(mut self, seconds: f32) -> Self {
        self.fade_in = seconds;
        self
    }

    /// Build the render-thread signal
    ///
    /// # Errors
    /// `InvalidParameter` for a non-positive frequency, cutoff or level.
    pub fn build(&self, sample_rate: u32) -> Result<Box<dyn Signal>, AudioError> {
        let frequency = ensure_positive("pad frequency", self.frequency)?;
        let detune = ensure_finite("pad detune", self.detune)?;
        let cutoff = ensure_positive("pad cutoff", self.cutoff)?;
        let level = ensure_positive("pad level", self.level)?;

        let pair = Mix::new()
            .with(Oscillator::new(self.waveform, frequency - detune / 2.0, sample_rate))
            .with(Oscillator::new(self.waveform, frequency + detune / 2.0, sample_rate));
        let filtered = Filtered::new(pair, FilterKind::Lowpass, cutoff, 0.707, sample_rate);
        let fade_in = self.fade_in.max(0.0);
        Ok(Box::new(Enveloped::new(filtered, Envelope::sustain(fade_in, level, sample_rate))))
    }
}

/// Sparse repeating note pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Arpeggio {
    notes: Vec<f32>,
    interval: f32,
    note_length: f32,
    waveform: Waveform,
    peak: f32,
}

impl Arpeggio {
    /// Step through `notes`, one every `interval` seconds
    pub fn new(notes: &[f32], interval: f32) -> Self {
        Self {
            notes: notes.to_vec(),
            interval,
            note_length: interval * 0.9,
            waveform: Waveform::Triangle,
            peak: 0.05,
        }
    }

    /// Note shape
    #[must_use]
    pub const fn waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Note peak gain
    #[must_use]
    pub const fn peak(mut self, peak: f32) -> Self {
        self.peak = peak;
        self
    }

    /// Length of each note burst
    #[must_use]
    pub const fn note_length(mut self, seconds: f32) -> Self {
        self.note_length = seconds;
        self
    }

    /// Build the render-thread signal
    ///
    /// # Errors
    /// `InvalidParameter` for an empty note list or non-positive timing.
    pub fn build(&self, sample_rate: u32) -> Result<Box<dyn Signal>, AudioError> {
        if self.notes.is_empty() {
            return Err(AudioError::InvalidParameter("arpeggio needs at least one note".to_string()));
        }
        for note in &self.notes {
            ensure_positive("arpeggio note", *note)?;
        }
        let interval = ensure_positive("arpeggio interval", self.interval)?;
        let note_length = ensure_positive("arpeggio note length", self.note_length)?;
        let peak = ensure_positive("arpeggio peak", self.peak)?;

        Ok(Box::new(ArpeggioSignal {
            notes: self.notes.clone(),
            index: 0,
            step: (interval * sample_rate as f32).max(1.0) as u32,
            countdown: 0,
            note_length,
            waveform: self.waveform,
            peak,
            sample_rate,
            current: None,
        }))
    }
}

/// Render-side sequencer behind [`Arpeggio`]
struct ArpeggioSignal {
    notes: Vec<f32>,
    index: usize,
    step: u32,
    countdown: u32,
    note_length: f32,
    waveform: Waveform,
    peak: f32,
    sample_rate: u32,
    current: Option<Enveloped<Oscillator>>,
}

impl Signal for ArpeggioSignal {
    fn next_sample(&mut self) -> f32 {
        if self.countdown == 0 {
            let frequency = self.notes[self.index];
            self.index = (self.index + 1) % self.notes.len();
            self.current = Some(Enveloped::new(
                Oscillator::new(self.waveform, frequency, self.sample_rate),
                Envelope::percussive(self.note_length, self.peak, self.sample_rate),
            ));
            self.countdown = self.step;
        }
        self.countdown -= 1;
        self.current.as_mut().map_or(0.0, |note| note.next_sample())
    }
}

//! Sample-level signal building blocks
//!
//! Everything in here runs on the render thread: oscillators, envelopes,
//! filters and noise loops, composed into trees of [`Signal`]s. Nothing here
//! allocates per sample.

pub mod envelope;
pub mod filter;
pub mod noise;

pub use envelope::{Envelope, Enveloped};
pub use filter::{Biquad, FilterKind, Filtered};
pub use noise::{NoiseBank, NoiseColor, NoiseSource};

/// One full turn in radians
pub const TWO_PI: f32 = std::f32::consts::TAU;

/// A mono sample generator pulled by the mixer
pub trait Signal: Send {
    /// Produce the next sample
    fn next_sample(&mut self) -> f32;

    /// Whether the signal has nothing left to play
    fn is_finished(&self) -> bool {
        false
    }
}

impl Signal for Box<dyn Signal> {
    fn next_sample(&mut self) -> f32 {
        (**self).next_sample()
    }

    fn is_finished(&self) -> bool {
        (**self).is_finished()
    }
}

/// Basic oscillator shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// Pure sine
    Sine,
    /// 50% duty square
    Square,
    /// Rising sawtooth
    Sawtooth,
    /// Symmetric triangle
    Triangle,
}

impl Waveform {
    /// Evaluate the waveform at `phase` in `[0, 1)`
    pub fn eval(self, phase: f32) -> f32 {
        match self {
            Self::Sine => (phase * TWO_PI).sin(),
            Self::Square => {
                if phase < 0.5 { 1.0 } else { -1.0 }
            }
            Self::Sawtooth => 2.0 * phase - 1.0,
            Self::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
        }
    }
}

/// Low-frequency oscillator producing `center + depth * wave(t)`
#[derive(Debug, Clone)]
pub struct Lfo {
    center: f32,
    depth: f32,
    rate: f32,
    waveform: Waveform,
    phase: f32,
    dt: f32,
}

impl Lfo {
    /// Sine LFO around `center`, swinging by `depth`, at `rate` Hz
    pub fn new(center: f32, depth: f32, rate: f32, sample_rate: u32) -> Self {
        Self {
            center,
            depth,
            rate,
            waveform: Waveform::Sine,
            phase: 0.0,
            dt: 1.0 / sample_rate as f32,
        }
    }

    /// Use a different LFO shape
    #[must_use]
    pub fn with_waveform(mut self, waveform: Waveform) -> Self {
        self.waveform = waveform;
        self
    }

    /// Start the LFO at a phase offset in `[0, 1)`
    #[must_use]
    pub fn with_phase(mut self, phase: f32) -> Self {
        self.phase = phase.rem_euclid(1.0);
        self
    }

    /// Advance one sample and return the modulated value
    pub fn next_value(&mut self) -> f32 {
        let value = self.center + self.depth * self.waveform.eval(self.phase);
        self.phase += self.rate * self.dt;
        self.phase -= self.phase.floor();
        value
    }
}

/// A parameter that may move over time
#[derive(Debug, Clone)]
pub enum Param {
    /// Fixed value
    Constant(f32),
    /// Exponential glide from `start` to `end` over `samples`, then holds `end`
    Sweep {
        /// Start value (must be positive)
        start: f32,
        /// End value (must be positive)
        end: f32,
        /// Glide length in samples
        samples: u32,
        /// Samples already produced
        pos: u32,
    },
    /// Driven by an LFO
    Lfo(Lfo),
}

impl Param {
    /// Exponential glide lasting `duration` seconds
    pub fn sweep(start: f32, end: f32, duration: f32, sample_rate: u32) -> Self {
        Self::Sweep {
            start,
            end,
            samples: (duration * sample_rate as f32).max(1.0) as u32,
            pos: 0,
        }
    }

    /// Whether the value never changes
    pub const fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    /// Advance one sample and return the current value
    pub fn next_value(&mut self) -> f32 {
        match self {
            Self::Constant(value) => *value,
            Self::Sweep { start, end, samples, pos } => {
                let t = (*pos as f32 / *samples as f32).min(1.0);
                if *pos < *samples {
                    *pos += 1;
                }
                *start * (*end / *start).powf(t)
            }
            Self::Lfo(lfo) => lfo.next_value(),
        }
    }
}

impl From<f32> for Param {
    fn from(value: f32) -> Self {
        Self::Constant(value)
    }
}

impl From<Lfo> for Param {
    fn from(lfo: Lfo) -> Self {
        Self::Lfo(lfo)
    }
}

/// Periodic oscillator with a (possibly modulated) frequency
pub struct Oscillator {
    waveform: Waveform,
    frequency: Param,
    phase: f32,
    dt: f32,
}

impl Oscillator {
    /// Create an oscillator
    pub fn new(waveform: Waveform, frequency: impl Into<Param>, sample_rate: u32) -> Self {
        Self {
            waveform,
            frequency: frequency.into(),
            phase: 0.0,
            dt: 1.0 / sample_rate as f32,
        }
    }
}

impl Signal for Oscillator {
    fn next_sample(&mut self) -> f32 {
        let frequency = self.frequency.next_value();
        let sample = self.waveform.eval(self.phase);
        self.phase += frequency * self.dt;
        self.phase -= self.phase.floor();
        sample
    }
}

/// Sum of several signals; finished once every input is
#[derive(Default)]
pub struct Mix {
    inputs: Vec<Box<dyn Signal>>,
}

impl Mix {
    /// Create an empty mix
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input
    #[must_use]
    pub fn with(mut self, input: impl Signal + 'static) -> Self {
        self.inputs.push(Box::new(input));
        self
    }

    /// Add a boxed input
    pub fn push(&mut self, input: Box<dyn Signal>) {
        self.inputs.push(input);
    }

    /// Number of inputs
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the mix has no inputs
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

impl Signal for Mix {
    fn next_sample(&mut self) -> f32 {
        self.inputs.iter_mut().map(|input| input.next_sample()).sum()
    }

    fn is_finished(&self) -> bool {
        self.inputs.iter().all(|input| input.is_finished())
    }
}

/// Multiplies a signal by a parameter (static level, gusts, tremolo)
pub struct Gain<S> {
    input: S,
    gain: Param,
}

impl<S: Signal> Gain<S> {
    /// Wrap `input`
    pub fn new(input: S, gain: impl Into<Param>) -> Self {
        Self { input, gain: gain.into() }
    }
}

impl<S: Signal> Signal for Gain<S> {
    fn next_sample(&mut self) -> f32 {
        let gain = self.gain.next_value().max(0.0);
        self.input.next_sample() * gain
    }

    fn is_finished(&self) -> bool {
        self.input.is_finished()
    }
}

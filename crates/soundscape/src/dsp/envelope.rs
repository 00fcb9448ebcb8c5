//! Amplitude envelopes

use super::Signal;

/// Length of the linear attack on percussive envelopes
pub const ATTACK_SECONDS: f32 = 0.02;

/// Level the exponential decay reaches at the end of a percussive envelope
pub const DECAY_FLOOR: f32 = 0.001;

/// Amplitude over time
#[derive(Debug, Clone)]
pub enum Envelope {
    /// Linear attack to `peak`, exponential decay to [`DECAY_FLOOR`] by `total`
    Percussive {
        /// Attack length in samples
        attack: u32,
        /// Total length in samples
        total: u32,
        /// Peak gain
        peak: f32,
        /// Samples already produced
        pos: u32,
    },
    /// Linear fade-in to `level`, then held indefinitely
    Sustain {
        /// Fade-in length in samples
        fade_in: u32,
        /// Held gain
        level: f32,
        /// Samples already produced
        pos: u32,
    },
}

impl Envelope {
    /// Short "ding" shape lasting `duration` seconds
    pub fn percussive(duration: f32, peak: f32, sample_rate: u32) -> Self {
        let total = (duration * sample_rate as f32).max(2.0) as u32;
        let attack = ((ATTACK_SECONDS.min(duration * 0.5)) * sample_rate as f32).max(1.0) as u32;
        Self::Percussive { attack: attack.min(total - 1), total, peak, pos: 0 }
    }

    /// Sustained shape fading in over `fade_in` seconds
    pub fn sustain(fade_in: f32, level: f32, sample_rate: u32) -> Self {
        Self::Sustain {
            fade_in: (fade_in * sample_rate as f32).max(1.0) as u32,
            level,
            pos: 0,
        }
    }

    /// Advance one sample and return the current gain
    pub fn next_gain(&mut self) -> f32 {
        match self {
            Self::Percussive { attack, total, peak, pos } => {
                let gain = if *pos >= *total {
                    0.0
                } else if *pos < *attack {
                    *peak * (*pos as f32 / *attack as f32)
                } else {
                    let t = (*pos - *attack) as f32 / (*total - *attack) as f32;
                    let floor = DECAY_FLOOR.min(*peak);
                    *peak * (floor / *peak).powf(t)
                };
                *pos = pos.saturating_add(1);
                gain
            }
            Self::Sustain { fade_in, level, pos } => {
                let gain = *level * (*pos as f32 / *fade_in as f32).min(1.0);
                if *pos < *fade_in {
                    *pos += 1;
                }
                gain
            }
        }
    }

    /// Whether the envelope has reached silence for good
    pub const fn is_finished(&self) -> bool {
        match self {
            Self::Percussive { total, pos, .. } => *pos >= *total,
            Self::Sustain { .. } => false,
        }
    }
}

/// A signal shaped by an envelope, optionally starting after a delay
pub struct Enveloped<S> {
    input: S,
    envelope: Envelope,
    delay: u32,
}

impl<S: Signal> Enveloped<S> {
    /// Shape `input` with `envelope`
    pub const fn new(input: S, envelope: Envelope) -> Self {
        Self { input, envelope, delay: 0 }
    }

    /// Stay silent for `seconds` before the envelope starts
    #[must_use]
    pub fn delayed(mut self, seconds: f32, sample_rate: u32) -> Self {
        self.delay = (seconds.max(0.0) * sample_rate as f32) as u32;
        self
    }
}

impl<S: Signal> Signal for Enveloped<S> {
    fn next_sample(&mut self) -> f32 {
        if self.delay > 0 {
            self.delay -= 1;
            return 0.0;
        }
        if self.envelope.is_finished() {
            return 0.0;
        }
        let gain = self.envelope.next_gain();
        self.input.next_sample() * gain
    }

    fn is_finished(&self) -> bool {
        self.delay == 0 && (self.envelope.is_finished() || self.input.is_finished())
    }
}

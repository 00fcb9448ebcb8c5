//! Biquad filters for shaping noise and pads

use super::{Param, Signal, TWO_PI};

/// Samples between coefficient updates when the cutoff is modulated
const MODULATION_STRIDE: u32 = 32;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Pass everything below the cutoff
    Lowpass,
    /// Pass everything above the cutoff
    Highpass,
    /// Pass a band around the cutoff
    Bandpass,
}

/// Direct Form II transposed biquad
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    sample_rate: f32,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl Biquad {
    /// Create a filter with its coefficients set for `cutoff` and `q`
    pub fn new(kind: FilterKind, cutoff: f32, q: f32, sample_rate: u32) -> Self {
        let mut filter = Self {
            kind,
            sample_rate: sample_rate as f32,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        filter.set(cutoff, q);
        filter
    }

    /// Recalculate coefficients, keeping the filter state
    pub fn set(&mut self, cutoff: f32, q: f32) {
        let nyquist_guard = self.sample_rate * 0.49;
        let w0 = TWO_PI * cutoff.clamp(10.0, nyquist_guard) / self.sample_rate;
        let alpha = w0.sin() / (2.0 * q.max(0.05));
        let cos_w0 = w0.cos();
        let a0 = 1.0 + alpha;

        let (b0, b1, b2) = match self.kind {
            FilterKind::Lowpass => ((1.0 - cos_w0) / 2.0, 1.0 - cos_w0, (1.0 - cos_w0) / 2.0),
            FilterKind::Highpass => ((1.0 + cos_w0) / 2.0, -(1.0 + cos_w0), (1.0 + cos_w0) / 2.0),
            FilterKind::Bandpass => (alpha, 0.0, -alpha),
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = (-2.0 * cos_w0) / a0;
        self.a2 = (1.0 - alpha) / a0;
    }

    /// Filter one sample
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

/// A signal passed through a biquad whose cutoff may be modulated
pub struct Filtered<S> {
    input: S,
    filter: Biquad,
    cutoff: Param,
    q: f32,
    countdown: u32,
}

impl<S: Signal> Filtered<S> {
    /// Filter `input`
    pub fn new(input: S, kind: FilterKind, cutoff: impl Into<Param>, q: f32, sample_rate: u32) -> Self {
        let mut cutoff = cutoff.into();
        let initial = cutoff.next_value();
        Self {
            input,
            filter: Biquad::new(kind, initial, q, sample_rate),
            cutoff,
            q,
            countdown: MODULATION_STRIDE,
        }
    }
}

impl<S: Signal> Signal for Filtered<S> {
    fn next_sample(&mut self) -> f32 {
        if !self.cutoff.is_constant() {
            // Keep the parameter advancing every sample so LFO rates stay true
            let cutoff = self.cutoff.next_value();
            self.countdown -= 1;
            if self.countdown == 0 {
                self.filter.set(cutoff, self.q);
                self.countdown = MODULATION_STRIDE;
            }
        }
        self.filter.process(self.input.next_sample())
    }

    fn is_finished(&self) -> bool {
        self.input.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{Oscillator, Waveform};

    fn rms(signal: &mut impl Signal, samples: usize) -> f32 {
        // Skip the transient
        for _ in 0..samples {
            signal.next_sample();
        }
        let sum: f32 = (0..samples).map(|_| signal.next_sample().powi(2)).sum();
        (sum / samples as f32).sqrt()
    }

    #[test]
    fn test_lowpass_attenuates_high_tones() {
        let mut low = Filtered::new(Oscillator::new(Waveform::Sine, 100.0, 44_100), FilterKind::Lowpass, 200.0, 0.707, 44_100);
        let mut high = Filtered::new(Oscillator::new(Waveform::Sine, 5000.0, 44_100), FilterKind::Lowpass, 200.0, 0.707, 44_100);
        assert!(rms(&mut low, 4410) > 0.5);
        assert!(rms(&mut high, 4410) < 0.05);
    }

    #[test]
    fn test_highpass_attenuates_low_tones() {
        let mut low = Filtered::new(Oscillator::new(Waveform::Sine, 50.0, 44_100), FilterKind::Highpass, 2000.0, 0.707, 44_100);
        assert!(rms(&mut low, 4410) < 0.05);
    }

    #[test]
    fn test_bandpass_passes_center() {
        let mut center = Filtered::new(Oscillator::new(Waveform::Sine, 800.0, 44_100), FilterKind::Bandpass, 800.0, 1.0, 44_100);
        let mut far = Filtered::new(Oscillator::new(Waveform::Sine, 60.0, 44_100), FilterKind::Bandpass, 800.0, 1.0, 44_100);
        assert!(rms(&mut center, 4410) > 0.5);
        assert!(rms(&mut far, 4410) < 0.1);
    }
}

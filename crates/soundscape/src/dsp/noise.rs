//! Looping noise buffers

use super::Signal;
use rand::Rng;
use std::sync::Arc;

/// Length of every generated noise block in seconds
pub const NOISE_SECONDS: f32 = 2.0;

/// Make-up gain applied to brown noise after damping
const BROWN_GAIN: f32 = 3.5;

/// Spectral color of a noise block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseColor {
    /// Flat spectrum
    White,
    /// Damped running sum of white noise; rumbly
    Brown,
}

/// Fill a block of `len` samples with noise of the given color
pub fn generate<R: Rng + ?Sized>(color: NoiseColor, len: usize, rng: &mut R) -> Vec<f32> {
    match color {
        NoiseColor::White => (0..len).map(|_| rng.gen_range(-1.0..1.0)).collect(),
        NoiseColor::Brown => {
            let mut last = 0.0_f32;
            (0..len)
                .map(|_| {
                    let white: f32 = rng.gen_range(-1.0..1.0);
                    last = (last + 0.02 * white) / 1.02;
                    last * BROWN_GAIN
                })
                .collect()
        }
    }
}

/// Pre-generated noise blocks shared by every noise layer
///
/// Blocks are immutable once built; each [`NoiseSource`] just holds a
/// reference and its own read position.
#[derive(Clone)]
pub struct NoiseBank {
    white: Arc<[f32]>,
    brown: Arc<[f32]>,
}

impl NoiseBank {
    /// Generate one block of each color
    pub fn new<R: Rng + ?Sized>(sample_rate: u32, rng: &mut R) -> Self {
        let len = (NOISE_SECONDS * sample_rate as f32) as usize;
        Self {
            white: generate(NoiseColor::White, len, rng).into(),
            brown: generate(NoiseColor::Brown, len, rng).into(),
        }
    }

    /// Shared block for `color`
    pub fn block(&self, color: NoiseColor) -> Arc<[f32]> {
        match color {
            NoiseColor::White => Arc::clone(&self.white),
            NoiseColor::Brown => Arc::clone(&self.brown),
        }
    }

    /// A looping source over `color`, starting at a random offset so that
    /// simultaneous layers do not phase against each other
    pub fn source<R: Rng + ?Sized>(&self, color: NoiseColor, rng: &mut R) -> NoiseSource {
        let block = self.block(color);
        let offset = if block.is_empty() { 0 } else { rng.gen_range(0..block.len()) };
        NoiseSource::new(block, offset)
    }
}

/// Endless loop over a noise block
pub struct NoiseSource {
    block: Arc<[f32]>,
    pos: usize,
}

impl NoiseSource {
    /// Loop `block` starting at `offset`
    pub fn new(block: Arc<[f32]>, offset: usize) -> Self {
        let pos = if block.is_empty() { 0 } else { offset % block.len() };
        Self { block, pos }
    }
}

impl Signal for NoiseSource {
    fn next_sample(&mut self) -> f32 {
        if self.block.is_empty() {
            return 0.0;
        }
        let sample = self.block[self.pos];
        self.pos = (self.pos + 1) % self.block.len();
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_white_noise_is_bounded() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let block = generate(NoiseColor::White, 4096, &mut rng);
        assert!(block.iter().all(|s| (-1.0..1.0).contains(s)));
    }

    #[test]
    fn test_brown_noise_is_smoother_than_white() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(2);
        let white = generate(NoiseColor::White, 8192, &mut rng);
        let brown = generate(NoiseColor::Brown, 8192, &mut rng);
        let roughness = |block: &[f32]| -> f32 {
            block.windows(2).map(|w| (w[1] - w[0]).abs()).sum::<f32>() / block.len() as f32
        };
        assert!(roughness(&brown) < roughness(&white) * 0.2);
        assert!(brown.iter().all(|s| s.abs() <= BROWN_GAIN));
    }

    #[test]
    fn test_source_loops() {
        let block: Arc<[f32]> = vec![0.1, 0.2, 0.3].into();
        let mut source = NoiseSource::new(block, 2);
        let samples: Vec<f32> = (0..4).map(|_| source.next_sample()).collect();
        assert_eq!(samples, vec![0.3, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn test_bank_shares_blocks() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        let bank = NoiseBank::new(1000, &mut rng);
        assert!(Arc::ptr_eq(&bank.block(NoiseColor::Brown), &bank.block(NoiseColor::Brown)));
        assert_eq!(bank.block(NoiseColor::White).len(), 2000);
    }
}

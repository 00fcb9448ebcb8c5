//! One-shot sound effects
//!
//! Every effect is a short table of [`Tone`]s and [`NoiseLayer`] bursts mixed
//! into a single node on the effects bus. The node finishes when its last
//! envelope does and is dropped by the mixer; nothing is tracked afterwards.

use crate::dsp::{FilterKind, Mix, NoiseBank, NoiseColor, Signal, Waveform};
use crate::error::AudioError;
use crate::output::{Bus, OutputDevice};
use crate::primitives::{NoiseLayer, Tone};
use rand::Rng;

/// The effect catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    /// Ascending pentatonic chime
    Coin,
    /// Wobbling sawtooth siren
    Alarm,
    /// Low drone followed by a delayed hit
    DramaticReveal,
    /// Rising major figure
    PositiveStinger,
    /// Falling minor figure
    NegativeStinger,
    /// Tiny tick for navigation
    NavClick,
    /// Soft press
    ButtonPress,
    /// Upward blip
    PopupOpen,
    /// Downward blip
    PopupClose,
    /// Two dissonant square buzzes
    ErrorBuzz,
    /// Two-note ping
    NotificationPing,
    /// Thud with a noise crack
    CombatHit,
    /// Triumphant arpeggio ending on a chord
    RewardFanfare,
    /// Slowing ticks of a reel
    CasinoSpin,
    /// Bright three-note win
    CasinoWin,
    /// Fast run with a shimmer tail
    CasinoJackpot,
    /// Falling sawtooth with a thump
    CasinoBust,
    /// Clean fifth and octave
    CasinoNatural,
    /// Whirring ball and wheel
    RouletteSpin,
    /// Ball settling into a pocket
    RouletteDrop,
    /// Roulette payout
    RouletteWin,
    /// Card sliding across felt
    CardDeal,
    /// Card snapped over
    CardFlip,
    /// Quick upward step
    StreakUp,
    /// Coins with a shimmer
    CashOut,
    /// Slow downward slide
    Loss,
    /// Warm staggered chord
    AllianceFormed,
    /// Gavel knock and bid tone
    AuctionBid,
}

/// One element of an effect's table
#[derive(Debug, Clone, PartialEq)]
enum Voice {
    Tone(Tone),
    Noise(NoiseLayer),
}

impl From<Tone> for Voice {
    fn from(tone: Tone) -> Self {
        Self::Tone(tone)
    }
}

impl From<NoiseLayer> for Voice {
    fn from(layer: NoiseLayer) -> Self {
        Self::Noise(layer)
    }
}

/// Notes of a run, `step` seconds apart
fn run(notes: &[f32], step: f32, duration: f32, waveform: Waveform, peak: f32) -> Vec<Voice> {
    notes
        .iter()
        .enumerate()
        .map(|(i, &frequency)| {
            Tone::new(frequency, duration)
                .waveform(waveform)
                .peak(peak)
                .delay(i as f32 * step)
                .into()
        })
        .collect()
}

impl Effect {
    /// Every effect, in catalog order
    pub const ALL: [Self; 28] = [
        Self::Coin,
        Self::Alarm,
        Self::DramaticReveal,
        Self::PositiveStinger,
        Self::NegativeStinger,
        Self::NavClick,
        Self::ButtonPress,
        Self::PopupOpen,
        Self::PopupClose,
        Self::ErrorBuzz,
        Self::NotificationPing,
        Self::CombatHit,
        Self::RewardFanfare,
        Self::CasinoSpin,
        Self::CasinoWin,
        Self::CasinoJackpot,
        Self::CasinoBust,
        Self::CasinoNatural,
        Self::RouletteSpin,
        Self::RouletteDrop,
        Self::RouletteWin,
        Self::CardDeal,
        Self::CardFlip,
        Self::StreakUp,
        Self::CashOut,
        Self::Loss,
        Self::AllianceFormed,
        Self::AuctionBid,
    ];

    /// Stable lowercase name
    pub const fn name(self) -> &'static str {
        match self {
            Self::Coin => "coin",
            Self::Alarm => "alarm",
            Self::DramaticReveal => "dramatic_reveal",
            Self::PositiveStinger => "positive_stinger",
            Self::NegativeStinger => "negative_stinger",
            Self::NavClick => "nav_click",
            Self::ButtonPress => "button_press",
            Self::PopupOpen => "popup_open",
            Self::PopupClose => "popup_close",
            Self::ErrorBuzz => "error_buzz",
            Self::NotificationPing => "notification_ping",
            Self::CombatHit => "combat_hit",
            Self::RewardFanfare => "reward_fanfare",
            Self::CasinoSpin => "casino_spin",
            Self::CasinoWin => "casino_win",
            Self::CasinoJackpot => "casino_jackpot",
            Self::CasinoBust => "casino_bust",
            Self::CasinoNatural => "casino_natural",
            Self::RouletteSpin => "roulette_spin",
            Self::RouletteDrop => "roulette_drop",
            Self::RouletteWin => "roulette_win",
            Self::CardDeal => "card_deal",
            Self::CardFlip => "card_flip",
            Self::StreakUp => "streak_up",
            Self::CashOut => "cash_out",
            Self::Loss => "loss",
            Self::AllianceFormed => "alliance_formed",
            Self::AuctionBid => "auction_bid",
        }
    }

    /// Look an effect up by [`name`](Self::name)
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|effect| effect.name() == name)
    }

    fn voices(self) -> Vec<Voice> {
        use Waveform::{Sawtooth, Sine, Square, Triangle};

        match self {
            Self::Coin => run(&[1046.5, 1174.66, 1318.51, 1567.98, 2093.0], 0.06, 0.18, Sine, 0.18),
            Self::Alarm => vec![Tone::new(750.0, 1.6).waveform(Sawtooth).wobble(150.0, 3.0).lowpass(2500.0).peak(0.15).into()],
            Self::DramaticReveal => vec![
                Tone::new(55.0, 1.8).waveform(Sawtooth).lowpass(400.0).peak(0.25).into(),
                Tone::new(110.0, 0.8).waveform(Square).lowpass(900.0).peak(0.2).delay(0.6).into(),
                NoiseLayer::new(NoiseColor::Brown)
                    .filter(FilterKind::Lowpass, 300.0, 0.7)
                    .level(0.4)
                    .burst(0.5, 0.6)
                    .into(),
            ],
            Self::PositiveStinger => {
                let mut voices = run(&[523.25, 659.25, 783.99], 0.09, 0.25, Triangle, 0.15);
                voices.push(Tone::new(1046.5, 0.5).peak(0.15).delay(0.27).into());
                voices
            }
            Self::NegativeStinger => {
                let mut voices = run(&[392.0, 311.13, 261.63], 0.12, 0.3, Triangle, 0.15);
                voices.push(Tone::new(196.0, 0.7).waveform(Sawtooth).lowpass(800.0).peak(0.12).delay(0.36).into());
                voices
            }
            Self::NavClick => vec![Tone::new(1800.0, 0.03).peak(0.08).into()],
            Self::ButtonPress => vec![
                Tone::new(1200.0, 0.05).waveform(Square).lowpass(3000.0).peak(0.05).into(),
                Tone::new(600.0, 0.06).peak(0.08).into(),
            ],
            Self::PopupOpen => vec![Tone::new(400.0, 0.12).glide_to(800.0).peak(0.12).into()],
            Self::PopupClose => vec![Tone::new(800.0, 0.12).glide_to(400.0).peak(0.12).into()],
            Self::ErrorBuzz => vec![
                Tone::new(110.0, 0.25).waveform(Square).lowpass(1500.0).peak(0.15).into(),
                Tone::new(116.54, 0.25).waveform(Square).lowpass(1500.0).peak(0.15).delay(0.28).into(),
            ],
            Self::NotificationPing => vec![
                Tone::new(880.0, 0.3).peak(0.15).into(),
                Tone::new(1318.51, 0.4).peak(0.12).delay(0.1).into(),
            ],
            Self::CombatHit => vec![
                Tone::new(80.0, 0.25).glide_to(40.0).peak(0.35).into(),
                NoiseLayer::new(NoiseColor::White)
                    .filter(FilterKind::Lowpass, 1200.0, 0.7)
                    .level(0.5)
                    .burst(0.15, 0.0)
                    .into(),
            ],
            Self::RewardFanfare => {
                let mut voices = run(&[523.25, 659.25, 783.99, 1046.5], 0.12, 0.3, Triangle, 0.14);
                voices.push(Tone::new(523.25, 0.9).peak(0.1).delay(0.48).into());
                voices.push(Tone::new(783.99, 0.9).peak(0.1).delay(0.48).into());
                voices
            }
            Self::CasinoSpin => [0.0, 0.07, 0.15, 0.25, 0.38, 0.55]
                .into_iter()
                .map(|delay| Tone::new(2000.0, 0.025).waveform(Square).lowpass(4000.0).peak(0.06).delay(delay).into())
                .collect(),
            Self::CasinoWin => run(&[659.25, 783.99, 1046.5], 0.1, 0.3, Square, 0.08)
                .into_iter()
                .map(|voice| match voice {
                    Voice::Tone(tone) => tone.lowpass(2000.0).into(),
                    other => other,
                })
                .collect(),
            Self::CasinoJackpot => {
                let mut voices = run(&[523.25, 659.25, 783.99, 1046.5, 1567.98], 0.07, 0.35, Triangle, 0.12);
                voices.push(
                    NoiseLayer::new(NoiseColor::White)
                        .filter(FilterKind::Bandpass, 6000.0, 1.5)
                        .modulate_cutoff(1500.0, 4.0)
                        .level(0.12)
                        .burst(1.0, 0.35)
                        .into(),
                );
                voices
            }
            Self::CasinoBust => vec![
                Tone::new(300.0, 0.7).glide_to(80.0).waveform(Sawtooth).lowpass(1200.0).peak(0.15).into(),
                NoiseLayer::new(NoiseColor::Brown)
                    .filter(FilterKind::Lowpass, 200.0, 0.7)
                    .level(0.5)
                    .burst(0.3, 0.0)
                    .into(),
            ],
            Self::CasinoNatural => vec![
                Tone::new(783.99, 0.6).peak(0.12).into(),
                Tone::new(1174.66, 0.6).peak(0.1).into(),
                Tone::new(1567.98, 0.5).peak(0.1).delay(0.15).into(),
            ],
            Self::RouletteSpin => vec![
                NoiseLayer::new(NoiseColor::White)
                    .filter(FilterKind::Bandpass, 3000.0, 2.0)
                    .modulate_cutoff(1500.0, 6.0)
                    .level(0.15)
                    .burst(1.5, 0.0)
                    .into(),
                Tone::new(600.0, 1.5).glide_to(200.0).waveform(Triangle).peak(0.05).into(),
            ],
            Self::RouletteDrop => [(0.0, 0.12), (0.09, 0.08), (0.2, 0.05)]
                .into_iter()
                .map(|(delay, peak)| Tone::new(2500.0, 0.04).peak(peak).delay(delay).into())
                .collect(),
            Self::RouletteWin => {
                let mut voices = run(&[587.33, 739.99, 880.0], 0.1, 0.35, Triangle, 0.13);
                voices.push(Tone::new(1174.66, 0.6).peak(0.12).delay(0.3).into());
                voices
            }
            Self::CardDeal => vec![NoiseLayer::new(NoiseColor::White)
                .filter(FilterKind::Highpass, 2000.0, 0.7)
                .level(0.3)
                .burst(0.06, 0.0)
                .into()],
            Self::CardFlip => vec![
                NoiseLayer::new(NoiseColor::White)
                    .filter(FilterKind::Bandpass, 3500.0, 2.0)
                    .level(0.35)
                    .burst(0.05, 0.0)
                    .into(),
                Tone::new(1500.0, 0.04).peak(0.06).delay(0.02).into(),
            ],
            Self::StreakUp => vec![
                Tone::new(523.25, 0.15).waveform(Square).lowpass(2200.0).peak(0.08).into(),
                Tone::new(783.99, 0.25).waveform(Square).lowpass(2200.0).peak(0.08).delay(0.08).into(),
            ],
            Self::CashOut => {
                let mut voices = run(&[1318.51, 1567.98, 2093.0], 0.06, 0.25, Sine, 0.13);
                voices.push(
                    NoiseLayer::new(NoiseColor::White)
                        .filter(FilterKind::Bandpass, 8000.0, 2.0)
                        .level(0.1)
                        .burst(0.4, 0.1)
                        .into(),
                );
                voices
            }
            Self::Loss => vec![
                Tone::new(392.0, 0.8).glide_to(196.0).waveform(Triangle).peak(0.18).into(),
                Tone::new(185.0, 0.7).peak(0.1).delay(0.3).into(),
            ],
            Self::AllianceFormed => {
                let mut voices = run(&[261.63, 329.63, 392.0], 0.08, 1.2, Sine, 0.1);
                voices.push(Tone::new(523.25, 0.8).peak(0.1).delay(0.4).into());
                voices
            }
            Self::AuctionBid => vec![
                NoiseLayer::new(NoiseColor::Brown)
                    .filter(FilterKind::Lowpass, 800.0, 0.7)
                    .level(0.5)
                    .burst(0.08, 0.0)
                    .into(),
                Tone::new(987.77, 0.1).waveform(Triangle).peak(0.1).into(),
                Tone::new(1318.51, 0.15).waveform(Triangle).peak(0.1).delay(0.07).into(),
            ],
        }
    }

    /// Build the effect as a single self-finishing signal
    ///
    /// # Errors
    /// `InvalidParameter` if any voice in the table is malformed.
    pub fn build<R: Rng + ?Sized>(self, bank: &NoiseBank, rng: &mut R, sample_rate: u32) -> Result<Box<dyn Signal>, AudioError> {
        let mut mix = Mix::new();
        for voice in self.voices() {
            let signal = match voice {
                Voice::Tone(tone) => tone.build(sample_rate)?,
                Voice::Noise(layer) => layer.build(bank, rng, sample_rate)?,
            };
            mix.push(signal);
        }
        Ok(Box::new(mix))
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Fire `effect` on the effects bus
///
/// # Errors
/// Propagates build failures and device errors; the caller decides how loud
/// to be about them.
pub fn play<R: Rng + ?Sized>(effect: Effect, device: &mut OutputDevice, bank: &NoiseBank, rng: &mut R) -> Result<(), AudioError> {
    let signal = effect.build(bank, rng, device.sample_rate())?;
    device.play_oneshot(Bus::Effects, effect.name(), signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AudioConfig;
    use crate::output::headless::rms;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    const RATE: u32 = 8000;

    #[test]
    fn test_every_effect_builds_and_ends() {
        let mut rng = StdRng::seed_from_u64(1);
        let bank = NoiseBank::new(RATE, &mut rng);
        for effect in Effect::ALL {
            let voices = effect.voices();
            assert!((1..=6).contains(&voices.len()), "{effect} has {} voices", voices.len());

            let mut signal = effect.build(&bank, &mut rng, RATE).unwrap();
            let samples: Vec<f32> = (0..RATE as usize * 3).map(|_| signal.next_sample()).collect();
            assert!(rms(&samples) > 0.0, "{effect} is silent");
            assert!(signal.is_finished(), "{effect} never ends");
        }
    }

    #[test]
    fn test_names_are_unique_and_parse_back() {
        let names: HashSet<_> = Effect::ALL.iter().map(|effect| effect.name()).collect();
        assert_eq!(names.len(), Effect::ALL.len());
        assert_eq!(Effect::from_name("casino_jackpot"), Some(Effect::CasinoJackpot));
        assert_eq!(Effect::from_name("kazoo"), None);
    }

    #[test]
    fn test_play_lands_on_effects_bus() {
        let config = AudioConfig { sample_rate: RATE, ..AudioConfig::default() };
        let (mut device, tap) = OutputDevice::headless(config);
        let mut rng = StdRng::seed_from_u64(2);
        let bank = NoiseBank::new(RATE, &mut rng);

        device.set_bus_gain(Bus::Effects, 0.0);
        play(Effect::Coin, &mut device, &bank, &mut rng).unwrap();
        assert!(rms(&tap.render(RATE as usize / 4)) < 1e-6);

        device.set_bus_gain(Bus::Effects, 1.0);
        play(Effect::Coin, &mut device, &bank, &mut rng).unwrap();
        assert!(rms(&tap.render(RATE as usize / 4)) > 0.001);

        // Both one-shots drop out of the graph once their envelopes end
        tap.render(RATE as usize * 2);
        assert_eq!(tap.node_count(), 0);
    }
}

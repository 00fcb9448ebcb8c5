//! The engine facade handed to the host
//!
//! [`SoundSystem`] owns the output device and both engines. The host creates
//! one at startup, calls [`SoundSystem::update`] every frame from its main
//! thread and drives everything else through the narrow API below. No method
//! returns an error: failures are logged and end up as less sound.

use crate::ambiance::{AmbianceEngine, Weather};
use crate::config::{AudioConfig, AudioPreferences};
use crate::dsp::NoiseBank;
use crate::effects::{self, Effect};
use crate::music::{MusicEngine, Scene};
use crate::output::{HeadlessTap, OutputDevice};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Procedural audio for the whole game
pub struct SoundSystem {
    // Engines drop before the device so their layers are released first
    music: MusicEngine,
    ambiance: AmbianceEngine,
    bank: NoiseBank,
    rng: StdRng,
    device: OutputDevice,
}

impl SoundSystem {
    /// Sound system playing through the default output device
    pub fn new(config: AudioConfig) -> Self {
        Self::with_device(OutputDevice::new(config))
    }

    /// Sound system on a prepared device
    pub fn with_device(device: OutputDevice) -> Self {
        Self::build(device, StdRng::from_entropy())
    }

    /// Sound system with reproducible randomness
    pub fn with_seed(device: OutputDevice, seed: u64) -> Self {
        Self::build(device, StdRng::seed_from_u64(seed))
    }

    /// Sound system without hardware, plus the tap that renders it
    pub fn headless(config: AudioConfig, seed: u64) -> (Self, HeadlessTap) {
        let (device, tap) = OutputDevice::headless(config);
        (Self::with_seed(device, seed), tap)
    }

    fn build(mut device: OutputDevice, mut rng: StdRng) -> Self {
        let music = MusicEngine::new(&mut device);
        let ambiance = AmbianceEngine::with_seed(&mut device, rand::Rng::gen(&mut rng));
        let bank = ambiance.noise_bank().clone();
        Self { music, ambiance, bank, rng, device }
    }

    // Volume

    /// Set the master volume (clamped to `[0, 1]`)
    pub fn set_volume(&mut self, volume: f32) {
        self.device.set_volume(volume);
    }

    /// Master volume preference
    pub fn volume(&self) -> f32 {
        self.device.volume()
    }

    /// Flip mute; returns the new muted state
    pub fn toggle_mute(&mut self) -> bool {
        self.device.toggle_mute()
    }

    /// Whether output is muted
    pub fn is_muted(&self) -> bool {
        self.device.is_muted()
    }

    /// Push persisted preferences into the engine
    pub fn apply_preferences(&mut self, preferences: &AudioPreferences) {
        self.device.set_volume(preferences.volume);
        self.device.set_muted(preferences.muted);
        self.music.set_volume(preferences.music_volume, &mut self.device);
        self.ambiance.set_volume(preferences.ambiance_volume, &mut self.device);
    }

    /// Current preferences, for the host to persist
    pub fn preferences(&self) -> AudioPreferences {
        AudioPreferences {
            volume: self.device.volume(),
            muted: self.device.is_muted(),
            music_volume: self.music.volume(),
            ambiance_volume: self.ambiance.volume(),
        }
    }

    // Effects

    /// Fire a one-shot effect
    pub fn play(&mut self, effect: Effect) {
        if let Err(e) = effects::play(effect, &mut self.device, &self.bank, &mut self.rng) {
            log::debug!("Effect {effect} skipped: {e}");
        }
    }

    // Music

    /// Switch the music scene
    pub fn set_music_scene(&mut self, scene: Scene) {
        self.music.set_scene(scene, &mut self.device);
    }

    /// Fade the music out
    pub fn stop_music(&mut self) {
        self.music.stop(&mut self.device);
    }

    /// Set the music volume (clamped to the music ceiling)
    pub fn set_music_volume(&mut self, volume: f32) {
        self.music.set_volume(volume, &mut self.device);
    }

    // Ambiance

    /// Start the city soundscape
    pub fn start_ambiance(&mut self) {
        self.ambiance.start(&mut self.device);
    }

    /// Stop the city soundscape and every pending recurrence
    pub fn stop_ambiance(&mut self) {
        self.ambiance.stop();
    }

    /// Change the weather layers
    pub fn set_weather(&mut self, weather: Weather) {
        self.ambiance.set_weather(weather, &mut self.device);
    }

    /// Set the ambiance volume (clamped to the ambiance ceiling)
    pub fn set_ambiance_volume(&mut self, volume: f32) {
        self.ambiance.set_volume(volume, &mut self.device);
    }

    /// Advance fades and recurrences; call once per frame
    pub fn update(&mut self, delta_time: f32) {
        self.music.update(delta_time);
        self.ambiance.update(delta_time, &mut self.device);
    }

    // Introspection

    /// Output device
    pub fn device(&self) -> &OutputDevice {
        &self.device
    }

    /// Music engine
    pub fn music(&self) -> &MusicEngine {
        &self.music
    }

    /// Ambiance engine
    pub fn ambiance(&self) -> &AmbianceEngine {
        &self.ambiance
    }

    /// Nodes owned by the engines (music layers, bed, weather, events)
    pub fn active_nodes(&self) -> usize {
        self.music.active_layers() + self.ambiance.active_nodes()
    }

    /// Stopped nodes still fading out
    pub fn fading_nodes(&self) -> usize {
        self.music.fading_layers() + self.ambiance.fading_nodes()
    }

    /// Recurrences waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.ambiance.pending_timers()
    }
}

macro_rules! effect_methods {
    ($($method:ident => $effect:ident),* $(,)?) => {
        impl SoundSystem {
            $(
                #[doc = concat!("Play [`Effect::", stringify!($effect), "`]")]
                pub fn $method(&mut self) {
                    self.play(Effect::$effect);
                }
            )*
        }
    };
}

effect_methods! {
    play_coin => Coin,
    play_alarm => Alarm,
    play_dramatic_reveal => DramaticReveal,
    play_positive_stinger => PositiveStinger,
    play_negative_stinger => NegativeStinger,
    play_nav_click => NavClick,
    play_button_press => ButtonPress,
    play_popup_open => PopupOpen,
    play_popup_close => PopupClose,
    play_error_buzz => ErrorBuzz,
    play_notification_ping => NotificationPing,
    play_combat_hit => CombatHit,
    play_reward_fanfare => RewardFanfare,
    play_casino_spin => CasinoSpin,
    play_casino_win => CasinoWin,
    play_casino_jackpot => CasinoJackpot,
    play_casino_bust => CasinoBust,
    play_casino_natural => CasinoNatural,
    play_roulette_spin => RouletteSpin,
    play_roulette_drop => RouletteDrop,
    play_roulette_win => RouletteWin,
    play_card_deal => CardDeal,
    play_card_flip => CardFlip,
    play_streak_up => StreakUp,
    play_cash_out => CashOut,
    play_loss => Loss,
    play_alliance_formed => AllianceFormed,
    play_auction_bid => AuctionBid,
}

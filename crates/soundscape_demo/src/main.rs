//! Soundscape demo application
//!
//! Plays the part of the game: loads the player's audio preferences, then
//! walks through music scenes, weather and one-shot effects on a timed script
//! while driving the sound system from a frame loop.
//!
//! ```text
//! soundscape_demo [--headless] [--prefs <file.toml|file.ron>] [--config <file>]
//! ```
//!
//! `--headless` renders the mix offline as fast as possible and logs levels
//! instead of playing through a device.

mod timer;

use soundscape::output::headless::rms;
use soundscape::prelude::*;
use soundscape::HeadlessTap;
use timer::FrameClock;

const FRAME_RATE: u32 = 60;

/// Something the game does at a point in the script
#[derive(Debug, Clone, Copy)]
enum Cue {
    Scene(&'static str),
    StopMusic,
    StartAmbiance,
    StopAmbiance,
    Weather(&'static str),
    Effect(Effect),
    ToggleMute,
}

/// (seconds, cue)
const SCRIPT: &[(f32, Cue)] = &[
    (0.0, Cue::Scene("city")),
    (0.5, Cue::StartAmbiance),
    (3.0, Cue::Effect(Effect::NavClick)),
    (3.5, Cue::Effect(Effect::Coin)),
    (5.0, Cue::Scene("trade")),
    (6.0, Cue::Effect(Effect::AuctionBid)),
    (7.0, Cue::Effect(Effect::CashOut)),
    (9.0, Cue::Weather("rain")),
    (12.0, Cue::Scene("empire")),
    (13.0, Cue::Effect(Effect::AllianceFormed)),
    (15.0, Cue::Weather("storm")),
    (17.0, Cue::Scene("combat")),
    (18.0, Cue::Effect(Effect::CombatHit)),
    (18.4, Cue::Effect(Effect::CombatHit)),
    (19.5, Cue::Effect(Effect::Alarm)),
    (22.0, Cue::ToggleMute),
    (24.0, Cue::ToggleMute),
    (25.0, Cue::Effect(Effect::RewardFanfare)),
    // Not a music scene; parses to silence
    (27.0, Cue::Scene("casino")),
    (27.5, Cue::Effect(Effect::CasinoSpin)),
    (28.5, Cue::Effect(Effect::CasinoJackpot)),
    (30.0, Cue::Weather("clear")),
    (31.0, Cue::Scene("profile")),
    (34.0, Cue::StopAmbiance),
    (35.0, Cue::StopMusic),
];

/// Seconds to keep running after the last cue so fades can finish
const TAIL: f32 = 2.5;

struct Options {
    headless: bool,
    prefs_path: String,
    config_path: Option<String>,
}

impl Options {
    fn from_args() -> Self {
        let mut options = Self {
            headless: false,
            prefs_path: "soundscape_prefs.toml".to_string(),
            config_path: None,
        };
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--headless" => options.headless = true,
                "--prefs" => {
                    if let Some(path) = args.next() {
                        options.prefs_path = path;
                    }
                }
                "--config" => options.config_path = args.next(),
                other => log::warn!("Ignoring unknown argument {other}"),
            }
        }
        options
    }
}

struct DemoApp {
    sound: SoundSystem,
    tap: Option<HeadlessTap>,
    clock: FrameClock,
    next_cue: usize,
    sample_rate: u32,
}

impl DemoApp {
    fn new(options: &Options) -> Self {
        let config = match &options.config_path {
            Some(path) => AudioConfig::load_or_default(path).unwrap_or_else(|e| {
                log::warn!("Could not read engine config {path}: {e}");
                AudioConfig::default()
            }),
            None => AudioConfig::default(),
        };
        let sample_rate = config.sample_rate;

        let (sound, tap) = if options.headless {
            let (sound, tap) = SoundSystem::headless(config, 0x5eed);
            (sound, Some(tap))
        } else {
            (SoundSystem::new(config), None)
        };

        Self {
            sound,
            tap,
            clock: FrameClock::new(FRAME_RATE),
            next_cue: 0,
            sample_rate,
        }
    }

    fn initialize(&mut self, prefs_path: &str) {
        let preferences = AudioPreferences::load_or_default(prefs_path).unwrap_or_else(|e| {
            log::warn!("Could not read preferences {prefs_path}: {e}");
            AudioPreferences::default()
        });
        log::info!(
            "Preferences: volume {:.2}, muted {}, music {:.2}, ambiance {:.2}",
            preferences.volume,
            preferences.muted,
            preferences.music_volume,
            preferences.ambiance_volume
        );
        self.sound.apply_preferences(&preferences);
    }

    fn run(&mut self) {
        let end = SCRIPT.last().map_or(0.0, |(at, _)| *at) + TAIL;
        let mut level_window = Vec::new();

        while self.clock.total_time() < end {
            let delta_time = if self.tap.is_some() { self.clock.step() } else { self.clock.tick() };
            self.fire_due_cues();
            self.sound.update(delta_time);

            if let Some(tap) = &self.tap {
                level_window.extend(tap.render_seconds(delta_time, self.sample_rate));
                if level_window.len() >= self.sample_rate as usize {
                    log::info!(
                        "t={:5.1}s level {:.4} nodes {} fading {} timers {}",
                        self.clock.total_time(),
                        rms(&level_window),
                        self.sound.active_nodes(),
                        self.sound.fading_nodes(),
                        self.sound.pending_timers()
                    );
                    level_window.clear();
                }
            }
        }

        let stats = self.sound.ambiance().stats();
        log::info!(
            "Done after {} frames ({:.0} fps): {} sirens, {} thunder claps, {} droplets",
            self.clock.frame_count(),
            self.clock.average_fps(),
            stats.sirens,
            stats.thunder_claps,
            stats.droplets
        );
    }

    fn fire_due_cues(&mut self) {
        let now = self.clock.total_time();
        while let Some(&(at, cue)) = SCRIPT.get(self.next_cue) {
            if at > now {
                break;
            }
            self.next_cue += 1;
            log::info!("t={now:5.1}s {cue:?}");
            match cue {
                Cue::Scene(name) => self.sound.set_music_scene(Scene::from_name(name)),
                Cue::StopMusic => self.sound.stop_music(),
                Cue::StartAmbiance => self.sound.start_ambiance(),
                Cue::StopAmbiance => self.sound.stop_ambiance(),
                Cue::Weather(name) => self.sound.set_weather(Weather::from_name(name)),
                Cue::Effect(effect) => self.sound.play(effect),
                Cue::ToggleMute => {
                    self.sound.toggle_mute();
                }
            }
        }
    }

    fn shutdown(&self, prefs_path: &str) {
        if let Err(e) = self.sound.preferences().save_to_file(prefs_path) {
            log::warn!("Could not save preferences {prefs_path}: {e}");
        }
    }
}

fn main() {
    soundscape::logging::init();
    log::info!("Starting soundscape demo");

    let options = Options::from_args();
    let mut app = DemoApp::new(&options);
    app.initialize(&options.prefs_path);
    app.run();
    app.shutdown(&options.prefs_path);

    log::info!("Soundscape demo finished");
}

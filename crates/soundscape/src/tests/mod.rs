//! End-to-end scenarios against the headless device

use crate::ambiance::Weather;
use crate::config::AudioConfig;
use crate::error::AudioError;
use crate::music::Scene;
use crate::output::headless::rms;
use crate::output::{HeadlessBackend, HeadlessTap, MixerSource, OutputBackend};
use crate::system::SoundSystem;
use approx::assert_relative_eq;

const RATE: u32 = 8000;

/// Backend whose device never opens
pub(crate) struct FailingBackend;

impl OutputBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn start(&mut self, _source: MixerSource) -> Result<(), AudioError> {
        Err(AudioError::DeviceUnavailable("no device".to_string()))
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Backend that fails to open a set number of times, then works headless
pub(crate) struct FlakyBackend {
    failures_left: u32,
    inner: HeadlessBackend,
}

impl FlakyBackend {
    pub(crate) fn new(failures: u32) -> (Self, HeadlessTap) {
        let (inner, tap) = HeadlessBackend::new();
        (Self { failures_left: failures, inner }, tap)
    }
}

impl OutputBackend for FlakyBackend {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn start(&mut self, source: MixerSource) -> Result<(), AudioError> {
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(AudioError::DeviceUnavailable("not yet".to_string()));
        }
        self.inner.start(source)
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.inner.resume()
    }
}

fn system(seed: u64) -> (SoundSystem, HeadlessTap) {
    SoundSystem::headless(AudioConfig { sample_rate: RATE, ..AudioConfig::default() }, seed)
}

/// Advance the control thread and the render thread together
fn run(sound: &mut SoundSystem, tap: &HeadlessTap, seconds: f32) -> Vec<f32> {
    let frame = 0.05;
    let mut rendered = Vec::new();
    for _ in 0..(seconds / frame).round() as usize {
        sound.update(frame);
        rendered.extend(tap.render_seconds(frame, RATE));
    }
    rendered
}

#[test]
fn test_volume_sets_master_gain() {
    let (mut sound, _tap) = system(1);
    for v in [0.0, 0.1, 0.33, 0.5, 0.75, 1.0] {
        sound.set_volume(v);
        assert_eq!(sound.volume(), v);
        assert_eq!(sound.device().master_gain(), v);
    }
}

#[test]
fn test_double_toggle_restores_state() {
    let (mut sound, _tap) = system(2);
    sound.set_volume(0.42);
    let muted = sound.is_muted();
    sound.toggle_mute();
    sound.toggle_mute();
    assert_eq!(sound.is_muted(), muted);
    assert_eq!(sound.volume(), 0.42);
    assert_eq!(sound.device().master_gain(), 0.42);
}

#[test]
fn test_same_scene_twice_has_one_layer_set() {
    let (mut sound, tap) = system(3);
    sound.set_music_scene(Scene::City);
    sound.set_music_scene(Scene::City);
    run(&mut sound, &tap, 0.5);
    assert_eq!(sound.music().active_layers(), 3);
    assert_eq!(sound.music().fading_layers(), 0);
    assert_eq!(tap.node_count(), 3);
}

#[test]
fn test_scene_switch_leaves_only_new_layers() {
    let (mut sound, tap) = system(4);
    sound.set_music_scene(Scene::Trade);
    run(&mut sound, &tap, 0.5);
    let old = sound.music().layer_ids();

    sound.set_music_scene(Scene::Profile);
    run(&mut sound, &tap, 2.0);
    assert!(old.iter().all(|id| !sound.music().is_fading(*id)));
    assert_eq!(sound.music().fading_layers(), 0);
    assert_eq!(sound.music().active_layers(), 2);
    assert_eq!(tap.node_count(), 2);
}

#[test]
fn test_start_ambiance_twice_is_single_start() {
    let (mut sound, tap) = system(5);
    sound.start_ambiance();
    let bed = sound.ambiance().bed_ids();
    sound.start_ambiance();
    assert_eq!(sound.ambiance().bed_ids(), bed);
    assert_eq!(sound.pending_timers(), 1);
    tap.render(512);
    assert_eq!(tap.node_count(), 2);
}

#[test]
fn test_no_thunder_after_stop() {
    let (mut sound, tap) = system(6);
    sound.start_ambiance();
    sound.set_weather(Weather::Storm);
    sound.stop_ambiance();
    assert_eq!(sound.pending_timers(), 0);

    // Well past the longest first-thunder delay
    run(&mut sound, &tap, 30.0);
    assert_eq!(sound.ambiance().stats().thunder_claps, 0);
    assert_eq!(sound.ambiance().stats().sirens, 0);
    assert_eq!(tap.node_count(), 0);
}

#[test]
fn test_rain_twice_keeps_handles() {
    let (mut sound, _tap) = system(7);
    sound.start_ambiance();
    sound.set_weather(Weather::Rain);
    let layers = sound.ambiance().weather_layer_ids();
    assert_eq!(layers.len(), 1);
    sound.set_weather(Weather::Rain);
    assert_eq!(sound.ambiance().weather_layer_ids(), layers);
    assert_eq!(sound.fading_nodes(), 0);
}

#[test]
fn test_music_level_follows_master_and_music_volume() {
    let level = |volume: f32| {
        let (mut sound, tap) = system(8);
        sound.set_volume(volume);
        sound.set_music_scene(Scene::City);
        // Past the pad fade-in
        let samples = run(&mut sound, &tap, 3.0);
        rms(&samples[(2.5 * RATE as f32) as usize..])
    };

    let half = level(0.5);
    let full = level(1.0);
    assert!(half > 0.001, "city music should be audible");
    assert_relative_eq!(half / full, 0.5, epsilon = 1e-3);
}

#[test]
fn test_music_level_follows_music_volume() {
    let level = |music_volume: f32| {
        let (mut sound, tap) = system(12);
        sound.set_volume(0.5);
        sound.set_music_volume(music_volume);
        sound.set_music_scene(Scene::City);
        let samples = run(&mut sound, &tap, 3.0);
        rms(&samples[(2.5 * RATE as f32) as usize..])
    };

    let half = level(0.15);
    let full = level(0.3);
    assert!(half > 0.001, "city music should be audible");
    assert_relative_eq!(half / full, 0.5, epsilon = 1e-3);
}

#[test]
fn test_city_to_combat_within_one_fade() {
    let (mut sound, tap) = system(9);
    sound.set_volume(0.5);
    sound.set_music_scene(Scene::City);
    run(&mut sound, &tap, 2.5);
    let city = sound.music().layer_ids();

    sound.set_music_scene(Scene::Combat);
    let after = run(&mut sound, &tap, 2.0);
    assert!(city.iter().all(|id| !sound.music().is_fading(*id)));
    assert_eq!(tap.node_count(), 4);
    assert!(sound.music().layer_labels().contains(&"tremolo"));
    assert!(rms(&after[after.len() - RATE as usize / 2..]) > 0.001);
}

#[test]
fn test_storm_clear_stop_leaves_nothing() {
    let (mut sound, tap) = system(10);
    sound.start_ambiance();
    sound.set_weather(Weather::Storm);
    run(&mut sound, &tap, 8.0);
    sound.set_weather(Weather::Clear);
    run(&mut sound, &tap, 1.0);
    sound.stop_ambiance();

    assert_eq!(sound.active_nodes(), 0);
    assert_eq!(sound.pending_timers(), 0);

    run(&mut sound, &tap, 2.0);
    assert_eq!(sound.fading_nodes(), 0);
    assert_eq!(tap.node_count(), 0);
    assert!(tap.render(RATE as usize).iter().all(|s| *s == 0.0));
}

#[test]
fn test_mute_during_everything_is_silent() {
    let (mut sound, tap) = system(11);
    sound.set_volume(1.0);
    sound.set_music_scene(Scene::Combat);
    sound.start_ambiance();
    sound.set_weather(Weather::Rain);
    run(&mut sound, &tap, 1.0);

    sound.toggle_mute();
    tap.render(1024);
    sound.play_error_buzz();
    let muted = run(&mut sound, &tap, 1.0);
    assert!(muted.iter().all(|s| *s == 0.0));
}

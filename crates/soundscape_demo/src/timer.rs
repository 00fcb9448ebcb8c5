//! Frame pacing for the demo loop

use std::time::{Duration, Instant};

/// Fixed-rate frame clock
///
/// `tick` sleeps out whatever is left of the frame budget and reports the real
/// time that passed, which is what the sound system's `update` expects.
pub struct FrameClock {
    last_frame: Instant,
    frame_budget: Duration,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl FrameClock {
    /// Clock targeting `fps` frames per second
    pub fn new(fps: u32) -> Self {
        Self {
            last_frame: Instant::now(),
            frame_budget: Duration::from_secs_f32(1.0 / fps.max(1) as f32),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Length of one frame
    pub fn frame_budget(&self) -> Duration {
        self.frame_budget
    }

    /// Wait for the next frame and return the seconds since the last one
    pub fn tick(&mut self) -> f32 {
        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_budget {
            std::thread::sleep(self.frame_budget - elapsed);
        }
        let now = Instant::now();
        self.advance(now.duration_since(self.last_frame).as_secs_f32());
        self.last_frame = now;
        self.delta_time
    }

    /// Step the clock by a simulated frame without sleeping
    pub fn step(&mut self) -> f32 {
        self.advance(self.frame_budget.as_secs_f32());
        self.delta_time
    }

    fn advance(&mut self, delta_time: f32) {
        self.delta_time = delta_time;
        self.total_time += delta_time;
        self.frame_count += 1;
    }

    /// Seconds of the last frame
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Seconds since the clock started
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Frames so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Average frames per second since the clock started
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_advances_by_budget() {
        let mut clock = FrameClock::new(20);
        for _ in 0..10 {
            clock.step();
        }
        assert_eq!(clock.frame_count(), 10);
        assert!((clock.total_time() - 0.5).abs() < 1e-4);
        assert!((clock.average_fps() - 20.0).abs() < 0.01);
    }

    #[test]
    fn test_tick_waits_for_budget() {
        let mut clock = FrameClock::new(100);
        let dt = clock.tick();
        assert!(dt >= 0.009);
        assert_eq!(clock.delta_time(), dt);
    }

    #[test]
    fn test_zero_fps_is_clamped() {
        let clock = FrameClock::new(0);
        assert_eq!(clock.frame_budget(), Duration::from_secs(1));
        assert_eq!(clock.average_fps(), 0.0);
    }
}

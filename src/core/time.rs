//! Frame timing utilities

use std::time::{Duration, Instant};

/// Longest step handed to the simulation. Window drags and breakpoints can
/// stall a frame for seconds; integrating gravity over that would tunnel the
/// agent through the ground.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(100);

/// Tracks frame timing, elapsed time and FPS
pub struct FrameTimer {
    start: Instant,
    last_frame: Instant,
    delta: Duration,
    frame_count: u64,
    fps_timer: Instant,
    fps: f32,
    fps_frame_count: u32,
}

impl FrameTimer {
    /// Create a new frame timer
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_frame: now,
            delta: Duration::ZERO,
            frame_count: 0,
            fps_timer: now,
            fps: 0.0,
            fps_frame_count: 0,
        }
    }

    /// Call once per frame to update timing
    pub fn tick(&mut self) {
        let now = Instant::now();
        self.delta = (now - self.last_frame).min(MAX_FRAME_DELTA);
        self.last_frame = now;
        self.frame_count += 1;
        self.fps_frame_count += 1;

        // Update FPS every second
        let fps_elapsed = now - self.fps_timer;
        if fps_elapsed >= Duration::from_secs(1) {
            self.fps = self.fps_frame_count as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = 0;
            self.fps_timer = now;
        }
    }

    /// Get delta time in seconds (clamped to [`MAX_FRAME_DELTA`])
    pub fn delta_secs(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Seconds since the timer was created. Fed to kernels as `time`.
    pub fn elapsed_secs(&self) -> f32 {
        (self.last_frame - self.start).as_secs_f32()
    }

    /// Get current FPS (updated every second)
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Get total frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_advances_frame_count() {
        let mut timer = FrameTimer::new();
        assert_eq!(timer.frame_count(), 0);
        timer.tick();
        timer.tick();
        assert_eq!(timer.frame_count(), 2);
    }

    #[test]
    fn test_delta_is_clamped() {
        let mut timer = FrameTimer::new();
        timer.last_frame -= Duration::from_secs(5);
        timer.tick();
        assert!(timer.delta_secs() <= MAX_FRAME_DELTA.as_secs_f32() + 1e-6);
    }

    #[test]
    fn test_elapsed_is_monotonic() {
        let mut timer = FrameTimer::new();
        timer.tick();
        let a = timer.elapsed_secs();
        timer.tick();
        assert!(timer.elapsed_secs() >= a);
    }
}

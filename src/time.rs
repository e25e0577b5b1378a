//! Frame pacing for the windowed loop.
//!
//! The simulation is frame-stepped, not time-stepped: every
//! [`SimulationContext::step`](crate::SimulationContext::step) is one frame.
//! [`FrameClock`] turns wall-clock time into a whole number of frames to run
//! at the configured rate, so the canvas runs at the same speed on fast and
//! slow displays.
//!
//! ```ignore
//! let mut clock = FrameClock::new(60.0);
//!
//! // In the redraw handler:
//! for _ in 0..clock.tick() {
//!     sim.step(input.frame_input(canvas));
//! }
//! println!("FPS: {:.1}", clock.fps());
//! ```

use std::time::{Duration, Instant};

/// Most frames a single tick may ask for. A long stall (window drag,
/// breakpoint) is dropped rather than replayed.
const MAX_CATCH_UP: u32 = 5;

/// Fixed-rate frame pacing with pause support.
#[derive(Debug)]
pub struct FrameClock {
    /// Wall time of the last tick.
    last_tick: Instant,
    /// Length of one simulation frame.
    frame_time: Duration,
    /// Wall time not yet converted into frames.
    accumulator: Duration,
    /// Total frames handed out.
    frame_count: u64,
    /// Calculated FPS (updated periodically).
    fps: f32,
    fps_frame_count: u64,
    fps_window: Duration,
    /// How often to update FPS calculation.
    fps_update_interval: Duration,
    paused: bool,
}

impl FrameClock {
    /// Create a clock running at `frame_rate` frames per second.
    pub fn new(frame_rate: f32) -> Self {
        let rate = if frame_rate > 0.0 { frame_rate } else { 60.0 };
        Self {
            last_tick: Instant::now(),
            frame_time: Duration::from_nanos((1e9 / f64::from(rate)).round() as u64),
            accumulator: Duration::ZERO,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_window: Duration::ZERO,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
        }
    }

    /// Number of frames to run for the wall time since the last tick.
    pub fn tick(&mut self) -> u32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_tick);
        self.last_tick = now;
        self.advance(elapsed)
    }

    /// Number of frames to run for `elapsed` wall time.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if self.paused {
            return 0;
        }
        self.accumulator += elapsed;

        let mut frames = 0;
        while self.accumulator >= self.frame_time && frames < MAX_CATCH_UP {
            self.accumulator -= self.frame_time;
            frames += 1;
        }
        if frames == MAX_CATCH_UP {
            self.accumulator = Duration::ZERO;
        }
        self.frame_count += u64::from(frames);

        // Update FPS periodically
        self.fps_window += elapsed;
        if self.fps_window >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / self.fps_window.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_window = Duration::ZERO;
        }
        frames
    }

    /// Total frames handed out.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Simulation frames per second over the last measurement window.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Toggle pause state.
    ///
    /// Time spent paused is never replayed.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
        self.accumulator = Duration::ZERO;
        self.last_tick = Instant::now();
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new(60.0);
        assert_eq!(clock.frame(), 0);
        assert!(!clock.is_paused());
    }

    #[test]
    fn test_accumulates_partial_frames() {
        let mut clock = FrameClock::new(100.0);
        assert_eq!(clock.advance(Duration::from_millis(5)), 0);
        assert_eq!(clock.advance(Duration::from_millis(6)), 1);
        assert_eq!(clock.advance(Duration::from_millis(30)), 3);
        assert_eq!(clock.frame(), 4);
    }

    #[test]
    fn test_long_stall_is_capped() {
        let mut clock = FrameClock::new(60.0);
        assert_eq!(clock.advance(Duration::from_secs(3)), MAX_CATCH_UP);
        // The backlog is dropped, not replayed.
        assert_eq!(clock.advance(Duration::from_millis(1)), 0);
    }

    #[test]
    fn test_pause() {
        let mut clock = FrameClock::new(60.0);
        clock.toggle_pause();
        assert!(clock.is_paused());
        assert_eq!(clock.advance(Duration::from_secs(1)), 0);
        clock.toggle_pause();
        assert_eq!(clock.advance(Duration::from_millis(20)), 1);
    }

    #[test]
    fn test_fps_measurement() {
        let mut clock = FrameClock::new(50.0);
        for _ in 0..25 {
            clock.advance(Duration::from_millis(20));
        }
        assert!((clock.fps() - 50.0).abs() < 2.5, "fps {}", clock.fps());
    }
}

//! Frame timing for the host loop.
//!
//! The engine is driven by whoever owns the event loop. [`FrameLoop`] is
//! that owner's side: it measures the time between frames and carries a
//! [`StopHandle`] any thread can use to end the loop.
//!
//! # Example
//!
//! ```
//! use fogfx::time::FrameLoop;
//!
//! let mut frames = FrameLoop::new();
//! let stop = frames.stop_handle();
//!
//! assert!(frames.next_frame().is_some());
//! stop.stop();
//! assert!(frames.next_frame().is_none());
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Measures frame deltas.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frames: u64,
    fps_since: Instant,
    /// Used instead of the measured delta when set.
    fixed_delta: Option<f32>,
}

const FPS_WINDOW: Duration = Duration::from_millis(500);

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frames: 0,
            fps_since: now,
            fixed_delta: None,
        }
    }

    /// Start a new frame and return its delta in seconds.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let measured = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.delta_secs = self.fixed_delta.unwrap_or(measured);
        self.frame_count += 1;

        let window = now.duration_since(self.fps_since);
        if window >= FPS_WINDOW {
            self.fps = (self.frame_count - self.fps_frames) as f32 / window.as_secs_f32();
            self.fps_frames = self.frame_count;
            self.fps_since = now;
        }
        self.delta_secs
    }

    /// Forget the time spent since the last frame, e.g. after a suspend.
    pub fn skip_gap(&mut self) {
        self.last_frame = Instant::now();
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second over the last half second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Use a constant delta for every frame; `None` returns to measured time.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable switch that ends a [`FrameLoop`].
#[derive(Clone, Debug, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// The host-owned frame scheduler state.
#[derive(Debug, Default)]
pub struct FrameLoop {
    clock: FrameClock,
    stop: StopHandle,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Delta of the next frame, or `None` once the loop was stopped.
    pub fn next_frame(&mut self) -> Option<f32> {
        if self.stop.is_stopped() {
            return None;
        }
        Some(self.clock.tick())
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut FrameClock {
        &mut self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_measures_delta() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(10));
        let delta = clock.tick();

        assert!(delta >= 0.01);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_fixed_delta() {
        let mut clock = FrameClock::new();
        clock.set_fixed_delta(Some(1.0 / 60.0));
        thread::sleep(Duration::from_millis(50));

        assert!((clock.tick() - 1.0 / 60.0).abs() < 1e-6);
    }

    #[test]
    fn test_skip_gap_drops_suspended_time() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(50));
        clock.skip_gap();
        assert!(clock.tick() < 0.05);
    }

    #[test]
    fn test_stop_from_another_thread() {
        let mut frames = FrameLoop::new();
        let stop = frames.stop_handle();
        assert!(frames.next_frame().is_some());

        thread::spawn(move || stop.stop()).join().unwrap();

        assert!(frames.next_frame().is_none());
        assert!(frames.stop_handle().is_stopped());
        assert_eq!(frames.clock().frame(), 1);
    }
}

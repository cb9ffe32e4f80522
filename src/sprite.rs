//! Sprite-sheet animation clock for fog billboards.
//!
//! The fog texture is a 4x4 atlas of 16 frames. Each particle plays the
//! sheet from its own `offsetFrame` phase and cross-fades between the
//! current and the next frame; the vertex program picks the frames, the
//! engine feeds it the frame duration and the shared clock.

use crate::generator::SPRITE_FRAMES;

/// Timing of one looping sprite sheet.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteSheet {
    frames: u32,
    frame_duration_ms: f32,
}

impl SpriteSheet {
    /// Sheet with the standard 16 frames.
    ///
    /// A non-positive duration is clamped to 1 ms.
    pub fn new(frame_duration_ms: f32) -> Self {
        Self {
            frames: SPRITE_FRAMES,
            frame_duration_ms: sanitize(frame_duration_ms),
        }
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn frame_duration_ms(&self) -> f32 {
        self.frame_duration_ms
    }

    pub fn set_frame_duration_ms(&mut self, frame_duration_ms: f32) {
        self.frame_duration_ms = sanitize(frame_duration_ms);
    }

    /// Length of one full loop.
    pub fn cycle_ms(&self) -> f32 {
        self.frames as f32 * self.frame_duration_ms
    }

    /// Progress through the current frame, shared by every particle.
    pub fn fragment_time(&self, time_ms: f64) -> f32 {
        let duration = self.frame_duration_ms as f64;
        (time_ms.rem_euclid(duration) / duration) as f32
    }
}

impl Default for SpriteSheet {
    fn default() -> Self {
        Self::new(300.0)
    }
}

fn sanitize(frame_duration_ms: f32) -> f32 {
    if frame_duration_ms.is_finite() && frame_duration_ms > 0.0 {
        frame_duration_ms
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_time() {
        let sheet = SpriteSheet::new(300.0);
        assert_eq!(sheet.fragment_time(0.0), 0.0);
        assert!((sheet.fragment_time(450.0) - 0.5).abs() < 1e-6);
        assert!(sheet.fragment_time(1e9) < 1.0);
    }

    #[test]
    fn test_invalid_duration_is_clamped() {
        let mut sheet = SpriteSheet::new(0.0);
        assert_eq!(sheet.frame_duration_ms(), 1.0);
        sheet.set_frame_duration_ms(f32::NAN);
        assert_eq!(sheet.frame_duration_ms(), 1.0);
        assert_eq!(sheet.cycle_ms(), 16.0);
    }
}

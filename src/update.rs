//! Per-tick advancement of a fog field.
//!
//! Each tick, for every instance:
//!
//! 1. `size += speed_size_change`
//! 2. `position += velocity + force`
//! 3. `opacityDecrease -= opacity_coef`
//! 4. if `opacityDecrease <= 0.1` the particle respawns: it is moved next to
//!    the source point (when there is one), `size = 0`, `opacityDecrease = 1`.
//!
//! All rates are per *reference frame* of 1/60 s and scaled by the actual
//! tick length (see [`step_scale`]), so the fog evolves at the same speed at
//! any refresh rate. The transform, size and opacity arrays are flagged dirty
//! once per tick, after the loop.

use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::attributes::AttributeName;
use crate::system::ParticleSystem;

/// Opacity at or below which a particle respawns.
pub const RESPAWN_THRESHOLD: f32 = 0.1;

/// Length of the frame all per-tick rates are expressed in.
pub const REFERENCE_FRAME_SECS: f32 = 1.0 / 60.0;

/// Largest number of reference frames a single tick may advance.
pub const MAX_STEP_SCALE: f32 = 4.0;

/// Live tunables read by the update step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UpdateParams {
    /// Size growth per reference frame.
    pub speed_size_change: f32,
    /// Opacity loss per reference frame.
    pub opacity_coef: f32,
    /// Edge length of the cube around the source point respawned particles land in.
    pub spawn_spread: f32,
}

impl Default for UpdateParams {
    fn default() -> Self {
        Self {
            speed_size_change: 0.029,
            opacity_coef: 0.00999,
            spawn_spread: 0.3,
        }
    }
}

/// Per-tick input supplied by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Where respawned particles appear. `None` until the pointer has hit
    /// the ground at least once.
    pub source: Option<Vec3>,
    /// Constant displacement added to every particle each reference frame.
    pub force: Vec3,
}

/// What one update did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UpdateStats {
    /// Instances advanced.
    pub updated: usize,
    /// Instances moved to the source point.
    pub respawned: usize,
    /// Instances whose lifetime restarted without a source point to move to.
    pub respawned_in_place: usize,
    /// Reference frames this tick covered.
    pub step_scale: f32,
}

/// Convert a tick length in seconds into reference frames.
///
/// Non-finite or negative deltas count as zero; long stalls are capped at
/// [`MAX_STEP_SCALE`].
pub fn step_scale(delta_secs: f32) -> f32 {
    if delta_secs.is_finite() && delta_secs > 0.0 {
        (delta_secs / REFERENCE_FRAME_SECS).min(MAX_STEP_SCALE)
    } else {
        0.0
    }
}

/// Advances particle systems and owns the random source used for respawns.
#[derive(Debug)]
pub struct UpdateEngine<R = SmallRng> {
    rng: R,
}

impl UpdateEngine<SmallRng> {
    /// Engine with a reproducible random source.
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(SmallRng::seed_from_u64(seed))
    }

    /// Engine seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::with_rng(SmallRng::from_entropy())
    }
}

impl<R: Rng> UpdateEngine<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Random source, shared with the generator so one seed drives both.
    pub fn rng_mut(&mut self) -> &mut R {
        &mut self.rng
    }

    /// Advance every particle of `system` by one tick.
    ///
    /// Runs in O(n) and does not allocate.
    pub fn update(
        &mut self,
        system: &mut ParticleSystem,
        params: &UpdateParams,
        delta_secs: f32,
        input: &FrameInput,
    ) -> UpdateStats {
        let step = step_scale(delta_secs);
        let mut stats = UpdateStats {
            step_scale: step,
            ..Default::default()
        };

        let count = system.len();
        if count == 0 {
            return stats;
        }

        let size_step = params.speed_size_change * step;
        let opacity_step = params.opacity_coef * step;
        let drift = input.force * step;

        let store = system.store_mut();
        let lanes = store.update_lanes();

        for i in 0..count {
            let t = i * 16 + 12;
            let v = i * 3;

            lanes.size[i] += size_step;

            let velocity = Vec3::from_slice(&lanes.velocity[v..v + 3]);
            let mut position = Vec3::from_slice(&lanes.transform[t..t + 3]) + velocity * step + drift;

            let opacity = lanes.opacity[i] - opacity_step;
            if opacity <= RESPAWN_THRESHOLD {
                match input.source {
                    Some(source) => {
                        position = source + self.spawn_jitter(params.spawn_spread);
                        stats.respawned += 1;
                    }
                    None => stats.respawned_in_place += 1,
                }
                lanes.size[i] = 0.0;
                lanes.opacity[i] = 1.0;
            } else {
                lanes.opacity[i] = opacity;
            }

            position.write_to_slice(&mut lanes.transform[t..t + 3]);
        }

        store.mark_dirty(AttributeName::Transform);
        store.mark_dirty(AttributeName::Size);
        store.mark_dirty(AttributeName::OpacityDecrease);

        stats.updated = count;
        log::trace!(
            "fog update gen={} n={count} step={step:.3} respawned={} in_place={}",
            system.generation(),
            stats.respawned,
            stats.respawned_in_place
        );
        stats
    }

    fn spawn_jitter(&mut self, spread: f32) -> Vec3 {
        Vec3::new(
            self.rng.gen::<f32>() - 0.5,
            self.rng.gen::<f32>() - 0.5,
            self.rng.gen::<f32>() - 0.5,
        ) * spread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate, RotationMode};
    use crate::volume::BoundingVolume;

    const TICK: f32 = 0.016;

    fn field(density: f32, seed: u64) -> ParticleSystem {
        let mut rng = SmallRng::seed_from_u64(seed);
        let volume = BoundingVolume::new(1.0, 1.0, 1.0, Vec3::ZERO);
        generate(density, &volume, RotationMode::Identity, 0, &mut rng).unwrap()
    }

    #[test]
    fn test_step_scale() {
        assert!((step_scale(REFERENCE_FRAME_SECS) - 1.0).abs() < 1e-6);
        assert!((step_scale(0.016) - 0.96).abs() < 1e-5);
        assert_eq!(step_scale(10.0), MAX_STEP_SCALE);
        assert_eq!(step_scale(-1.0), 0.0);
        assert_eq!(step_scale(f32::NAN), 0.0);
    }

    #[test]
    fn test_integrates_velocity_and_force() {
        let mut system = field(1.0, 1);
        let store = system.store_mut();
        store.set_translation(0, Vec3::ZERO);
        store.set_vec3(AttributeName::Velocity, 0, Vec3::new(0.01, 0.0, -0.01));
        store.set_scalar(AttributeName::OpacityDecrease, 0, 0.9);
        store.set_scalar(AttributeName::Size, 0, 0.2);

        let mut engine = UpdateEngine::from_seed(0);
        let input = FrameInput {
            source: Some(Vec3::ZERO),
            force: Vec3::new(0.0, 0.02, 0.0),
        };
        let params = UpdateParams::default();
        engine.update(&mut system, &params, REFERENCE_FRAME_SECS, &input);

        let store = system.store();
        let p = store.translation(0);
        assert!((p - Vec3::new(0.01, 0.02, -0.01)).abs().max_element() < 1e-6);
        assert!((store.get_scalar(AttributeName::Size, 0) - (0.2 + 0.029)).abs() < 1e-6);
        assert!((store.get_scalar(AttributeName::OpacityDecrease, 0) - (0.9 - 0.00999)).abs() < 1e-6);
    }

    #[test]
    fn test_respawn_at_source() {
        let mut system = field(1.0, 2);
        let store = system.store_mut();
        store.set_scalar(AttributeName::OpacityDecrease, 0, RESPAWN_THRESHOLD - 1e-4);
        store.set_scalar(AttributeName::Size, 0, 3.0);
        store.set_translation(0, Vec3::splat(100.0));

        let source = Vec3::new(1.0, 0.5, -1.0);
        let params = UpdateParams::default();
        let mut engine = UpdateEngine::from_seed(9);
        let stats = engine.update(
            &mut system,
            &params,
            TICK,
            &FrameInput { source: Some(source), force: Vec3::ZERO },
        );

        let store = system.store();
        assert_eq!(stats.respawned, 1);
        assert_eq!(store.get_scalar(AttributeName::OpacityDecrease, 0), 1.0);
        assert_eq!(store.get_scalar(AttributeName::Size, 0), 0.0);
        let offset = (store.translation(0) - source).abs();
        assert!(offset.max_element() <= params.spawn_spread / 2.0);
    }

    #[test]
    fn test_missing_source_restarts_lifetime_in_place() {
        let mut system = field(1.0, 3);
        let store = system.store_mut();
        store.set_scalar(AttributeName::OpacityDecrease, 0, 0.05);
        store.set_translation(0, Vec3::new(2.0, 2.0, 2.0));
        store.set_vec3(AttributeName::Velocity, 0, Vec3::ZERO);

        let mut engine = UpdateEngine::from_seed(0);
        let stats = engine.update(&mut system, &UpdateParams::default(), TICK, &FrameInput::default());

        let store = system.store();
        assert_eq!(stats.respawned, 0);
        assert_eq!(stats.respawned_in_place, 1);
        assert_eq!(store.translation(0), Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(store.get_scalar(AttributeName::OpacityDecrease, 0), 1.0);
        assert_eq!(store.get_scalar(AttributeName::Size, 0), 0.0);
    }

    #[test]
    fn test_opacity_stays_in_unit_range() {
        let mut system = field(500.0, 4);
        let mut engine = UpdateEngine::from_seed(4);
        let params = UpdateParams {
            opacity_coef: 0.3,
            ..Default::default()
        };
        let input = FrameInput {
            source: Some(Vec3::ZERO),
            force: Vec3::new(0.001, 0.0, 0.0),
        };

        for _ in 0..500 {
            engine.update(&mut system, &params, TICK, &input);
            let opacity = system.store().data(AttributeName::OpacityDecrease);
            assert!(opacity.iter().all(|o| (0.0..=1.0).contains(o)));
        }
    }

    #[test]
    fn test_marks_touched_buffers_dirty_once() {
        let mut system = field(10.0, 5);
        let mut engine = UpdateEngine::from_seed(5);
        engine.update(&mut system, &UpdateParams::default(), TICK, &FrameInput::default());

        let dirty = system.store_mut().take_dirty();
        assert_eq!(dirty.len(), 3);
        assert!(dirty.contains(AttributeName::Transform));
        assert!(dirty.contains(AttributeName::Size));
        assert!(dirty.contains(AttributeName::OpacityDecrease));
        assert!(!dirty.contains(AttributeName::Velocity));
    }

    #[test]
    fn test_zero_delta_freezes_motion() {
        let mut system = field(20.0, 6);
        let before = system.store().data(AttributeName::Transform).to_vec();
        let opacity_before = system.store().data(AttributeName::OpacityDecrease).to_vec();
        let mut engine = UpdateEngine::from_seed(6);
        engine.update(&mut system, &UpdateParams::default(), 0.0, &FrameInput::default());

        // Only particles already at the threshold restart
        for i in 0..system.len() {
            if opacity_before[i] > RESPAWN_THRESHOLD {
                assert_eq!(&system.store().data(AttributeName::Transform)[i * 16..i * 16 + 16], &before[i * 16..i * 16 + 16]);
            }
        }
    }

    #[test]
    fn test_empty_system_is_noop() {
        let mut system = field(0.0, 7);
        let mut engine = UpdateEngine::from_seed(7);
        let stats = engine.update(&mut system, &UpdateParams::default(), TICK, &FrameInput::default());
        assert_eq!(stats.updated, 0);
        assert!(system.store().dirty().is_empty());
    }
}

//! Stochastic placement of fog particles inside a bounding volume.
//!
//! Generation is always a full rebuild: a new [`ParticleSystem`] with fresh
//! arrays is produced and the caller swaps it in. Nothing is reused from the
//! previous generation.
//!
//! Positions are sampled uniformly in the box and then softly pulled towards
//! the middle: an axis offset that lands beyond roughly `dimension / 2.5` is
//! nudged by a random amount in `(-0.5, 0.5]`. The threshold itself is
//! jittered, so the occasional particle still ends up outside the nominal
//! box. That is intended; it keeps the edges of the fog ragged.

use glam::{EulerRot, Mat4, Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::attributes::{AttributeName, AttributeStore};
use crate::error::Result;
use crate::system::ParticleSystem;
use crate::volume::BoundingVolume;

/// Number of frames in the fog sprite sheet.
pub const SPRITE_FRAMES: u32 = 16;

/// Exclusive upper bound of `offsetFrame`.
pub const OFFSET_FRAME_RANGE: u32 = 50 * SPRITE_FRAMES;

/// Largest absolute initial velocity component.
pub const MAX_INITIAL_SPEED: f32 = 0.01;

/// How instance transforms are oriented.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMode {
    /// Every billboard faces the same way.
    #[default]
    Identity,
    /// Random pitch and yaw per billboard, no roll.
    Random,
}

/// Build a new particle field.
///
/// `numberOfInstances = floor(density * height * width * depth)`; any zero
/// factor yields an empty system. Negative or non-finite inputs are rejected
/// before anything is allocated.
///
/// Per instance:
/// - `size` in `[0, 1)`
/// - `opacityDecrease` in `[0, 1)`
/// - each velocity component in `[-0.01, 0.01)`
/// - `offsetFrame` an integer in `[0, 800)`
/// - unit scale, rotation per `rotation`
pub fn generate<R: Rng + ?Sized>(
    density: f32,
    volume: &BoundingVolume,
    rotation: RotationMode,
    generation: u64,
    rng: &mut R,
) -> Result<ParticleSystem> {
    let count = volume.instance_count(density)?;
    let mut store = AttributeStore::new(count, generation);

    for i in 0..count {
        let offset = sample_offset(volume, rng);
        let orientation = match rotation {
            RotationMode::Identity => Quat::IDENTITY,
            RotationMode::Random => {
                let pitch = random_angle(rng);
                let yaw = random_angle(rng);
                Quat::from_euler(EulerRot::XYZ, pitch, yaw, 0.0)
            }
        };
        let transform = Mat4::from_scale_rotation_translation(Vec3::ONE, orientation, volume.origin + offset);
        store.set_transform(i, &transform);

        store.set_scalar(AttributeName::Size, i, rng.gen::<f32>());
        store.set_scalar(AttributeName::OpacityDecrease, i, rng.gen::<f32>());
        let velocity = Vec3::new(
            (rng.gen::<f32>() - 0.5) * 2.0 * MAX_INITIAL_SPEED,
            (rng.gen::<f32>() - 0.5) * 2.0 * MAX_INITIAL_SPEED,
            (rng.gen::<f32>() - 0.5) * 2.0 * MAX_INITIAL_SPEED,
        );
        store.set_vec3(AttributeName::Velocity, i, velocity);
        let offset_frame = (rng.gen::<f32>() * OFFSET_FRAME_RANGE as f32).floor();
        store.set_scalar(
            AttributeName::OffsetFrame,
            i,
            offset_frame.min((OFFSET_FRAME_RANGE - 1) as f32),
        );
    }

    log::debug!(
        "generated fog field gen={generation} instances={count} volume={:?} density={density}",
        volume
    );
    Ok(ParticleSystem::new(store, *volume, density, rotation))
}

/// Offset from the origin for one particle, soft-clamped per axis.
fn sample_offset<R: Rng + ?Sized>(volume: &BoundingVolume, rng: &mut R) -> Vec3 {
    let x = (rng.gen::<f32>() - 0.5) * volume.width;
    let y = rng.gen::<f32>() * volume.height;
    let z = (rng.gen::<f32>() - 0.5) * volume.depth;

    // x and z are mirrored through the origin, y grows upwards
    Vec3::new(
        soft_clamp(-x, volume.width, rng),
        soft_clamp(y, volume.height, rng),
        soft_clamp(-z, volume.depth, rng),
    )
}

fn soft_clamp<R: Rng + ?Sized>(distance: f32, dimension: f32, rng: &mut R) -> f32 {
    let threshold = dimension / 2.5 - rng.gen::<f32>() - 0.5;
    if distance.abs() > threshold {
        distance - (rng.gen::<f32>() - 0.5)
    } else {
        distance
    }
}

/// `r1 / (r2 - 0.5)`, zero when the denominator vanishes.
fn random_angle<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    let numerator = rng.gen::<f32>();
    let denominator = rng.gen::<f32>() - 0.5;
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FogError;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn unit_volume() -> BoundingVolume {
        BoundingVolume::new(1.0, 1.0, 1.0, Vec3::ZERO)
    }

    #[test]
    fn test_counts_match_product() {
        let mut rng = SmallRng::seed_from_u64(1);
        let volume = BoundingVolume::new(2.0, 3.0, 0.5, Vec3::ZERO);
        let system = generate(10.0, &volume, RotationMode::Identity, 0, &mut rng).unwrap();
        assert_eq!(system.len(), 30);
        for name in AttributeName::ALL {
            assert_eq!(system.store().data(name).len(), 30 * name.components());
        }
    }

    #[test]
    fn test_zero_dimension_gives_empty_system() {
        let mut rng = SmallRng::seed_from_u64(1);
        let volume = BoundingVolume::new(1.0, 0.0, 1.0, Vec3::ZERO);
        let system = generate(50.0, &volume, RotationMode::Identity, 0, &mut rng).unwrap();
        assert!(system.is_empty());
    }

    #[test]
    fn test_negative_density_rejected() {
        let mut rng = SmallRng::seed_from_u64(1);
        let result = generate(-1.0, &unit_volume(), RotationMode::Identity, 0, &mut rng);
        assert!(matches!(result, Err(FogError::InvalidDimension { field: "density", .. })));
    }

    #[test]
    fn test_initial_values_in_range() {
        let mut rng = SmallRng::seed_from_u64(7);
        let system = generate(2000.0, &unit_volume(), RotationMode::Identity, 0, &mut rng).unwrap();
        let store = system.store();

        for i in 0..system.len() {
            let size = store.get_scalar(AttributeName::Size, i);
            assert!((0.0..1.0).contains(&size));

            let opacity = store.get_scalar(AttributeName::OpacityDecrease, i);
            assert!((0.0..1.0).contains(&opacity));

            let v = store.get_vec3(AttributeName::Velocity, i);
            assert!(v.abs().max_element() <= MAX_INITIAL_SPEED);

            let frame = store.get_scalar(AttributeName::OffsetFrame, i);
            assert_eq!(frame, frame.floor());
            assert!((0.0..OFFSET_FRAME_RANGE as f32).contains(&frame));
        }
    }

    #[test]
    fn test_positions_stay_near_box() {
        let mut rng = SmallRng::seed_from_u64(3);
        let origin = Vec3::new(5.0, 1.0, -2.0);
        let volume = BoundingVolume::new(2.0, 4.0, 4.0, origin);
        let system = generate(50.0, &volume, RotationMode::Identity, 0, &mut rng).unwrap();

        // The soft clamp moves a point by at most 0.5 per axis
        for i in 0..system.len() {
            let offset = system.store().translation(i) - origin;
            assert!(offset.x.abs() <= 2.0 + 0.5);
            assert!(offset.z.abs() <= 2.0 + 0.5);
            assert!(offset.y >= -0.5 && offset.y <= 2.0 + 0.5);
        }
    }

    #[test]
    fn test_mean_position_near_center() {
        let mut rng = SmallRng::seed_from_u64(11);
        let volume = BoundingVolume::new(2.0, 2.0, 2.0, Vec3::ZERO);
        let system = generate(1000.0, &volume, RotationMode::Identity, 0, &mut rng).unwrap();

        let sum: Vec3 = (0..system.len()).map(|i| system.store().translation(i)).sum();
        let mean = sum / system.len() as f32;
        assert!(mean.x.abs() < 0.05, "mean x = {}", mean.x);
        assert!(mean.z.abs() < 0.05, "mean z = {}", mean.z);
        assert!((mean.y - 1.0).abs() < 0.1, "mean y = {}", mean.y);
    }

    #[test]
    fn test_same_seed_same_field() {
        let volume = unit_volume();
        let a = generate(64.0, &volume, RotationMode::Random, 0, &mut SmallRng::seed_from_u64(99)).unwrap();
        let b = generate(64.0, &volume, RotationMode::Random, 0, &mut SmallRng::seed_from_u64(99)).unwrap();
        for name in AttributeName::ALL {
            assert_eq!(a.store().data(name), b.store().data(name));
        }
    }

    #[test]
    fn test_identity_rotation_has_unit_basis() {
        let mut rng = SmallRng::seed_from_u64(5);
        let system = generate(8.0, &unit_volume(), RotationMode::Identity, 0, &mut rng).unwrap();
        let m = system.store().transform(0);
        assert_eq!(m.x_axis.truncate(), Vec3::X);
        assert_eq!(m.y_axis.truncate(), Vec3::Y);
        assert_eq!(m.z_axis.truncate(), Vec3::Z);
    }

    #[test]
    fn test_random_rotation_keeps_unit_scale() {
        let mut rng = SmallRng::seed_from_u64(5);
        let system = generate(32.0, &unit_volume(), RotationMode::Random, 0, &mut rng).unwrap();
        for i in 0..system.len() {
            let (scale, _, _) = system.store().transform(i).to_scale_rotation_translation();
            assert!((scale - Vec3::ONE).abs().max_element() < 1e-4);
        }
    }
}

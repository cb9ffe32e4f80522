//! Spawn region for a fog field.

use glam::Vec3;

use crate::error::{FogError, Result};

/// Largest particle count a single field may hold.
pub const MAX_INSTANCES: usize = 4_194_304;

/// Box the generator scatters particles in.
///
/// The box spans `[-width/2, width/2] x [0, height] x [-depth/2, depth/2]`
/// relative to `origin`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingVolume {
    pub height: f32,
    pub width: f32,
    pub depth: f32,
    pub origin: Vec3,
}

impl BoundingVolume {
    pub fn new(height: f32, width: f32, depth: f32, origin: Vec3) -> Self {
        Self { height, width, depth, origin }
    }

    /// Reject negative or non-finite dimensions.
    pub fn validate(&self) -> Result<()> {
        check_dimension("height", self.height)?;
        check_dimension("width", self.width)?;
        check_dimension("depth", self.depth)?;
        if !self.origin.is_finite() {
            return Err(FogError::InvalidConfig {
                field: "origin",
                reason: format!("{} is not finite", self.origin),
            });
        }
        Ok(())
    }

    /// `floor(density * height * width * depth)`.
    ///
    /// Any zero factor yields an empty field. Fails on negative inputs or
    /// when the count exceeds [`MAX_INSTANCES`].
    pub fn instance_count(&self, density: f32) -> Result<usize> {
        check_dimension("density", density)?;
        self.validate()?;

        let count = (density as f64 * self.height as f64 * self.width as f64 * self.depth as f64).floor();
        if count > MAX_INSTANCES as f64 {
            return Err(FogError::InvalidConfig {
                field: "density",
                reason: format!("{count} instances exceeds the limit of {MAX_INSTANCES}"),
            });
        }
        Ok(count as usize)
    }

    /// Size along x, y, z.
    pub fn extent(&self) -> Vec3 {
        Vec3::new(self.width, self.height, self.depth)
    }
}

impl Default for BoundingVolume {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, Vec3::new(0.0, 0.5, 0.0))
    }
}

pub(crate) fn check_dimension(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FogError::InvalidDimension { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_count_truncates() {
        let volume = BoundingVolume::new(0.5, 1.0, 1.0, Vec3::ZERO);
        assert_eq!(volume.instance_count(15.0).unwrap(), 7);
    }

    #[test]
    fn test_zero_dimension_is_empty_not_error() {
        let volume = BoundingVolume::new(0.0, 2.0, 2.0, Vec3::ZERO);
        assert_eq!(volume.instance_count(100.0).unwrap(), 0);
        assert_eq!(BoundingVolume::default().instance_count(0.0).unwrap(), 0);
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let volume = BoundingVolume::new(1.0, -1.0, 1.0, Vec3::ZERO);
        assert_eq!(
            volume.instance_count(10.0),
            Err(FogError::InvalidDimension { field: "width", value: -1.0 })
        );
        assert!(matches!(
            BoundingVolume::default().instance_count(-2.0),
            Err(FogError::InvalidDimension { field: "density", .. })
        ));
    }

    #[test]
    fn test_nan_rejected() {
        let volume = BoundingVolume::new(f32::NAN, 1.0, 1.0, Vec3::ZERO);
        assert!(volume.validate().is_err());
    }

    #[test]
    fn test_too_many_instances_rejected() {
        let volume = BoundingVolume::new(100.0, 100.0, 100.0, Vec3::ZERO);
        assert!(matches!(
            volume.instance_count(10.0),
            Err(FogError::InvalidConfig { field: "density", .. })
        ));
    }
}

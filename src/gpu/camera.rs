//! Orbit camera and pointer picking.

use glam::{Mat4, Vec2, Vec3};

use crate::depth::CameraPlanes;

/// Orbit camera for viewing the fog scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Vertical field of view in radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
}

/// A half-line in world space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length.
    pub direction: Vec3,
}

impl Ray {
    /// Where the ray crosses the horizontal plane `y = height`, if in front of the origin.
    pub fn hit_plane_y(&self, height: f32) -> Option<Vec3> {
        if self.direction.y.abs() < 1e-6 {
            return None;
        }
        let t = (height - self.origin.y) / self.direction.y;
        (t >= 0.0).then(|| self.origin + self.direction * t)
    }
}

impl Camera {
    pub fn new() -> Self {
        Self {
            yaw: 0.98,
            pitch: 0.6,
            distance: 3.2,
            target: Vec3::new(0.0, 0.2, 0.0),
            fov_y: 45.0_f32.to_radians(),
            near: 0.1,
            far: 100.0,
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, aspect.max(1e-3), self.near, self.far)
    }

    pub fn view_proj(&self, aspect: f32) -> Mat4 {
        self.projection(aspect) * self.view_matrix()
    }

    pub fn planes(&self) -> CameraPlanes {
        CameraPlanes {
            near: self.near,
            far: self.far,
        }
    }

    /// Rotate around the target by a pointer drag in pixels.
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.yaw -= dx * 0.005;
        self.pitch = (self.pitch + dy * 0.005).clamp(-1.5, 1.5);
    }

    /// Move towards (positive) or away from the target.
    pub fn zoom(&mut self, amount: f32) {
        self.distance = (self.distance * (1.0 - amount * 0.1)).clamp(0.5, 50.0);
    }

    /// Ray through a point in normalized device coordinates (`[-1, 1]`, y up).
    pub fn ray_from_ndc(&self, ndc: Vec2, aspect: f32) -> Ray {
        let inverse = self.view_proj(aspect).inverse();
        let near = inverse.project_point3(ndc.extend(0.0));
        let far = inverse.project_point3(ndc.extend(1.0));
        Ray {
            origin: near,
            direction: (far - near).normalize_or_zero(),
        }
    }

    /// Ground point under the pointer, or `None` when the pointer looks past the ground.
    pub fn pick_ground(&self, ndc: Vec2, aspect: f32, ground_height: f32) -> Option<Vec3> {
        self.ray_from_ndc(ndc, aspect).hit_plane_y(ground_height)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

/// Pointer position in pixels to normalized device coordinates.
pub fn pixel_to_ndc(x: f64, y: f64, width: u32, height: u32) -> Vec2 {
    let w = width.max(1) as f64;
    let h = height.max(1) as f64;
    Vec2::new((x / w * 2.0 - 1.0) as f32, (1.0 - y / h * 2.0) as f32)
}

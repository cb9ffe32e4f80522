//! Fixed-schema uniform values for the fog and water materials.
//!
//! Materials are not bags of named values. Every uniform the core can set is
//! a variant of [`Uniform`], and each GPU program has a matching `#[repr(C)]`
//! block ([`FogUniforms`], [`WaterUniforms`]) that knows which variants it
//! consumes.
//!
//! # Example
//!
//! ```
//! use fogfx::uniforms::{FogUniforms, Uniform};
//! use glam::Vec3;
//!
//! let mut block = FogUniforms::default();
//! assert!(block.apply(&Uniform::Opacity(0.5)));
//! assert!(block.apply(&Uniform::Color(Vec3::new(0.1, 0.4, 1.0))));
//! assert_eq!(block.color[3], 0.5);
//!
//! // Water-only uniforms are ignored by the fog block
//! assert!(!block.apply(&Uniform::CameraFar(100.0)));
//! ```

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

/// Opaque handle of a depth texture owned by a [`SceneRenderer`](crate::depth::SceneRenderer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u64);

/// Every uniform the core pushes to a render surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Uniform {
    /// Animation clock in milliseconds (`uTime`).
    Time(f32),
    /// Blend factor between the current and next sprite frame (`uFragmentTime`).
    FragmentTime(f32),
    /// Milliseconds per sprite frame (`uFrameDuration`).
    FrameDuration(f32),
    /// Base color (`uColor`).
    Color(Vec3),
    /// Core color of young fog particles (`uInnerColor`).
    InnerColor(Vec3),
    /// Global opacity multiplier (`uOpacity`).
    Opacity(f32),
    /// External force currently applied (`uForce`).
    Force(Vec3),
    /// Camera near plane (`cameraNear`).
    CameraNear(f32),
    /// Camera far plane (`cameraFar`).
    CameraFar(f32),
    /// Depth texture of the scene behind the surface (`tDepth`).
    DepthTexture(TextureId),
    /// Foam color closest to the shore line (`uFoamColor1`).
    FoamColor1(Vec3),
    /// Foam band body color (`uFoamColor2`).
    FoamColor2(Vec3),
    /// Outer foam color (`uFoamColor3`).
    FoamColor3(Vec3),
}

impl Uniform {
    /// Name the GPU program declares.
    pub fn name(&self) -> &'static str {
        match self {
            Uniform::Time(_) => "uTime",
            Uniform::FragmentTime(_) => "uFragmentTime",
            Uniform::FrameDuration(_) => "uFrameDuration",
            Uniform::Color(_) => "uColor",
            Uniform::InnerColor(_) => "uInnerColor",
            Uniform::Opacity(_) => "uOpacity",
            Uniform::Force(_) => "uForce",
            Uniform::CameraNear(_) => "cameraNear",
            Uniform::CameraFar(_) => "cameraFar",
            Uniform::DepthTexture(_) => "tDepth",
            Uniform::FoamColor1(_) => "uFoamColor1",
            Uniform::FoamColor2(_) => "uFoamColor2",
            Uniform::FoamColor3(_) => "uFoamColor3",
        }
    }
}

/// Uniform block of the fog billboard program.
///
/// Layout matches `struct FogUniforms` in `fog.wgsl`; vec3 values travel in
/// the xyz of a vec4 so every field stays 16-byte aligned.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct FogUniforms {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    /// rgb = `uColor`, a = `uOpacity`.
    pub color: [f32; 4],
    /// rgb = `uInnerColor`.
    pub inner_color: [f32; 4],
    /// xyz = `uForce`.
    pub force: [f32; 4],
    pub time: f32,
    pub fragment_time: f32,
    pub frame_duration: f32,
    pub _padding: f32,
}

impl Default for FogUniforms {
    fn default() -> Self {
        Self {
            view: Mat4::IDENTITY.to_cols_array_2d(),
            proj: Mat4::IDENTITY.to_cols_array_2d(),
            color: [0.102, 0.459, 1.0, 0.9],
            inner_color: [1.0, 0.808, 0.0, 0.0],
            force: [0.0; 4],
            time: 0.0,
            fragment_time: 0.0,
            frame_duration: 16.0,
            _padding: 0.0,
        }
    }
}

impl FogUniforms {
    /// Store a uniform if this program uses it. Returns whether it did.
    pub fn apply(&mut self, uniform: &Uniform) -> bool {
        match *uniform {
            Uniform::Time(v) => self.time = v,
            Uniform::FragmentTime(v) => self.fragment_time = v,
            Uniform::FrameDuration(v) => self.frame_duration = v,
            Uniform::Color(c) => set_rgb(&mut self.color, c),
            Uniform::InnerColor(c) => set_rgb(&mut self.inner_color, c),
            Uniform::Opacity(v) => self.color[3] = v,
            Uniform::Force(f) => set_rgb(&mut self.force, f),
            _ => return false,
        }
        true
    }

    pub fn set_camera(&mut self, view: Mat4, proj: Mat4) {
        self.view = view.to_cols_array_2d();
        self.proj = proj.to_cols_array_2d();
    }
}

/// Uniform block of the water surface program.
///
/// Layout matches `struct WaterUniforms` in `water.wgsl`. The depth texture
/// itself is bound separately.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct WaterUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub foam_color1: [f32; 4],
    pub foam_color2: [f32; 4],
    pub foam_color3: [f32; 4],
    pub camera_near: f32,
    pub camera_far: f32,
    pub time: f32,
    pub _padding: f32,
}

impl Default for WaterUniforms {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            color: [0.557, 0.706, 0.902, 1.0],
            foam_color1: [0.761, 0.890, 1.0, 1.0],
            foam_color2: [0.902, 0.965, 1.0, 1.0],
            foam_color3: [0.0, 0.0, 0.004, 1.0],
            camera_near: 0.1,
            camera_far: 100.0,
            time: 0.0,
            _padding: 0.0,
        }
    }
}

impl WaterUniforms {
    /// Store a uniform if this program uses it. Returns whether it did.
    pub fn apply(&mut self, uniform: &Uniform) -> bool {
        match *uniform {
            Uniform::Time(v) => self.time = v,
            Uniform::Color(c) => set_rgb(&mut self.color, c),
            Uniform::FoamColor1(c) => set_rgb(&mut self.foam_color1, c),
            Uniform::FoamColor2(c) => set_rgb(&mut self.foam_color2, c),
            Uniform::FoamColor3(c) => set_rgb(&mut self.foam_color3, c),
            Uniform::CameraNear(v) => self.camera_near = v,
            Uniform::CameraFar(v) => self.camera_far = v,
            _ => return false,
        }
        true
    }
}

fn set_rgb(slot: &mut [f32; 4], value: Vec3) {
    slot[0] = value.x;
    slot[1] = value.y;
    slot[2] = value.z;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<FogUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<WaterUniforms>() % 16, 0);
        assert_eq!(std::mem::size_of::<FogUniforms>(), 64 * 2 + 16 * 3 + 16);
        assert_eq!(std::mem::size_of::<WaterUniforms>(), 64 * 2 + 16 * 4 + 16);
    }

    #[test]
    fn test_water_block_takes_depth_planes() {
        let mut block = WaterUniforms::default();
        assert!(block.apply(&Uniform::CameraNear(0.5)));
        assert!(block.apply(&Uniform::CameraFar(50.0)));
        assert!(!block.apply(&Uniform::DepthTexture(TextureId(3))));
        assert!(!block.apply(&Uniform::Opacity(0.2)));
        assert_eq!((block.camera_near, block.camera_far), (0.5, 50.0));
    }

    #[test]
    fn test_opacity_shares_color_alpha() {
        let mut block = FogUniforms::default();
        block.apply(&Uniform::Opacity(0.25));
        block.apply(&Uniform::Color(Vec3::ONE));
        assert_eq!(block.color, [1.0, 1.0, 1.0, 0.25]);
    }

    #[test]
    fn test_names() {
        assert_eq!(Uniform::DepthTexture(TextureId(1)).name(), "tDepth");
        assert_eq!(Uniform::FragmentTime(0.5).name(), "uFragmentTime");
        assert_eq!(Uniform::CameraNear(0.1).name(), "cameraNear");
    }
}

//! WGSL programs and the vertex/uniform layouts that feed them.
//!
//! Fog and water uniform blocks live in [`crate::uniforms`]; the terrain is
//! backend scenery and keeps its layouts here.

use bytemuck::{Pod, Zeroable};

pub const FOG_SHADER: &str = include_str!("fog.wgsl");
pub const WATER_SHADER: &str = include_str!("water.wgsl");
pub const TERRAIN_SHADER: &str = include_str!("terrain.wgsl");

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct TerrainUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub light_dir: [f32; 4],
}

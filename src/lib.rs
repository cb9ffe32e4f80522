//! # fogfx - volumetric fog particles
//!
//! A field of camera-facing fog sprites inside a bounding box, simulated on
//! the CPU and drawn with instancing, plus a depth-compositing pipeline that
//! lets a transparent surface (water) foam where it meets the scene.
//!
//! ## Quick Start
//!
//! ```
//! use fogfx::prelude::*;
//!
//! let config = FogConfig {
//!     density: 10.0,
//!     seed: Some(7),
//!     ..Default::default()
//! };
//! let mut engine = FogEngine::new(config).unwrap();
//!
//! let input = FrameInput {
//!     source: Some(Vec3::ZERO),
//!     force: Vec3::ZERO,
//! };
//! for _ in 0..10 {
//!     let commands = engine.tick(1.0 / 60.0, &input);
//!     assert_eq!(commands.generation(), engine.generation());
//! }
//! assert_eq!(engine.system().len(), 10);
//! ```
//!
//! ## Core Concepts
//!
//! ### Attribute buffers
//!
//! Every particle is a row across five parallel `f32` arrays
//! ([`AttributeName`]): a 4x4 transform, a velocity, a size, an opacity
//! decrease rate and a sprite frame offset. [`AttributeStore`] owns them and
//! tracks which ones changed since the last upload.
//!
//! ### Generation and update
//!
//! [`generate`] fills a [`BoundingVolume`] with `floor(density * volume)`
//! particles. [`UpdateEngine`] advances them: particles drift, grow and fade,
//! and once faded out are respawned at the pointer's ground position.
//!
//! ### Rendering
//!
//! The engine never touches a GPU. [`FogEngine::tick`] returns
//! [`RenderCommands`] that a [`RenderSurface`] plays back; the
//! [`gpu`] module has the wgpu implementation. [`DepthCompositor`] drives a
//! [`SceneRenderer`] through the hide / pre-pass / restore / sample / final
//! sequence each frame.
//!
//! ## Configuration
//!
//! [`FogConfig`] and [`WaterConfig`] are serde structs with defaults for
//! every field; [`DemoConfig`] saves and loads both as a JSON preset.
//! [`ConfigPatch`] changes a running engine, all or nothing.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade. The demo binary installs
//! `env_logger`; set `RUST_LOG=fogfx=debug` to see regeneration and depth
//! target events.

pub mod attributes;
pub mod config;
pub mod depth;
pub mod engine;
pub mod error;
pub mod generator;
pub mod gpu;
pub mod shader;
pub mod sprite;
pub mod surface;
pub mod system;
pub mod time;
pub mod uniforms;
pub mod update;
pub mod volume;

pub use bytemuck;
pub use glam::{Vec2, Vec3, Vec4};

pub use attributes::{AttributeName, AttributeSet, AttributeStore};
pub use config::{Color, ConfigChange, ConfigPatch, DemoConfig, FogConfig, WaterConfig};
pub use depth::{
    CameraPlanes, CompositeStage, DepthCompositor, DepthTarget, FrameOutcome, SceneRenderer, Viewport,
};
pub use engine::FogEngine;
pub use error::{FogError, RenderError, Result};
pub use generator::{generate, RotationMode};
pub use sprite::SpriteSheet;
pub use surface::{RenderCommand, RenderCommands, RenderSurface};
pub use system::ParticleSystem;
pub use time::{FrameClock, FrameLoop, StopHandle};
pub use uniforms::{TextureId, Uniform};
pub use update::{FrameInput, UpdateEngine, UpdateParams, UpdateStats};
pub use volume::BoundingVolume;

/// Convenient imports for driving the fog engine.
///
/// This imports:
/// - [`FogEngine`] with its [`FogConfig`], [`ConfigPatch`] and per-frame [`FrameInput`]
/// - [`RenderSurface`] and the [`RenderCommands`] it plays back
/// - [`DepthCompositor`] and the [`SceneRenderer`] role it drives
/// - [`Vec2`], [`Vec3`], [`Vec4`] - glam vector types
pub mod prelude {
    pub use crate::attributes::{AttributeName, AttributeStore};
    pub use crate::config::{Color, ConfigPatch, DemoConfig, FogConfig, WaterConfig};
    pub use crate::depth::{CameraPlanes, DepthCompositor, FrameOutcome, SceneRenderer, Viewport};
    pub use crate::engine::FogEngine;
    pub use crate::error::{FogError, RenderError};
    pub use crate::generator::RotationMode;
    pub use crate::surface::{RenderCommand, RenderCommands, RenderSurface};
    pub use crate::time::{FrameLoop, StopHandle};
    pub use crate::uniforms::{TextureId, Uniform};
    pub use crate::update::FrameInput;
    pub use crate::{Vec2, Vec3, Vec4};
}

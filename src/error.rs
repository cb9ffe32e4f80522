//! Error types for fogfx.
//!
//! Configuration and dimension problems are rejected synchronously when a
//! change is submitted. Per-frame transient conditions (no pointer hit yet,
//! a render target that lags behind the viewport) are not errors; they are
//! absorbed by the update engine and the depth compositor. Anything coming
//! out of the rendering surface itself is passed up to the host untouched.

use thiserror::Error;

/// Errors raised by the simulation core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FogError {
    /// A shape dimension (density, height, width, depth) was negative or not finite.
    #[error("invalid dimension: {field} = {value} (must be finite and >= 0)")]
    InvalidDimension { field: &'static str, value: f32 },

    /// A live tunable was out of range.
    #[error("invalid config value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// A command batch built for one particle generation was submitted after
    /// the buffers were regenerated.
    #[error("attribute buffers of generation {expected} were disposed (current generation is {found})")]
    DisposedResourceReuse { expected: u64, found: u64 },

    /// Failure reported by the rendering surface.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Failures reported by a [`RenderSurface`](crate::surface::RenderSurface)
/// or [`SceneRenderer`](crate::depth::SceneRenderer) implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    /// The GPU context or surface was lost and must be rebuilt by the host.
    #[error("render context lost")]
    ContextLost,
    /// The device ran out of memory.
    #[error("out of GPU memory")]
    OutOfMemory,
    /// The surface has no buffer registered under the given attribute.
    #[error("no buffer registered for attribute `{0}`")]
    UnknownAttribute(&'static str),
    /// Any other backend-specific failure.
    #[error("render backend error: {0}")]
    Backend(String),
}

/// Errors that can occur during GPU initialization.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; a WebGPU/Vulkan/Metal/DX12 capable GPU is required")]
    NoAdapter,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
}

/// Errors from loading or saving configuration presets.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read or write the preset file.
    #[error("preset I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The preset was not valid JSON for this schema.
    #[error("preset format error: {0}")]
    Json(#[from] serde_json::Error),
    /// The preset parsed but its values were rejected.
    #[error(transparent)]
    Invalid(#[from] FogError),
}

/// Errors that can end the demo host.
#[derive(Error, Debug)]
pub enum RunError {
    /// Failed to create or run the event loop.
    #[error("event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create the window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// The preset could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// A frame failed in a way the host cannot recover from.
    #[error("frame error: {0}")]
    Frame(#[from] FogError),
}

/// Result type using [`FogError`].
pub type Result<T> = std::result::Result<T, FogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_converts_into_fog_error() {
        let err: FogError = RenderError::ContextLost.into();
        assert_eq!(err, FogError::Render(RenderError::ContextLost));
        assert_eq!(err.to_string(), "render context lost");
    }

    #[test]
    fn test_invalid_dimension_message_names_field() {
        let err = FogError::InvalidDimension { field: "width", value: -1.0 };
        assert!(err.to_string().contains("width"));
    }
}

//! Off-screen color+depth target for the depth pre-pass.

use super::DEPTH_FORMAT;
use crate::depth::Viewport;
use crate::uniforms::TextureId;

/// GPU resources of one depth pre-pass target.
///
/// The depth texture is sampleable so the water program can read it.
pub struct GpuDepthTarget {
    pub(crate) id: TextureId,
    pub(crate) color_view: wgpu::TextureView,
    pub(crate) depth_view: wgpu::TextureView,
    _color: wgpu::Texture,
    _depth: wgpu::Texture,
}

impl GpuDepthTarget {
    pub fn new(device: &wgpu::Device, size: Viewport, color_format: wgpu::TextureFormat, id: TextureId) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width,
            height: size.height,
            depth_or_array_layers: 1,
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Pre-pass Color"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Pre-pass Depth"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            id,
            color_view,
            depth_view,
            _color: color,
            _depth: depth,
        }
    }

    pub fn id(&self) -> TextureId {
        self.id
    }
}

impl std::fmt::Debug for GpuDepthTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuDepthTarget").field("id", &self.id).finish_non_exhaustive()
    }
}

//! Instanced fog billboards on wgpu.
//!
//! [`FogInstances`] is the [`RenderSurface`] the engine's commands are played
//! against: one vertex buffer per attribute, stepped per instance, and a
//! uniform buffer holding [`FogUniforms`].

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::DEPTH_FORMAT;
use crate::attributes::AttributeName;
use crate::error::RenderError;
use crate::shader::FOG_SHADER;
use crate::surface::RenderSurface;
use crate::uniforms::{FogUniforms, Uniform};

const TRANSFORM_ATTRIBUTES: [wgpu::VertexAttribute; 4] =
    wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x4, 2 => Float32x4, 3 => Float32x4];
const SIZE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![4 => Float32];
const OPACITY_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![5 => Float32];
const OFFSET_FRAME_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![6 => Float32];

/// Attributes the fog program reads, in vertex buffer slot order.
/// Velocity is simulation-only and never bound.
const BOUND: [AttributeName; 4] = [
    AttributeName::Transform,
    AttributeName::Size,
    AttributeName::OpacityDecrease,
    AttributeName::OffsetFrame,
];

pub struct FogInstances {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    buffers: [Option<wgpu::Buffer>; AttributeName::COUNT],
    instance_count: u32,
    uniforms: FogUniforms,
    uniforms_dirty: bool,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl FogInstances {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>, color_format: wgpu::TextureFormat) -> Self {
        let uniforms = FogUniforms::default();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fog Uniform Buffer"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Fog Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Fog Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fog Shader"),
            source: wgpu::ShaderSource::Wgsl(FOG_SHADER.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Fog Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Fog Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[
                    instance_layout(AttributeName::Transform, &TRANSFORM_ATTRIBUTES),
                    instance_layout(AttributeName::Size, &SIZE_ATTRIBUTES),
                    instance_layout(AttributeName::OpacityDecrease, &OPACITY_ATTRIBUTES),
                    instance_layout(AttributeName::OffsetFrame, &OFFSET_FRAME_ATTRIBUTES),
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            // Transparent: tested against the scene, never written
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            device,
            queue,
            buffers: Default::default(),
            instance_count: 0,
            uniforms,
            uniforms_dirty: false,
            uniform_buffer,
            bind_group,
            pipeline,
        }
    }

    /// Instances drawn per frame.
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    pub fn uniforms(&self) -> &FogUniforms {
        &self.uniforms
    }

    pub fn set_camera(&mut self, view: glam::Mat4, proj: glam::Mat4) {
        self.uniforms.set_camera(view, proj);
        self.uniforms_dirty = true;
    }

    /// Write pending uniform changes to the GPU.
    pub fn flush(&mut self) {
        if std::mem::take(&mut self.uniforms_dirty) {
            self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
        }
    }

    /// Record the fog draw into `pass`. Draws nothing until every bound
    /// attribute has been uploaded.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.instance_count == 0 {
            return;
        }
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        for (slot, name) in BOUND.iter().enumerate() {
            let Some(buffer) = &self.buffers[*name as usize] else {
                return;
            };
            pass.set_vertex_buffer(slot as u32, buffer.slice(..));
        }
        pass.draw(0..6, 0..self.instance_count);
    }
}

fn instance_layout(name: AttributeName, attributes: &'static [wgpu::VertexAttribute]) -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: (name.components() * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes,
    }
}

impl RenderSurface for FogInstances {
    fn upload_attributes(&mut self, name: AttributeName, data: &[f32], components: usize) -> Result<(), RenderError> {
        if let Some(old) = self.buffers[name as usize].take() {
            old.destroy();
        }
        let count = data.len() / components.max(1);
        self.instance_count = u32::try_from(count).map_err(|_| RenderError::OutOfMemory)?;
        if data.is_empty() {
            return Ok(());
        }

        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(name.as_str()),
            contents: bytemuck::cast_slice(data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        self.buffers[name as usize] = Some(buffer);
        Ok(())
    }

    fn mark_dirty(&mut self, name: AttributeName, data: &[f32]) -> Result<(), RenderError> {
        match &self.buffers[name as usize] {
            Some(buffer) if buffer.size() == std::mem::size_of_val(data) as u64 => {
                self.queue.write_buffer(buffer, 0, bytemuck::cast_slice(data));
                Ok(())
            }
            Some(buffer) => Err(RenderError::Backend(format!(
                "`{name}` buffer holds {} bytes, got {}",
                buffer.size(),
                std::mem::size_of_val(data)
            ))),
            None if data.is_empty() => Ok(()),
            None => Err(RenderError::UnknownAttribute(name.as_str())),
        }
    }

    fn release_attributes(&mut self, name: AttributeName) {
        if let Some(buffer) = self.buffers[name as usize].take() {
            buffer.destroy();
        }
        if name == AttributeName::Transform {
            self.instance_count = 0;
        }
    }

    fn set_uniform(&mut self, uniform: &Uniform) {
        if self.uniforms.apply(uniform) {
            self.uniforms_dirty = true;
        } else {
            log::trace!("fog material ignores {}", uniform.name());
        }
    }
}

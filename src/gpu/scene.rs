//! The demo scene on wgpu: heightfield ground, water surface and fog.

use glam::{Mat4, Vec2, Vec3};
use wgpu::util::DeviceExt;

use super::camera::Camera;
use super::depth_target::GpuDepthTarget;
use super::instances::FogInstances;
use super::{create_depth_view, GpuContext, DEPTH_FORMAT};
use crate::config::Color;
use crate::depth::{CameraPlanes, SceneRenderer, Viewport};
use crate::error::RenderError;
use crate::shader::{TerrainUniforms, TerrainVertex, TERRAIN_SHADER, WATER_SHADER};
use crate::uniforms::{TextureId, Uniform, WaterUniforms};

/// Height of the plane the pointer is projected onto.
pub const GROUND_HEIGHT: f32 = 0.0;

/// Height of the water surface.
pub const WATER_LEVEL: f32 = -0.05;

const WATER_SIZE: f32 = 1.9;
const TERRAIN_SIZE: f32 = 3.0;
const TERRAIN_RESOLUTION: u32 = 96;
const GROUND_COLOR: Color = Color(0xe6a67a);

const TERRAIN_ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

/// Ground elevation at `(x, z)`. Dips below [`WATER_LEVEL`] in places so
/// the water has shore lines to foam along.
pub fn terrain_height(x: f32, z: f32) -> f32 {
    0.08 * (x * 2.7).sin() * (z * 2.3).cos() + 0.04 * ((x + z) * 4.1).sin() - 0.03
}

/// Square heightfield grid centered on the origin.
///
/// `resolution` cells per side, so `(resolution + 1)^2` vertices and
/// `resolution^2 * 6` indices.
pub fn terrain_mesh(resolution: u32, size: f32) -> (Vec<TerrainVertex>, Vec<u32>) {
    let resolution = resolution.max(1);
    let step = size / resolution as f32;
    let half = size / 2.0;
    let eps = step * 0.5;

    let mut vertices = Vec::with_capacity(((resolution + 1) * (resolution + 1)) as usize);
    for row in 0..=resolution {
        for col in 0..=resolution {
            let x = col as f32 * step - half;
            let z = row as f32 * step - half;
            let normal = Vec3::new(
                terrain_height(x - eps, z) - terrain_height(x + eps, z),
                2.0 * eps,
                terrain_height(x, z - eps) - terrain_height(x, z + eps),
            )
            .normalize();
            vertices.push(TerrainVertex {
                position: [x, terrain_height(x, z), z],
                normal: normal.to_array(),
            });
        }
    }

    let stride = resolution + 1;
    let mut indices = Vec::with_capacity((resolution * resolution * 6) as usize);
    for row in 0..resolution {
        for col in 0..resolution {
            let i = row * stride + col;
            indices.extend_from_slice(&[i, i + stride, i + 1, i + 1, i + stride, i + stride + 1]);
        }
    }
    (vertices, indices)
}

struct TerrainPass {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct WaterPass {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    uniforms: WaterUniforms,
    uniform_buffer: wgpu::Buffer,
    /// Bind group of the latest depth target.
    bind_group: Option<(TextureId, wgpu::BindGroup)>,
    /// Depth texture the material was told to sample.
    sampled: Option<TextureId>,
}

/// Renders the demo scene and implements the compositor's renderer role.
pub struct WgpuScene {
    ctx: GpuContext,
    pub camera: Camera,
    depth_view: wgpu::TextureView,
    terrain: TerrainPass,
    water: WaterPass,
    fog: FogInstances,
    water_visible: bool,
    next_target_id: u64,
}

impl WgpuScene {
    pub fn new(ctx: GpuContext) -> Self {
        let device = ctx.device.clone();
        let format = ctx.format();
        let depth_view = create_depth_view(&device, ctx.config.width, ctx.config.height);
        let terrain = create_terrain_pass(&device, format);
        let water = create_water_pass(&device, format);
        let fog = FogInstances::new(ctx.device.clone(), ctx.queue.clone(), format);

        Self {
            ctx,
            camera: Camera::new(),
            depth_view,
            terrain,
            water,
            fog,
            water_visible: true,
            next_target_id: 1,
        }
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }

    pub fn fog(&self) -> &FogInstances {
        &self.fog
    }

    /// Render surface the fog engine's commands are submitted to.
    pub fn fog_mut(&mut self) -> &mut FogInstances {
        &mut self.fog
    }

    /// Resize the window surface and the on-screen depth buffer.
    ///
    /// The compositor's depth target is left alone; it notices the new
    /// viewport itself.
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.depth_view = create_depth_view(&self.ctx.device, width, height);
        }
    }

    /// World point on the ground plane under a pointer in NDC.
    pub fn pick_ground(&self, ndc: Vec2) -> Option<Vec3> {
        self.camera.pick_ground(ndc, self.ctx.aspect(), GROUND_HEIGHT)
    }

    fn write_camera(&mut self) {
        let aspect = self.ctx.aspect();
        let view = self.camera.view_matrix();
        let proj = self.camera.projection(aspect);

        self.fog.set_camera(view, proj);
        self.fog.flush();

        let terrain = TerrainUniforms {
            view_proj: (proj * view).to_cols_array_2d(),
            color: GROUND_COLOR.to_vec3().extend(1.0).to_array(),
            light_dir: [0.4, 1.0, 0.3, 0.0],
        };
        self.ctx
            .queue
            .write_buffer(&self.terrain.uniform_buffer, 0, bytemuck::bytes_of(&terrain));

        self.water.uniforms.view_proj = (proj * view).to_cols_array_2d();
        self.water.uniforms.model = (Mat4::from_translation(Vec3::new(0.0, WATER_LEVEL, 0.0))
            * Mat4::from_scale(Vec3::new(WATER_SIZE, 1.0, WATER_SIZE)))
        .to_cols_array_2d();
    }

    fn draw_terrain(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.terrain.pipeline);
        pass.set_bind_group(0, &self.terrain.bind_group, &[]);
        pass.set_vertex_buffer(0, self.terrain.vertex_buffer.slice(..));
        pass.set_index_buffer(self.terrain.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.terrain.index_count, 0, 0..1);
    }

    /// Draw the water if visible and its depth source is not `rendering_into`.
    fn draw_water(&self, pass: &mut wgpu::RenderPass<'_>, rendering_into: Option<TextureId>) {
        if !self.water_visible {
            return;
        }
        let Some((id, bind_group)) = &self.water.bind_group else {
            return;
        };
        if self.water.sampled != Some(*id) || rendering_into == Some(*id) {
            return;
        }
        pass.set_pipeline(&self.water.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..6, 0..1);
    }

    fn encoder(&self, label: &str) -> wgpu::CommandEncoder {
        self.ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) })
    }
}

impl SceneRenderer for WgpuScene {
    type Target = GpuDepthTarget;

    fn viewport(&self) -> Viewport {
        self.ctx.viewport()
    }

    fn camera_planes(&self) -> CameraPlanes {
        self.camera.planes()
    }

    fn create_depth_target(&mut self, size: Viewport) -> Result<GpuDepthTarget, RenderError> {
        let id = TextureId(self.next_target_id);
        self.next_target_id += 1;
        let target = GpuDepthTarget::new(&self.ctx.device, size, self.ctx.format(), id);

        let bind_group = self.ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Water Bind Group"),
            layout: &self.water.layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: self.water.uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&target.depth_view),
                },
            ],
        });
        self.water.bind_group = Some((id, bind_group));
        log::debug!("depth target {id:?} created at {}x{}", size.width, size.height);
        Ok(target)
    }

    fn depth_texture(&self, target: &GpuDepthTarget) -> TextureId {
        target.id()
    }

    fn set_surface_visible(&mut self, visible: bool) {
        self.water_visible = visible;
    }

    fn render_to_target(&mut self, target: &GpuDepthTarget) -> Result<(), RenderError> {
        self.write_camera();

        let mut encoder = self.encoder("Depth Pre-pass Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Depth Pre-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &target.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.draw_terrain(&mut pass);
            self.draw_water(&mut pass, Some(target.id()));
            self.fog.draw(&mut pass);
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn set_surface_uniform(&mut self, uniform: &Uniform) {
        match *uniform {
            Uniform::DepthTexture(id) => self.water.sampled = Some(id),
            _ => {
                if !self.water.uniforms.apply(uniform) {
                    log::trace!("water material ignores {}", uniform.name());
                }
            }
        }
    }

    fn render_final(&mut self) -> Result<(), RenderError> {
        self.write_camera();
        self.ctx.queue.write_buffer(
            &self.water.uniform_buffer,
            0,
            bytemuck::bytes_of(&self.water.uniforms),
        );

        let frame = self.ctx.acquire()?;
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.encoder("Render Encoder");
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.06,
                            b: 0.09,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.draw_terrain(&mut pass);
            self.draw_water(&mut pass, None);
            self.fog.draw(&mut pass);
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_terrain_pass(device: &wgpu::Device, format: wgpu::TextureFormat) -> TerrainPass {
    let (vertices, indices) = terrain_mesh(TERRAIN_RESOLUTION, TERRAIN_SIZE);
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Terrain Vertex Buffer"),
        contents: bytemuck::cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Terrain Index Buffer"),
        contents: bytemuck::cast_slice(&indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Terrain Uniform Buffer"),
        size: std::mem::size_of::<TerrainUniforms>() as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Terrain Bind Group Layout"),
        entries: &[uniform_entry(0)],
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Terrain Bind Group"),
        layout: &layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform_buffer.as_entire_binding(),
        }],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Terrain Shader"),
        source: wgpu::ShaderSource::Wgsl(TERRAIN_SHADER.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Terrain Pipeline Layout"),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Terrain Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<TerrainVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &TERRAIN_ATTRIBUTES,
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    });

    TerrainPass {
        pipeline,
        vertex_buffer,
        index_buffer,
        index_count: indices.len() as u32,
        uniform_buffer,
        bind_group,
    }
}

fn create_water_pass(device: &wgpu::Device, format: wgpu::TextureFormat) -> WaterPass {
    let uniforms = WaterUniforms::default();
    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Water Uniform Buffer"),
        contents: bytemuck::bytes_of(&uniforms),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("Water Bind Group Layout"),
        entries: &[
            uniform_entry(0),
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Depth,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            },
        ],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Water Shader"),
        source: wgpu::ShaderSource::Wgsl(WATER_SHADER.into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Water Pipeline Layout"),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Water Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
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

    WaterPass {
        pipeline,
        layout,
        uniforms,
        uniform_buffer,
        bind_group: None,
        sampled: None,
    }
}

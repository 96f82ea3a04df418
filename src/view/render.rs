use std::collections::HashMap;

use wgpu::*;
use wgpu::util::DeviceExt;

use crate::config::LightingSettings;
use crate::model::{Camera, NodeId, ParticleCloud, SceneGraph};
use crate::utils::{MeshBuffer, Vertex};

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightingUniform {
    pub sun_dir: [f32; 3],
    pub sun_intensity: f32,
    pub ambient: f32,
    pub _pad1: f32,
    pub _pad2: f32,
    pub _pad3: f32,
}

impl From<&LightingSettings> for LightingUniform {
    fn from(l: &LightingSettings) -> Self {
        let dir = l.sun_dir.try_normalize().unwrap_or(glam::Vec3::Y);
        Self {
            sun_dir: dir.to_array(),
            sun_intensity: l.sun_intensity,
            ambient: l.ambient,
            ..Default::default()
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct TransformUniform {
    pub transform: [[f32; 4]; 4],
}

// Shared graphics setup used by native and web
pub struct CameraResources {
    pub camera_buffer: wgpu::Buffer,
    pub lighting_buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub camera_bind_group: wgpu::BindGroup,
}

pub struct PipelineResources {
    pub pipeline: wgpu::RenderPipeline,
    pub wireframe_pipeline: Option<wgpu::RenderPipeline>,
}

/// Point sprites for the particle cloud. The vertex buffer holds the live
/// positions; the cloud's spin is a model matrix in `transform_buffer`.
pub struct ParticleResources {
    pub pipeline: wgpu::RenderPipeline,
    pub vertex_buffer: wgpu::Buffer,
    pub capacity: usize,
    pub count: u32,
    pub transform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

pub fn create_camera_resources(device: &wgpu::Device) -> CameraResources {
    let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("camera_buffer"),
        size: std::mem::size_of::<CameraUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let lighting_buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("lighting_buffer"),
        size: std::mem::size_of::<LightingUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX),
            uniform_entry(1, wgpu::ShaderStages::FRAGMENT),
        ],
    });

    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("camera_bind_group"),
        layout: &bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: lighting_buffer.as_entire_binding() },
        ],
    });

    CameraResources { camera_buffer, lighting_buffer, bind_group_layout, camera_bind_group }
}

fn mesh_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    polygon_mode: wgpu::PolygonMode,
) -> wgpu::RenderPipeline {
    let label = match polygon_mode {
        wgpu::PolygonMode::Line => "wireframe_pipeline",
        _ => "mesh_pipeline",
    };
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[
                    wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
                    wgpu::VertexAttribute { offset: 24, shader_location: 2, format: wgpu::VertexFormat::Float32x4 },
                    wgpu::VertexAttribute { offset: 40, shader_location: 3, format: wgpu::VertexFormat::Float32x2 },
                ],
            }],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
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
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    })
}

pub fn create_mesh_pipelines(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    bind_group_layout: &wgpu::BindGroupLayout,
) -> PipelineResources {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("mesh_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("mesh_pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = mesh_pipeline(device, &pipeline_layout, &shader, format, wgpu::PolygonMode::Fill);
    let wireframe_pipeline = device
        .features()
        .contains(wgpu::Features::POLYGON_MODE_LINE)
        .then(|| mesh_pipeline(device, &pipeline_layout, &shader, format, wgpu::PolygonMode::Line));

    PipelineResources { pipeline, wireframe_pipeline }
}

fn create_particle_vertex_buffer(device: &wgpu::Device, points: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("particle_vertices"),
        size: (points.max(1) * 3 * std::mem::size_of::<f32>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

pub fn create_particle_resources(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    camera_buffer: &wgpu::Buffer,
    capacity: usize,
) -> ParticleResources {
    let transform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("particle_transform"),
        contents: bytemuck::cast_slice(&glam::Mat4::IDENTITY.to_cols_array_2d()),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("particle_bgl"),
        entries: &[
            uniform_entry(0, wgpu::ShaderStages::VERTEX),
            uniform_entry(1, wgpu::ShaderStages::VERTEX),
        ],
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("particle_bg"),
        layout: &bgl,
        entries: &[
            wgpu::BindGroupEntry { binding: 0, resource: camera_buffer.as_entire_binding() },
            wgpu::BindGroupEntry { binding: 1, resource: transform_buffer.as_entire_binding() },
        ],
    });

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("points_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/points.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("particle_pipeline_layout"),
        bind_group_layouts: &[&bgl],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("particle_pipeline"),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: (3 * std::mem::size_of::<f32>()) as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &[wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                }],
            }],
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
            topology: wgpu::PrimitiveTopology::PointList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
        multiview: None,
        cache: None,
    });

    ParticleResources {
        pipeline,
        vertex_buffer: create_particle_vertex_buffer(device, capacity),
        capacity,
        count: 0,
        transform_buffer,
        bind_group,
    }
}

///////////////////////////////////////////////////////////////////////////////

/// Everything the renderer owns between frames.
pub struct RenderState {
    pub format: TextureFormat,
    pub alpha_mode: CompositeAlphaMode,
    pub width: u32,
    pub height: u32,

    pub camera: CameraResources,
    pub pipelines: PipelineResources,
    pub particles: ParticleResources,
    depth_view: TextureView,

    // GPU copies of scene nodes, rebuilt when the graph generation moves
    meshes: HashMap<NodeId, MeshBuffer>,
    synced_generation: Option<u64>,

    pub clear_color: [f32; 3],
    pub wireframe_mode: bool,

    // UI
    pub egui_renderer: egui_wgpu::Renderer,
    pub egui_primitives: Option<Vec<egui::ClippedPrimitive>>,
    pub egui_full_output: Option<egui::FullOutput>,
    pub egui_dpr: f32,
}

impl RenderState {
    pub fn new(
        device: &Device,
        format: TextureFormat,
        alpha_mode: CompositeAlphaMode,
        width: u32,
        height: u32,
        particle_capacity: usize,
    ) -> Self {
        let camera = create_camera_resources(device);
        let pipelines = create_mesh_pipelines(device, format, &camera.bind_group_layout);
        let particles = create_particle_resources(device, format, &camera.camera_buffer, particle_capacity);
        let (_, depth_view) = create_depth_texture(device, width, height);
        let egui_renderer = egui_wgpu::Renderer::new(device, format, egui_wgpu::RendererOptions::default());

        Self {
            format,
            alpha_mode,
            width,
            height,
            camera,
            pipelines,
            particles,
            depth_view,
            meshes: HashMap::new(),
            synced_generation: None,
            clear_color: [0.5, 0.8, 1.0],
            wireframe_mode: false,
            egui_renderer,
            egui_primitives: None,
            egui_full_output: None,
            egui_dpr: 1.0,
        }
    }

    pub fn wireframe_available(&self) -> bool {
        self.pipelines.wireframe_pipeline.is_some()
    }

    fn surface_config(&self) -> SurfaceConfiguration {
        SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: self.format,
            width: self.width.max(1),
            height: self.height.max(1),
            present_mode: PresentMode::Fifo,
            alpha_mode: self.alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        }
    }

    /// Reconfigure the surface and depth buffer. Returns false if the size
    /// did not change.
    pub fn resize(&mut self, device: &Device, surface: &Surface, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 || (width == self.width && height == self.height) {
            return false;
        }
        self.width = width;
        self.height = height;
        surface.configure(device, &self.surface_config());
        let (_, depth_view) = create_depth_texture(device, width, height);
        self.depth_view = depth_view;
        tracing::debug!(width, height, "surface resized");
        true
    }

    pub fn write_camera(&self, queue: &Queue, camera: &Camera) {
        let uniform = CameraUniform { view_proj: camera.view_proj().to_cols_array_2d() };
        queue.write_buffer(&self.camera.camera_buffer, 0, bytemuck::bytes_of(&uniform));
    }

    pub fn write_lighting(&mut self, queue: &Queue, lighting: &LightingSettings) {
        let uniform = LightingUniform::from(lighting);
        queue.write_buffer(&self.camera.lighting_buffer, 0, bytemuck::bytes_of(&uniform));
        self.clear_color = lighting.sky_color;
    }

    /// Upload meshes for nodes added since the last sync and drop buffers
    /// for removed nodes.
    pub fn sync_scene(&mut self, device: &Device, scene: &SceneGraph) {
        if self.synced_generation == Some(scene.generation()) {
            return;
        }
        self.meshes.retain(|id, _| scene.get(*id).is_some());
        for (id, node) in scene.iter() {
            if !self.meshes.contains_key(&id) && !node.mesh.is_empty() {
                self.meshes.insert(id, node.mesh.upload(device));
                tracing::debug!(id = id.0, name = %node.name, "mesh uploaded");
            }
        }
        self.synced_generation = Some(scene.generation());
    }

    pub fn upload_particles(&mut self, device: &Device, queue: &Queue, cloud: &ParticleCloud) {
        let points = cloud.point_count();
        if points > self.particles.capacity {
            self.particles.vertex_buffer = create_particle_vertex_buffer(device, points);
            self.particles.capacity = points;
        }
        queue.write_buffer(&self.particles.vertex_buffer, 0, bytemuck::cast_slice(cloud.live()));
        let transform = TransformUniform { transform: cloud.model_matrix().to_cols_array_2d() };
        queue.write_buffer(&self.particles.transform_buffer, 0, bytemuck::bytes_of(&transform));
        self.particles.count = points as u32;
    }

    pub fn draw_frame(&mut self, device: &Device, queue: &Queue, surface: &Surface, scene: &SceneGraph) {
        let (egui_primitives, egui_full_output) = match (self.egui_primitives.take(), self.egui_full_output.take()) {
            (Some(prim), Some(output)) => (prim, output),
            _ => return,
        };

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.width, self.height],
            pixels_per_point: self.egui_dpr,
        };

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                surface.configure(device, &self.surface_config());
                match surface.get_current_texture() {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::warn!("frame skipped after reconfigure: {e}");
                        return;
                    }
                }
            }
            Err(e) => {
                tracing::warn!("frame skipped: {e}");
                return;
            }
        };

        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        {
            let [r, g, b] = self.clear_color;
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("scene_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color { r: r as f64, g: g as f64, b: b as f64, a: 1.0 }),
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let active_pipeline = match (&self.pipelines.wireframe_pipeline, self.wireframe_mode) {
                (Some(wireframe), true) => wireframe,
                _ => &self.pipelines.pipeline,
            };
            rp.set_pipeline(active_pipeline);
            rp.set_bind_group(0, &self.camera.camera_bind_group, &[]);

            // Opaque first so transparent surfaces blend over them.
            for transparent in [false, true] {
                for (id, node) in scene.iter() {
                    if !node.visible || node.transparent != transparent {
                        continue;
                    }
                    let Some(mesh_buffer) = self.meshes.get(&id) else { continue };
                    if mesh_buffer.index_count == 0 {
                        continue;
                    }
                    rp.set_vertex_buffer(0, mesh_buffer.vertex_buffer.slice(..));
                    rp.set_index_buffer(mesh_buffer.index_buffer.slice(..), IndexFormat::Uint32);
                    rp.draw_indexed(0..mesh_buffer.index_count, 0, 0..1);
                }
            }

            if self.particles.count > 0 {
                rp.set_pipeline(&self.particles.pipeline);
                rp.set_bind_group(0, &self.particles.bind_group, &[]);
                rp.set_vertex_buffer(0, self.particles.vertex_buffer.slice(..));
                rp.draw(0..self.particles.count, 0..1);
            }
        }

        for (id, image_delta) in &egui_full_output.textures_delta.set {
            self.egui_renderer.update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, &mut encoder, &egui_primitives, &screen_descriptor);

        {
            let egui_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("egui_render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Load,
                        store: StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.egui_renderer
                .render(&mut egui_pass.forget_lifetime(), &egui_primitives, &screen_descriptor);
        }

        for id in &egui_full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
    }
}

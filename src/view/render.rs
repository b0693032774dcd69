use wgpu::*;

use crate::config::{MaterialConfig, SceneConfig};
use crate::controller::{CameraUniform, LightingUniform};
use crate::utils::{create_cube_mesh, cuboid_transform, InstanceRaw, MeshBuffer, Vertex};

// Shared graphics setup used by native and web
pub struct CameraResources {
    pub camera_buffer: wgpu::Buffer,
    pub lighting_buffer: wgpu::Buffer,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub camera_bind_group: wgpu::BindGroup,
}

/// Tessellated egui output for one frame
pub struct UiFrame {
    pub primitives: Vec<egui::ClippedPrimitive>,
    pub textures_delta: egui::TexturesDelta,
    pub pixels_per_point: f32,
}

/// What the shell does after trying to present a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// Surface lost or outdated, configure it again and carry on
    Reconfigure,
    /// Frame dropped, next one may succeed
    Skip,
    /// Unrecoverable, the frame loop must end
    Stop,
}

impl FrameOutcome {
    pub fn from_result(result: Result<(), SurfaceError>) -> Self {
        match result {
            Ok(()) => Self::Presented,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => Self::Reconfigure,
            Err(SurfaceError::OutOfMemory) => {
                tracing::error!("GPU out of memory, stopping frame loop");
                Self::Stop
            }
            Err(e) => {
                tracing::warn!(error = ?e, "dropped frame");
                Self::Skip
            }
        }
    }
}

pub fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Depth32Float,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    (depth_texture, depth_view)
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

    let uniform_entry = |binding: u32| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("camera_bind_group_layout"),
        entries: &[uniform_entry(0), uniform_entry(1)],
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

pub fn create_glyph_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    bind_group_layout: &wgpu::BindGroupLayout,
    depth_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("glyph_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shaders/glyph.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("glyph_pipeline_layout"),
        bind_group_layouts: &[bind_group_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("glyph_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &[
                        wgpu::VertexAttribute { offset: 0, shader_location: 0, format: wgpu::VertexFormat::Float32x3 },
                        wgpu::VertexAttribute { offset: 12, shader_location: 1, format: wgpu::VertexFormat::Float32x3 },
                    ],
                },
                wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<InstanceRaw>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Instance,
                    attributes: &[
                        wgpu::VertexAttribute { offset: 0, shader_location: 2, format: wgpu::VertexFormat::Float32x4 },
                        wgpu::VertexAttribute { offset: 16, shader_location: 3, format: wgpu::VertexFormat::Float32x4 },
                        wgpu::VertexAttribute { offset: 32, shader_location: 4, format: wgpu::VertexFormat::Float32x4 },
                        wgpu::VertexAttribute { offset: 48, shader_location: 5, format: wgpu::VertexFormat::Float32x4 },
                        wgpu::VertexAttribute { offset: 64, shader_location: 6, format: wgpu::VertexFormat::Float32x4 },
                        wgpu::VertexAttribute { offset: 80, shader_location: 7, format: wgpu::VertexFormat::Float32x4 },
                    ],
                },
            ],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState { format, blend: Some(wgpu::BlendState::REPLACE), write_mask: wgpu::ColorWrites::ALL })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: Some(wgpu::Face::Back),
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
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

/// Growable instance buffer, rewritten every frame
pub struct InstanceBuffer {
    pub buffer: wgpu::Buffer,
    capacity: usize,
    count: u32,
}

impl InstanceBuffer {
    pub fn new(device: &Device, label: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Self::allocate(device, label, capacity),
            capacity,
            count: 0,
        }
    }

    fn allocate(device: &Device, label: &'static str, capacity: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: (capacity * std::mem::size_of::<InstanceRaw>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    pub fn write(&mut self, device: &Device, queue: &Queue, instances: &[InstanceRaw]) {
        if instances.len() > self.capacity {
            self.capacity = instances.len().next_power_of_two();
            self.buffer = Self::allocate(device, "instance_buffer", self.capacity);
        }
        if !instances.is_empty() {
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(instances));
        }
        self.count = instances.len() as u32;
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

///////////////////////////////////////////////////////////////////////////////

/// Everything needed to draw a frame
pub struct RenderState {
    pub surface_config: SurfaceConfiguration,
    pub pipeline: RenderPipeline,
    pub cube_mesh: MeshBuffer,
    pub glyph_instances: InstanceBuffer,
    pub floor_instance: InstanceBuffer,
    pub camera_buffer: Buffer,
    pub lighting_buffer: Buffer,
    pub camera_bind_group: BindGroup,
    pub depth_view: TextureView,
    pub background: Color,
    pub egui_renderer: egui_wgpu::Renderer,
}

impl RenderState {
    pub fn new(device: &Device, queue: &Queue, surface_config: SurfaceConfiguration, scene: &SceneConfig) -> Self {
        let depth_format = wgpu::TextureFormat::Depth32Float;
        let (_, depth_view) = create_depth_texture(device, surface_config.width, surface_config.height);

        let camera_resources = create_camera_resources(device);
        let pipeline = create_glyph_pipeline(
            device,
            surface_config.format,
            &camera_resources.bind_group_layout,
            depth_format,
        );

        let cube_mesh = create_cube_mesh().upload(device);
        let glyph_instances = InstanceBuffer::new(device, "glyph_instances", scene.typed_limit);

        let ground = &scene.arena.ground;
        let floor = InstanceRaw::new(
            cuboid_transform(glam::Mat4::from_translation(ground.center), ground.half_extents),
            &MaterialConfig::floor(),
        );
        let mut floor_instance = InstanceBuffer::new(device, "floor_instance", 1);
        floor_instance.write(device, queue, &[floor]);

        let [r, g, b, a] = scene.camera.background;
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_config.format, egui_wgpu::RendererOptions::default());

        Self {
            surface_config,
            pipeline,
            cube_mesh,
            glyph_instances,
            floor_instance,
            camera_buffer: camera_resources.camera_buffer,
            lighting_buffer: camera_resources.lighting_buffer,
            camera_bind_group: camera_resources.camera_bind_group,
            depth_view,
            background: Color { r, g, b, a },
            egui_renderer,
        }
    }

    pub fn width(&self) -> u32 {
        self.surface_config.width
    }

    pub fn height(&self) -> u32 {
        self.surface_config.height
    }

    /// Reconfigure the surface and depth buffer, zero sizes are ignored
    pub fn resize(&mut self, device: &Device, surface: &Surface, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.surface_config.width = width;
        self.surface_config.height = height;
        self.reconfigure(device, surface);
    }

    pub fn reconfigure(&mut self, device: &Device, surface: &Surface) {
        surface.configure(device, &self.surface_config);
        let (_, depth_view) = create_depth_texture(device, self.surface_config.width, self.surface_config.height);
        self.depth_view = depth_view;
    }

    pub fn write_camera(&self, queue: &Queue, camera: &CameraUniform) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(camera));
    }

    pub fn write_lighting(&self, queue: &Queue, lighting: &LightingUniform) {
        queue.write_buffer(&self.lighting_buffer, 0, bytemuck::bytes_of(lighting));
    }

    pub fn write_glyphs(&mut self, device: &Device, queue: &Queue, instances: &[InstanceRaw]) {
        self.glyph_instances.write(device, queue, instances);
    }

    pub fn draw_frame(
        &mut self,
        device: &Device,
        queue: &Queue,
        surface: &Surface,
        ui: Option<UiFrame>,
    ) -> Result<(), SurfaceError> {
        let frame = surface.get_current_texture()?;
        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("encoder"),
        });

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.surface_config.width, self.surface_config.height],
            pixels_per_point: ui.as_ref().map_or(1.0, |u| u.pixels_per_point),
        };

        // Upload egui textures and buffers
        let mut user_commands = Vec::new();
        if let Some(ui) = &ui {
            for (id, image_delta) in &ui.textures_delta.set {
                self.egui_renderer.update_texture(device, queue, *id, image_delta);
            }
            user_commands = self
                .egui_renderer
                .update_buffers(device, queue, &mut encoder, &ui.primitives, &screen_descriptor);
        }

        {
            let mut rp = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("render_pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(self.background),
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

            rp.set_pipeline(&self.pipeline);
            rp.set_bind_group(0, &self.camera_bind_group, &[]);
            rp.set_vertex_buffer(0, self.cube_mesh.vertex_buffer.slice(..));
            rp.set_index_buffer(self.cube_mesh.index_buffer.slice(..), IndexFormat::Uint32);

            for instances in [&self.floor_instance, &self.glyph_instances] {
                if instances.count() == 0 {
                    continue;
                }
                rp.set_vertex_buffer(1, instances.buffer.slice(..));
                rp.draw_indexed(0..self.cube_mesh.index_count, 0, 0..instances.count());
            }
        }

        // Render egui overlay
        if let Some(ui) = &ui {
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
                .render(&mut egui_pass.forget_lifetime(), &ui.primitives, &screen_descriptor);
        }

        queue.submit(user_commands.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();

        // Free egui textures
        if let Some(ui) = &ui {
            for id in &ui.textures_delta.free {
                self.egui_renderer.free_texture(id);
            }
        }

        Ok(())
    }
}

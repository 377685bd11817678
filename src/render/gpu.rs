//! wgpu backend: flat-lit solid surfaces plus the egui overlay.

use super::camera::CameraView;
use super::egui_overlay::{EguiFrameOutput, EguiOverlay};
use super::{RenderBackend, RenderError};
use crate::scene::geometry::Vertex;
use crate::scene::{Light, Rgb, Scene, Surface, SurfaceId};
use glam::Mat4;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Per-object uniform slots in the dynamic buffer.
pub const MAX_SURFACES: usize = 64;
const POINT_LIGHTS: usize = 2;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    view_proj: [[f32; 4]; 4],
    camera_pos: [f32; 4],
    ambient: [f32; 4],
    sun_dir: [f32; 4],
    sun_color: [f32; 4],
    point_pos: [[f32; 4]; POINT_LIGHTS],
    point_color: [[f32; 4]; POINT_LIGHTS],
}

impl Globals {
    /// Folds the scene's lights into the fixed shader layout. Ambient terms add
    /// up, the first directional light is the sun and the first two point
    /// lights fill the point slots.
    fn new(lights: &[Light], camera: &CameraView, width: f32, height: f32) -> Self {
        let mut globals = Globals {
            view_proj: camera.view_proj(width, height).to_cols_array_2d(),
            camera_pos: camera.eye.extend(1.0).to_array(),
            ..<Globals as bytemuck::Zeroable>::zeroed()
        };

        let mut sun_set = false;
        let mut points = 0;
        for light in lights {
            match *light {
                Light::Ambient { color, intensity } => {
                    let c = color.scaled(intensity);
                    for (slot, v) in globals.ambient.iter_mut().zip(c) {
                        *slot += v;
                    }
                }
                Light::Directional {
                    color,
                    intensity,
                    direction,
                } if !sun_set => {
                    globals.sun_dir = direction.normalize_or_zero().extend(0.0).to_array();
                    globals.sun_color = rgba(color.scaled(intensity), 1.0);
                    sun_set = true;
                }
                Light::Point {
                    color,
                    intensity,
                    position,
                    range,
                } if points < POINT_LIGHTS => {
                    globals.point_pos[points] = position.extend(range).to_array();
                    globals.point_color[points] = rgba(color.scaled(intensity), 1.0);
                    points += 1;
                }
                _ => log::trace!("light {:?} exceeds shader slots", light),
            }
        }
        globals
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ObjectUniform {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 4],
    color: [f32; 4],
}

impl ObjectUniform {
    fn new(surface: &Surface) -> Self {
        let model = surface.world_matrix();
        Self {
            model: model.to_cols_array_2d(),
            normal: model.inverse().transpose().to_cols_array_2d(),
            color: rgba(surface.color.to_array(), surface.opacity),
        }
    }
}

fn rgba(rgb: [f32; 3], a: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], a]
}

struct GpuMesh {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    num_indices: u32,
}

struct GlobalsGpu {
    buffer: wgpu::Buffer,
    bindgroup: wgpu::BindGroup,
}

struct DynamicObjectBuffer {
    buffer: wgpu::Buffer,
    bindgroup: wgpu::BindGroup,
    stride: u64,
}

pub struct WgpuBackend {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth: (wgpu::Texture, wgpu::TextureView),
    opaque_pipeline: wgpu::RenderPipeline,
    transparent_pipeline: wgpu::RenderPipeline,
    globals_bgl: wgpu::BindGroupLayout,
    globals: Option<GlobalsGpu>,
    objects: DynamicObjectBuffer,
    meshes: HashMap<SurfaceId, GpuMesh>,
    overlay: EguiOverlay,
    clear_color: wgpu::Color,
}

impl WgpuBackend {
    pub async fn new(window: Arc<Window>, clear_color: Rgb) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let width = size.width.max(1);
        let height = size.height.max(1);

        let instance = wgpu::Instance::default();
        let surface = instance.create_surface(window)?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::AdapterUnavailable)?;
        log::info!("using GPU adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("roomviz-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                        .using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or(RenderError::AdapterUnavailable)?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width,
            height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("surface_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let globals_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("globals_bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<Globals>() as u64),
                },
                count: None,
            }],
        });
        let (objects, object_bgl) = make_dynamic_object_buffer(&device);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("surface_pipeline_layout"),
            bind_group_layouts: &[&globals_bgl, &object_bgl],
            push_constant_ranges: &[],
        });
        let opaque_pipeline = make_pipeline(&device, &pipeline_layout, &shader, format, false);
        let transparent_pipeline = make_pipeline(&device, &pipeline_layout, &shader, format, true);

        let depth = create_depth(&device, width, height);
        let overlay = EguiOverlay::new(&device, format);

        log::info!("wgpu backend ready ({width}x{height}, {format:?})");
        Ok(Self {
            surface,
            device,
            queue,
            config,
            depth,
            opaque_pipeline,
            transparent_pipeline,
            globals_bgl,
            globals: None,
            objects,
            meshes: HashMap::new(),
            overlay,
            clear_color: wgpu::Color {
                r: clear_color.r as f64,
                g: clear_color.g as f64,
                b: clear_color.b as f64,
                a: 1.0,
            },
        })
    }

    /// Queues an egui frame to be painted over the next draw.
    pub fn set_overlay(&mut self, frame: EguiFrameOutput) {
        self.overlay.set_frame(frame);
    }

    fn upload_mesh(&self, surface: &Surface) -> GpuMesh {
        let mesh = surface.geometry.mesh();
        let vertex = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} vertices", surface.label)),
                contents: bytemuck::cast_slice(&mesh.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} indices", surface.label)),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        GpuMesh {
            vertex,
            index,
            num_indices: mesh.indices.len() as u32,
        }
    }

    /// Opaque surfaces first, then transparent ones from far to near.
    fn draw_order(scene: &Scene, camera: &CameraView) -> Vec<usize> {
        let surfaces = scene.surfaces();
        let mut opaque: Vec<usize> = Vec::with_capacity(surfaces.len());
        let mut transparent: Vec<(usize, f32)> = Vec::new();
        for (i, surface) in surfaces.iter().enumerate() {
            if surface.is_transparent() {
                let dist = surface.world_bounds().center().distance_squared(camera.eye);
                transparent.push((i, dist));
            } else {
                opaque.push(i);
            }
        }
        transparent.sort_by(|a, b| b.1.total_cmp(&a.1));
        opaque.extend(transparent.into_iter().map(|(i, _)| i));
        opaque
    }
}

impl RenderBackend for WgpuBackend {
    fn prepare(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let count = scene.surfaces().len();
        if count > MAX_SURFACES {
            return Err(RenderError::TooManySurfaces {
                count,
                max: MAX_SURFACES,
            });
        }

        for surface in scene.surfaces() {
            if !self.meshes.contains_key(&surface.id) {
                let mesh = self.upload_mesh(surface);
                self.meshes.insert(surface.id, mesh);
            }
        }

        if self.globals.is_none() {
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("globals"),
                size: std::mem::size_of::<Globals>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bindgroup = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("globals_bg"),
                layout: &self.globals_bgl,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            });
            self.globals = Some(GlobalsGpu { buffer, bindgroup });
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = create_depth(&self.device, width, height);
        log::debug!("surface resized to {width}x{height}");
    }

    fn buffer_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn draw(&mut self, scene: &Scene, camera: &CameraView) -> Result<bool, RenderError> {
        self.prepare(scene)?;

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("surface lost; reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(false);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface texture timed out; skipping frame");
                return Ok(false);
            }
            Err(err) => return Err(RenderError::Surface(err)),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let (width, height) = self.buffer_size();
        let globals = Globals::new(scene.lights(), camera, width as f32, height as f32);
        let Some(globals_gpu) = self.globals.as_ref() else {
            return Ok(false);
        };
        self.queue
            .write_buffer(&globals_gpu.buffer, 0, bytemuck::bytes_of(&globals));

        let stride = self.objects.stride as usize;
        let mut staging = vec![0u8; stride * scene.surfaces().len()];
        for (i, surface) in scene.surfaces().iter().enumerate() {
            let uniform = ObjectUniform::new(surface);
            let bytes = bytemuck::bytes_of(&uniform);
            staging[i * stride..i * stride + bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            self.queue.write_buffer(&self.objects.buffer, 0, &staging);
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("scene-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.1,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_bind_group(0, &globals_gpu.bindgroup, &[]);
            let mut transparent_bound = false;
            rpass.set_pipeline(&self.opaque_pipeline);
            for i in Self::draw_order(scene, camera) {
                let surface = &scene.surfaces()[i];
                let Some(mesh) = self.meshes.get(&surface.id) else {
                    continue;
                };
                if surface.is_transparent() && !transparent_bound {
                    rpass.set_pipeline(&self.transparent_pipeline);
                    transparent_bound = true;
                }
                let dynamic_offset = (i as u64 * self.objects.stride) as u32;
                rpass.set_bind_group(1, &self.objects.bindgroup, &[dynamic_offset]);
                rpass.set_vertex_buffer(0, mesh.vertex.slice(..));
                rpass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint16);
                rpass.draw_indexed(0..mesh.num_indices, 0, 0..1);
            }
        }

        let extra = self
            .overlay
            .paint(&self.device, &self.queue, &mut encoder, &view);
        self.queue
            .submit(extra.into_iter().chain(std::iter::once(encoder.finish())));
        frame.present();
        Ok(true)
    }

    fn release_surface(&mut self, id: SurfaceId) {
        if let Some(mesh) = self.meshes.remove(&id) {
            mesh.vertex.destroy();
            mesh.index.destroy();
        }
    }

    fn release_lights(&mut self) {
        if let Some(globals) = self.globals.take() {
            globals.buffer.destroy();
        }
    }
}

const VERTEX_ATTRIBS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3
];

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBS,
    }
}

fn make_dynamic_object_buffer(device: &wgpu::Device) -> (DynamicObjectBuffer, wgpu::BindGroupLayout) {
    let align = device.limits().min_uniform_buffer_offset_alignment as u64;
    let obj_size = std::mem::size_of::<ObjectUniform>() as u64;
    let stride = obj_size.div_ceil(align) * align;

    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("object_dynamic"),
        size: stride * MAX_SURFACES as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let object_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("object_bgl"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: true,
                min_binding_size: NonZeroU64::new(obj_size),
            },
            count: None,
        }],
    });

    let bindgroup = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("object_dynamic_bg"),
        layout: &object_bgl,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: NonZeroU64::new(obj_size),
            }),
        }],
    });

    (
        DynamicObjectBuffer {
            buffer,
            bindgroup,
            stride,
        },
        object_bgl,
    )
}

fn make_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    format: wgpu::TextureFormat,
    transparent: bool,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(if transparent {
            "transparent_pipeline"
        } else {
            "opaque_pipeline"
        }),
        cache: None,
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            entry_point: Some("vs_main"),
            buffers: &[vertex_layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(if transparent {
                    wgpu::BlendState::ALPHA_BLENDING
                } else {
                    wgpu::BlendState::REPLACE
                }),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            // planes are single-sided; transparent ones stay visible from behind
            cull_mode: if transparent {
                None
            } else {
                Some(wgpu::Face::Back)
            },
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: !transparent,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
    })
}

fn create_depth(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let size = wgpu::Extent3d {
        width: width.max(1),
        height: height.max(1),
        depth_or_array_layers: 1,
    };
    let tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
    (tex, view)
}

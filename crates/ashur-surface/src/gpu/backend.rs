use std::collections::HashMap;

use anyhow::{Context, Result};
use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use super::{BufferId, ContextError, GpuContext, ProgramId, ShaderSource, TextureId};

/// Initialization parameters for the wgpu backend.
///
/// Keep this structure stable and minimal. Add configuration flags only when
/// a concrete platform or backend requirement exists.
#[derive(Debug, Clone)]
pub struct WgpuInit {
    /// Adapter power preference.
    pub power_preference: wgpu::PowerPreference,

    /// Required wgpu features.
    ///
    /// Favor an empty set for portability unless a feature is strictly necessary.
    pub required_features: wgpu::Features,

    /// Limits requested from the adapter/device.
    pub required_limits: wgpu::Limits,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}

/// Vertex of the static full-surface triangle, in clip space.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct SurfaceVertex {
    pos: [f32; 2],
}

impl SurfaceVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<SurfaceVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Single triangle covering the whole clip square; the parts hanging past
/// the edges are clipped away.
const SURFACE_TRIANGLE: [SurfaceVertex; 3] = [
    SurfaceVertex { pos: [-1.0, -1.0] },
    SurfaceVertex { pos: [3.0, -1.0] },
    SurfaceVertex { pos: [-1.0, 3.0] },
];

fn premul_alpha_blend() -> wgpu::BlendState {
    wgpu::BlendState {
        color: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
        alpha: wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        },
    }
}

/// Headless wgpu implementation of [`GpuContext`].
///
/// Owns the wgpu Device/Queue and an offscreen color target that tracks the
/// surface's pixel dimensions. Presentation stays with the platform view;
/// drawables render into [`output_view`](Self::output_view) and the view
/// decides how those pixels reach the screen.
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,

    output_format: wgpu::TextureFormat,
    output: Option<wgpu::TextureView>,
    output_size: (u32, u32),

    programs: HashMap<ProgramId, wgpu::RenderPipeline>,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    textures: HashMap<TextureId, wgpu::Texture>,

    next_id: u64,
}

impl WgpuBackend {
    /// Creates a backend without a window surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu; this blocks on
    /// it, so call it from a context where blocking is acceptable.
    pub fn new(init: WgpuInit) -> Result<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: init.power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("ashur-surface device"),
            required_features: init.required_features,
            required_limits: init.required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        }))
        .context("failed to create wgpu device/queue")?;

        Ok(Self {
            device,
            queue,
            output_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            output: None,
            output_size: (0, 0),
            programs: HashMap::new(),
            buffers: HashMap::new(),
            textures: HashMap::new(),
            next_id: 1,
        })
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns the output color format.
    pub fn output_format(&self) -> wgpu::TextureFormat {
        self.output_format
    }

    /// Returns the current output target view, if `bind_output` has run.
    pub fn output_view(&self) -> Option<&wgpu::TextureView> {
        self.output.as_ref()
    }

    /// Looks up a compiled pipeline by handle.
    pub fn program(&self, id: ProgramId) -> Option<&wgpu::RenderPipeline> {
        self.programs.get(&id)
    }

    /// Looks up a vertex buffer by handle.
    pub fn buffer(&self, id: BufferId) -> Option<&wgpu::Buffer> {
        self.buffers.get(&id)
    }

    /// Looks up a texture by handle.
    pub fn texture(&self, id: TextureId) -> Option<&wgpu::Texture> {
        self.textures.get(&id)
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GpuContext for WgpuBackend {
    fn compile_program(
        &mut self,
        name: &str,
        source: &ShaderSource,
    ) -> Result<ProgramId, ContextError> {
        let error_scope = self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.vertex.as_str().into()),
        });
        let fragment = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.fragment.as_str().into()),
        });

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(name),
                bind_group_layouts: &[],
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(name),
                layout: Some(&layout),

                vertex: wgpu::VertexState {
                    module: &vertex,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[SurfaceVertex::layout()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: &fragment,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.output_format,
                        blend: Some(premul_alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        if let Some(err) = pollster::block_on(error_scope.pop()) {
            return Err(ContextError::Compile {
                name: name.to_string(),
                message: err.to_string(),
            });
        }

        let id = ProgramId(self.alloc_id());
        self.programs.insert(id, pipeline);
        Ok(id)
    }

    fn release_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
    }

    fn create_surface_triangle(&mut self) -> Result<BufferId, ContextError> {
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("ashur surface triangle"),
                contents: bytemuck::cast_slice(&SURFACE_TRIANGLE),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let id = BufferId(self.alloc_id());
        self.buffers.insert(id, buffer);
        Ok(id)
    }

    fn release_buffer(&mut self, buffer: BufferId) {
        self.buffers.remove(&buffer);
    }

    fn create_blank_texture(&mut self) -> Result<TextureId, ContextError> {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ashur blank texture"),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &[0, 0, 0, 0],
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        let id = TextureId(self.alloc_id());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn bind_output(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);

        if self.output.is_some() && self.output_size == (width, height) {
            return;
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ashur output target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.output_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        self.output = Some(texture.create_view(&wgpu::TextureViewDescriptor::default()));
        self.output_size = (width, height);
    }
}

// One render pipeline per primitive kind, sharing a uniform block and the
// colorscale bind group.

use splot_core::{BackendTier, PrimitiveKind, RenderError, RenderResult};

use crate::colorscale::ColorScaleTexture;
use crate::shaders::shader_source;
use crate::target::TARGET_FORMAT;
use crate::vertex::{self, FrameUniforms};

/// Display blends premultiplied color; picking writes colors untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Display,
    Picking,
}

impl RenderMode {
    fn blend(self) -> Option<wgpu::BlendState> {
        match self {
            // src * 1 + dst * (1 - src_alpha)
            RenderMode::Display => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            RenderMode::Picking => None,
        }
    }
}

pub struct ProgramSet {
    rect_pipeline: wgpu::RenderPipeline,
    line_pipeline: wgpu::RenderPipeline,
    dot_pipeline: wgpu::RenderPipeline,

    uniform_buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    uniforms: FrameUniforms,
}

impl ProgramSet {
    /// Compile every program. Any shader or pipeline validation error is returned
    /// instead of surfacing later as a device error.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        tier: BackendTier,
        mode: RenderMode,
        sample_count: u32,
        colorscale: &ColorScaleTexture,
        uniforms: FrameUniforms,
    ) -> RenderResult<Self> {
        if tier == BackendTier::Unavailable {
            return Err(RenderError::Unavailable("no backend tier selected".into()));
        }
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("frame_uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame_bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bg"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&colorscale.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&colorscale.sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("frame_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let build = |kind| create_pipeline(device, &pipeline_layout, tier, kind, mode, sample_count);
        let pipelines = (
            build(PrimitiveKind::Rect),
            build(PrimitiveKind::Line),
            build(PrimitiveKind::Dot),
        );

        // Pop before propagating anything so the scope never leaks.
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            log::error!("Shader program creation failed: {err}");
            return Err(RenderError::Gpu(err.to_string()));
        }
        let (rect_pipeline, line_pipeline, dot_pipeline) = (pipelines.0?, pipelines.1?, pipelines.2?);

        let mut programs = Self {
            rect_pipeline,
            line_pipeline,
            dot_pipeline,
            uniform_buffer,
            bind_group,
            uniforms,
        };
        programs.write_uniforms(queue, uniforms);
        Ok(programs)
    }

    pub fn pipeline(&self, kind: PrimitiveKind) -> &wgpu::RenderPipeline {
        match kind {
            PrimitiveKind::Rect => &self.rect_pipeline,
            PrimitiveKind::Line => &self.line_pipeline,
            PrimitiveKind::Dot => &self.dot_pipeline,
        }
    }

    /// Push projection, pixel scale, domain, no-data and log flag to the GPU.
    pub fn write_uniforms(&mut self, queue: &wgpu::Queue, uniforms: FrameUniforms) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        self.uniforms = uniforms;
    }

    /// Last values written to the GPU.
    pub fn uniforms(&self) -> &FrameUniforms {
        &self.uniforms
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    tier: BackendTier,
    kind: PrimitiveKind,
    mode: RenderMode,
    sample_count: u32,
) -> RenderResult<wgpu::RenderPipeline> {
    let source = shader_source(tier, kind)
        .ok_or_else(|| RenderError::Unavailable(format!("no {kind} shader for tier {tier}")))?;
    let label = format!("{kind}_shader");
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(&label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    });

    let buffers = vertex::buffer_layouts(kind, tier);
    let label = format!("{kind}_pipeline");
    Ok(device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some("vs_main"),
            buffers: &buffers,
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: mode.blend(),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
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
        // Painter's order only: no depth test.
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: sample_count,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    }))
}

// GPU renderer implementation
// Batches lines, dots and rects per frame and draws each kind with one instanced call (wgpu)

mod batch;
mod buffers;
mod colorscale;
mod negotiate;
mod picking;
mod programs;
mod shaders;
mod target;
mod tests;
mod vertex;

use splot_core::{
    BackendTier, Color, ColorMapping, ColorScaleRegistry, DotInstance, Gamut, LineInstance,
    PrimitiveKind, PrimitiveSink, RectInstance, RenderError, RenderResult, RenderSurface,
    RendererConfig, SymbolKind, Vec2,
};

pub use batch::{
    AttributeArray, Batch, DotColumns, DrawCall, FrameBatches, FrameState, FrameStats,
    InstanceColumns, LineColumns, RectColumns, FLAG_HAS_VALUE, FLAG_OPAQUE,
};
pub use buffers::{checked_buffer_size, replicate, GpuAttributeBuffers};
pub use colorscale::{ColorScaleTexture, COLORSCALE_FORMAT};
pub use negotiate::{
    negotiate, negotiate_gpu, GpuContext, LegacyTier, Negotiation, PrimaryTier, TierStrategy,
};
pub use picking::PickingRenderer;
pub use programs::{ProgramSet, RenderMode};
pub use shaders::shader_source;
pub use target::{RenderTarget, TARGET_FORMAT};
pub use vertex::{attributes, buffer_layouts, FrameUniforms, VERTICES_PER_INSTANCE};

// ──────────────────────────────────────────────
// GPU state
// ──────────────────────────────────────────────

struct GpuState {
    context: GpuContext,
    programs: ProgramSet,
    colorscale: ColorScaleTexture,
    target: RenderTarget,
    rect_buffers: GpuAttributeBuffers,
    line_buffers: GpuAttributeBuffers,
    dot_buffers: GpuAttributeBuffers,
}

impl GpuState {
    /// Create every GPU object inside one validation/out-of-memory scope so a
    /// failure is reported here instead of reaching the uncaptured-error handler.
    fn build(
        context: GpuContext,
        config: &RendererConfig,
        mode: RenderMode,
        uniforms: FrameUniforms,
    ) -> RenderResult<Self> {
        let device = context.device.clone();
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let built = Self::create(context, config, mode, uniforms);
        let validation = pollster::block_on(device.pop_error_scope());
        let out_of_memory = pollster::block_on(device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(RenderError::Gpu(err.to_string()));
        }
        let gpu = built?;
        gpu.clear(config.clear_color);
        Ok(gpu)
    }

    fn create(
        context: GpuContext,
        config: &RendererConfig,
        mode: RenderMode,
        uniforms: FrameUniforms,
    ) -> RenderResult<Self> {
        let device = &context.device;
        let tier = context.tier;
        let sample_count = match mode {
            RenderMode::Display => RenderTarget::pick_sample_count(&context.adapter, config.antialias),
            RenderMode::Picking => 1,
        };

        let colorscale = ColorScaleTexture::new(device);
        let programs = ProgramSet::new(
            device,
            &context.queue,
            tier,
            mode,
            sample_count,
            &colorscale,
            uniforms,
        )?;
        let target = RenderTarget::new(device, config.width, config.height, sample_count);

        let rect_buffers = GpuAttributeBuffers::new(device, PrimitiveKind::Rect, tier, config.max_rects)?;
        let line_buffers = GpuAttributeBuffers::new(device, PrimitiveKind::Line, tier, config.max_lines)?;
        let dot_buffers = GpuAttributeBuffers::new(device, PrimitiveKind::Dot, tier, config.max_dots)?;

        Ok(Self {
            context,
            programs,
            colorscale,
            target,
            rect_buffers,
            line_buffers,
            dot_buffers,
        })
    }

    /// Fill the target with `color` in a pass of its own.
    fn clear(&self, color: Color) {
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("splot_clear"),
            });
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("splot_clear_pass"),
            color_attachments: &[Some(self.target.color_attachment(Some(wgpu_color(color))))],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    fn buffers(&self, kind: PrimitiveKind) -> &GpuAttributeBuffers {
        match kind {
            PrimitiveKind::Rect => &self.rect_buffers,
            PrimitiveKind::Line => &self.line_buffers,
            PrimitiveKind::Dot => &self.dot_buffers,
        }
    }

    fn buffers_mut(&mut self, kind: PrimitiveKind) -> &mut GpuAttributeBuffers {
        match kind {
            PrimitiveKind::Rect => &mut self.rect_buffers,
            PrimitiveKind::Line => &mut self.line_buffers,
            PrimitiveKind::Dot => &mut self.dot_buffers,
        }
    }
}

fn wgpu_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: color.r as f64,
        g: color.g as f64,
        b: color.b as f64,
        a: color.a as f64,
    }
}

enum RendererState {
    Ready(Box<GpuState>),
    /// Initialization failed; the reason is reported by every later call.
    Failed(String),
    Destroyed,
}

fn ready(state: &mut RendererState) -> RenderResult<&mut GpuState> {
    match state {
        RendererState::Ready(gpu) => Ok(&mut **gpu),
        RendererState::Failed(reason) => Err(RenderError::Unavailable(reason.clone())),
        RendererState::Destroyed => Err(RenderError::Destroyed),
    }
}

fn ready_ref(state: &RendererState) -> RenderResult<&GpuState> {
    match state {
        RendererState::Ready(gpu) => Ok(&**gpu),
        RendererState::Failed(reason) => Err(RenderError::Unavailable(reason.clone())),
        RendererState::Destroyed => Err(RenderError::Destroyed),
    }
}

// ──────────────────────────────────────────────
// BatchRenderer
// ──────────────────────────────────────────────

pub struct BatchRenderer {
    state: RendererState,
    tier: BackendTier,
    mode: RenderMode,

    batches: FrameBatches,
    surface: RenderSurface,

    // Color mapping: CPU copy, pushed to the GPU by `refresh_uniforms`
    mapping: ColorMapping,
    registry: ColorScaleRegistry,
    active_scale: Option<(String, Gamut)>,
}

impl BatchRenderer {
    /// Negotiate a backend tier and build every GPU resource. Never fails:
    /// on error the renderer is inert and `init_error()` says why.
    pub fn new(config: &RendererConfig) -> Self {
        Self::with_mode(config, RenderMode::Display)
    }

    pub(crate) fn with_mode(config: &RendererConfig, mode: RenderMode) -> Self {
        let surface = RenderSurface::new(
            config.coordinate_system,
            config.width,
            config.height,
            config.clear_color,
        );
        let mapping = ColorMapping::default();

        let negotiation = negotiate_gpu(config.force_legacy_backend);
        let tier = negotiation.tier;
        let (state, batches) = match negotiation.output {
            Some(context) => {
                let uniforms = FrameUniforms::new(&surface, &mapping, false);
                let built = GpuState::build(context, config, mode, uniforms).and_then(|gpu| {
                    let batches = FrameBatches::new(config.max_lines, config.max_dots, config.max_rects)?;
                    Ok((gpu, batches))
                });
                match built {
                    Ok((gpu, batches)) => (RendererState::Ready(Box::new(gpu)), batches),
                    Err(e) => {
                        log::error!("Renderer initialization failed: {e}");
                        (RendererState::Failed(e.to_string()), FrameBatches::empty())
                    }
                }
            }
            None => {
                let reason = negotiation.failure_summary();
                log::error!("No usable graphics backend: {reason}");
                (RendererState::Failed(reason), FrameBatches::empty())
            }
        };

        Self {
            state,
            tier,
            mode,
            batches,
            surface,
            mapping,
            registry: config.colorscales.clone(),
            active_scale: None,
        }
    }

    pub fn tier(&self) -> BackendTier {
        match self.state {
            RendererState::Ready(_) => self.tier,
            _ => BackendTier::Unavailable,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Why initialization failed, if it did.
    pub fn init_error(&self) -> Option<&str> {
        match &self.state {
            RendererState::Failed(reason) => Some(reason.as_str()),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, RendererState::Ready(_))
    }

    fn ensure_ready(&self) -> RenderResult<()> {
        ready_ref(&self.state).map(|_| ())
    }

    // ── Building a frame ──

    #[allow(clippy::too_many_arguments)]
    pub fn add_line(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
        r: f32,
        g: f32,
        b: f32,
        a: f32,
    ) -> RenderResult<()> {
        self.push_line(LineInstance::new(
            Vec2::new(x1, y1),
            Vec2::new(x2, y2),
            width,
            Color::new(r, g, b, a),
        ))
    }

    /// `symbol` is a raw symbol code; unknown codes draw as filled circles.
    #[allow(clippy::too_many_arguments)]
    pub fn add_dot(
        &mut self,
        x: f32,
        y: f32,
        size: f32,
        symbol: u32,
        r: f32,
        g: f32,
        b: f32,
        a: f32,
        value: f32,
    ) -> RenderResult<()> {
        let symbol = SymbolKind::from_code(symbol).unwrap_or_else(|| {
            log::debug!("Unknown symbol code {symbol}; drawing a filled circle");
            SymbolKind::FilledCircle
        });
        self.push_dot(
            DotInstance::new(Vec2::new(x, y), size, symbol, Color::new(r, g, b, a)).with_value(value),
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_rect(
        &mut self,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        r: f32,
        g: f32,
        b: f32,
        a: f32,
    ) -> RenderResult<()> {
        self.push_rect(RectInstance::new(
            Vec2::new(x1, y1),
            Vec2::new(x2, y2),
            Color::new(r, g, b, a),
        ))
    }

    pub fn count(&self, kind: PrimitiveKind) -> usize {
        self.batches.count(kind)
    }

    pub fn capacity(&self, kind: PrimitiveKind) -> usize {
        self.batches.capacity(kind)
    }

    pub fn frame_state(&self) -> FrameState {
        self.batches.state()
    }

    /// Reallocate one batch and its GPU buffers. Unflushed instances of that kind are lost.
    /// If either allocation fails the old batch and buffers stay as they were.
    pub fn resize_capacity(&mut self, kind: PrimitiveKind, capacity: usize) -> RenderResult<()> {
        let gpu = ready(&mut self.state)?;
        let device = gpu.context.device.clone();
        let previous = gpu.buffers(kind).capacity();
        gpu.buffers_mut(kind).resize(&device, capacity)?;
        if let Err(e) = self.batches.resize(kind, capacity) {
            if let Err(restore) = gpu.buffers_mut(kind).resize(&device, previous) {
                log::error!("Restoring {kind} buffers to {previous} instances failed: {restore}");
            }
            return Err(e);
        }
        Ok(())
    }

    // ── Color mapping ──

    /// Activate a registered colorscale. Unknown names change nothing.
    pub fn set_color_scale(&mut self, name: &str) -> RenderResult<()> {
        let gpu = ready(&mut self.state)?;
        let Some(definition) = self.registry.get(name) else {
            log::warn!("Colorscale `{name}` is not registered");
            return Err(RenderError::ColorScaleNotFound(name.to_string()));
        };
        let gamut = definition.rasterize();
        gpu.colorscale.upload(&gpu.context.queue, &gamut);
        self.active_scale = Some((name.to_string(), gamut));
        self.refresh_uniforms()
    }

    /// Stop color mapping; every instance draws its literal color.
    pub fn clear_color_scale(&mut self) -> RenderResult<()> {
        self.ensure_ready()?;
        self.active_scale = None;
        self.refresh_uniforms()
    }

    pub fn active_color_scale(&self) -> Option<&str> {
        self.active_scale.as_ref().map(|(name, _)| name.as_str())
    }

    pub fn registry(&self) -> &ColorScaleRegistry {
        &self.registry
    }

    pub fn mapping(&self) -> &ColorMapping {
        &self.mapping
    }

    /// Takes effect on the GPU after `refresh_uniforms`.
    pub fn set_domain(&mut self, domain: [f32; 2]) -> RenderResult<()> {
        self.ensure_ready()?;
        if !domain.iter().all(|v| v.is_finite()) {
            return Err(RenderError::NonFinite("domain"));
        }
        self.mapping.domain = domain;
        Ok(())
    }

    /// Takes effect on the GPU after `refresh_uniforms`.
    pub fn set_no_data_value(&mut self, value: f32) -> RenderResult<()> {
        self.ensure_ready()?;
        self.mapping.no_data = value;
        Ok(())
    }

    /// Takes effect on the GPU after `refresh_uniforms`.
    pub fn set_log_scale(&mut self, enabled: bool) -> RenderResult<()> {
        self.ensure_ready()?;
        self.mapping.log_scale = enabled;
        Ok(())
    }

    /// CPU evaluation of the color an instance will be drawn with.
    pub fn resolve_color(&self, color: Color, value: Option<f32>) -> Color {
        let gamut = self.active_scale.as_ref().map(|(_, gamut)| gamut);
        self.mapping.resolve(color, value, gamut)
    }

    fn current_uniforms(&self) -> FrameUniforms {
        FrameUniforms::new(&self.surface, &self.mapping, self.active_scale.is_some())
    }

    /// Push projection, pixel scale and color mapping to the GPU.
    pub fn refresh_uniforms(&mut self) -> RenderResult<()> {
        let uniforms = self.current_uniforms();
        let gpu = ready(&mut self.state)?;
        gpu.programs.write_uniforms(&gpu.context.queue, uniforms);
        Ok(())
    }

    /// Last uniform block written to the GPU.
    pub fn uniforms(&self) -> RenderResult<FrameUniforms> {
        ready_ref(&self.state).map(|gpu| *gpu.programs.uniforms())
    }

    // ── Surface ──

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    /// Resize the target and recompute the projection. A recreated target starts cleared.
    pub fn update_canvas_size(&mut self, width: u32, height: u32) -> RenderResult<()> {
        let gpu = ready(&mut self.state)?;
        let device = gpu.context.device.clone();
        if gpu.target.resize(&device, width, height) {
            log::debug!("Render target resized to {}x{}", gpu.target.width(), gpu.target.height());
            gpu.clear(self.surface.clear_color());
        }
        self.surface.resize(width, height);
        self.refresh_uniforms()
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.surface.set_clear_color(color);
    }

    // ── Drawing ──

    /// Fill the target with the clear color. Batched instances are kept.
    pub fn clear(&mut self) -> RenderResult<()> {
        let gpu = ready_ref(&self.state)?;
        gpu.clear(self.surface.clear_color());
        Ok(())
    }

    /// Upload every non-empty batch, issue one instanced draw per kind in
    /// rect, line, dot order over what the target already holds, then reset
    /// all counts. With nothing batched the target is left untouched.
    pub fn draw(&mut self) -> RenderResult<FrameStats> {
        let gpu = ready(&mut self.state)?;
        let tier = gpu.context.tier;
        let calls = self.batches.begin_flush();

        if !calls.is_empty() {
            for call in &calls {
                gpu.buffers(call.kind)
                    .upload(&gpu.context.queue, &self.batches.column_bytes(call.kind));
            }

            let mut encoder = gpu
                .context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("splot_frame"),
                });

            {
                let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("splot_pass"),
                    color_attachments: &[Some(gpu.target.color_attachment(None))],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });

                pass.set_bind_group(0, &gpu.programs.bind_group, &[]);
                for call in &calls {
                    pass.set_pipeline(gpu.programs.pipeline(call.kind));
                    gpu.buffers(call.kind).bind(&mut pass);
                    let (vertices, instances) = call.ranges(tier);
                    pass.draw(vertices, instances);
                }
            }

            gpu.context.queue.submit(std::iter::once(encoder.finish()));
        }
        self.batches.finish_flush();

        let stats = FrameStats { tier, calls };
        log::debug!(
            "Drew {} instances in {} calls ({} tier)",
            stats.total_instances(),
            stats.call_count(),
            tier
        );
        Ok(stats)
    }

    /// Release every GPU resource. All later calls return `Destroyed`.
    pub fn destroy(&mut self) {
        if matches!(self.state, RendererState::Ready(_)) {
            log::info!("Destroying renderer");
        }
        self.state = RendererState::Destroyed;
        self.batches.finish_flush();
        self.active_scale = None;
    }

    /// Device, queue and adapter, e.g. for reading back the target.
    pub fn context(&self) -> RenderResult<&GpuContext> {
        ready_ref(&self.state).map(|gpu| &gpu.context)
    }

    pub fn target(&self) -> RenderResult<&RenderTarget> {
        ready_ref(&self.state).map(|gpu| &gpu.target)
    }
}

impl PrimitiveSink for BatchRenderer {
    fn push_line(&mut self, line: LineInstance) -> RenderResult<()> {
        self.ensure_ready()?;
        self.batches.push_line(line)
    }

    fn push_dot(&mut self, dot: DotInstance) -> RenderResult<()> {
        self.ensure_ready()?;
        self.batches.push_dot(dot)
    }

    fn push_rect(&mut self, rect: RectInstance) -> RenderResult<()> {
        self.ensure_ready()?;
        self.batches.push_rect(rect)
    }
}

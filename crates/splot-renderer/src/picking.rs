// Hit-testing twin of the display renderer: same geometry, colors replaced by
// picking ids, no blending and no multisampling.

use splot_core::{
    Color, DotInstance, LineInstance, PickId, PrimitiveKind, PrimitiveSink, RectInstance,
    RenderResult, RendererConfig, SymbolKind, Vec2,
};

use crate::{BatchRenderer, FrameStats, GpuContext, RenderMode, RenderTarget};

pub struct PickingRenderer {
    inner: BatchRenderer,
}

impl PickingRenderer {
    /// Uses the display config's surface and capacities. Antialiasing is always
    /// off and the target clears to transparent black (id "none").
    pub fn new(config: &RendererConfig) -> Self {
        let config = RendererConfig {
            antialias: false,
            clear_color: Color::TRANSPARENT,
            ..config.clone()
        };
        Self {
            inner: BatchRenderer::with_mode(&config, RenderMode::Picking),
        }
    }

    pub fn renderer(&self) -> &BatchRenderer {
        &self.inner
    }

    pub fn add_line(
        &mut self,
        id: PickId,
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        width: f32,
    ) -> RenderResult<()> {
        self.inner.push_line(
            LineInstance::new(Vec2::new(x1, y1), Vec2::new(x2, y2), width, id.to_color()).opaque(),
        )
    }

    pub fn add_dot(&mut self, id: PickId, x: f32, y: f32, size: f32, symbol: SymbolKind) -> RenderResult<()> {
        self.inner
            .push_dot(DotInstance::new(Vec2::new(x, y), size, symbol, id.to_color()).opaque())
    }

    pub fn add_rect(&mut self, id: PickId, x1: f32, y1: f32, x2: f32, y2: f32) -> RenderResult<()> {
        self.inner
            .push_rect(RectInstance::new(Vec2::new(x1, y1), Vec2::new(x2, y2), id.to_color()).opaque())
    }

    pub fn count(&self, kind: PrimitiveKind) -> usize {
        self.inner.count(kind)
    }

    /// Reset every pixel to "no id".
    pub fn clear(&mut self) -> RenderResult<()> {
        self.inner.clear()
    }

    pub fn draw(&mut self) -> RenderResult<FrameStats> {
        self.inner.draw()
    }

    pub fn update_canvas_size(&mut self, width: u32, height: u32) -> RenderResult<()> {
        self.inner.update_canvas_size(width, height)
    }

    pub fn destroy(&mut self) {
        self.inner.destroy();
    }

    pub fn context(&self) -> RenderResult<&GpuContext> {
        self.inner.context()
    }

    pub fn target(&self) -> RenderResult<&RenderTarget> {
        self.inner.target()
    }
}

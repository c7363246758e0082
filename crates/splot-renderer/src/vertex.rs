// GPU-side layouts: one vertex buffer per attribute column, plus the frame uniform block.

use bytemuck::{Pod, Zeroable};
use splot_core::{BackendTier, ColorMapping, PrimitiveKind, RenderSurface};

/// Two triangles per quad.
pub const VERTICES_PER_INSTANCE: u32 = 6;

const fn attr(shader_location: u32, format: wgpu::VertexFormat) -> wgpu::VertexAttribute {
    wgpu::VertexAttribute {
        offset: 0,
        shader_location,
        format,
    }
}

static LINE_ATTRIBUTES: [wgpu::VertexAttribute; 6] = [
    attr(0, wgpu::VertexFormat::Float32x2), // start
    attr(1, wgpu::VertexFormat::Float32x2), // end
    attr(2, wgpu::VertexFormat::Float32),   // width
    attr(3, wgpu::VertexFormat::Float32x4), // color
    attr(4, wgpu::VertexFormat::Float32),   // value
    attr(5, wgpu::VertexFormat::Uint32),    // flags
];

static DOT_ATTRIBUTES: [wgpu::VertexAttribute; 6] = [
    attr(0, wgpu::VertexFormat::Float32x2), // position
    attr(1, wgpu::VertexFormat::Float32),   // size
    attr(2, wgpu::VertexFormat::Float32x4), // color
    attr(3, wgpu::VertexFormat::Uint32),    // symbol
    attr(4, wgpu::VertexFormat::Float32),   // value
    attr(5, wgpu::VertexFormat::Uint32),    // flags
];

static RECT_ATTRIBUTES: [wgpu::VertexAttribute; 5] = [
    attr(0, wgpu::VertexFormat::Float32x2), // start
    attr(1, wgpu::VertexFormat::Float32x2), // end
    attr(2, wgpu::VertexFormat::Float32x4), // color
    attr(3, wgpu::VertexFormat::Float32),   // value
    attr(4, wgpu::VertexFormat::Uint32),    // flags
];

/// Attributes of `kind` in shader location order.
pub fn attributes(kind: PrimitiveKind) -> &'static [wgpu::VertexAttribute] {
    match kind {
        PrimitiveKind::Line => &LINE_ATTRIBUTES,
        PrimitiveKind::Dot => &DOT_ATTRIBUTES,
        PrimitiveKind::Rect => &RECT_ATTRIBUTES,
    }
}

/// Primary steps attributes per instance; legacy feeds pre-replicated columns per vertex.
pub fn step_mode(tier: BackendTier) -> wgpu::VertexStepMode {
    match tier {
        BackendTier::Legacy => wgpu::VertexStepMode::Vertex,
        _ => wgpu::VertexStepMode::Instance,
    }
}

/// One tightly packed buffer layout per attribute.
pub fn buffer_layouts(kind: PrimitiveKind, tier: BackendTier) -> Vec<wgpu::VertexBufferLayout<'static>> {
    attributes(kind)
        .iter()
        .map(|attribute| wgpu::VertexBufferLayout {
            array_stride: attribute.format.size(),
            step_mode: step_mode(tier),
            attributes: std::slice::from_ref(attribute),
        })
        .collect()
}

// ──────────────────────────────────────────────
// Uniforms
// ──────────────────────────────────────────────

/// Mirrors `FrameUniforms` in the WGSL prelude. 80 bytes.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    /// mat3x3 columns, each padded to vec4.
    pub projection: [[f32; 4]; 3],
    pub pixel_scale: [f32; 2],
    pub domain: [f32; 2],
    pub no_data: f32,
    pub log_scale: u32,
    pub colorscale_enabled: u32,
    pub _pad: u32,
}

impl FrameUniforms {
    pub fn new(surface: &RenderSurface, mapping: &ColorMapping, colorscale_enabled: bool) -> Self {
        let cols = surface.projection().to_cols_array_2d();
        let pad = |c: [f32; 3]| [c[0], c[1], c[2], 0.0];
        Self {
            projection: [pad(cols[0]), pad(cols[1]), pad(cols[2])],
            pixel_scale: surface.pixel_scale().to_array(),
            domain: mapping.domain,
            no_data: mapping.no_data,
            log_scale: mapping.log_scale as u32,
            colorscale_enabled: colorscale_enabled as u32,
            _pad: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splot_core::{Color, CoordinateSystem};

    #[test]
    fn layouts_match_attribute_sizes() {
        let layouts = buffer_layouts(PrimitiveKind::Line, BackendTier::Primary);
        let strides: Vec<u64> = layouts.iter().map(|l| l.array_stride).collect();
        assert_eq!(strides, vec![8, 8, 4, 16, 4, 4]);
        assert!(layouts
            .iter()
            .all(|l| l.step_mode == wgpu::VertexStepMode::Instance));

        let legacy = buffer_layouts(PrimitiveKind::Rect, BackendTier::Legacy);
        assert_eq!(legacy.len(), 5);
        assert!(legacy.iter().all(|l| l.step_mode == wgpu::VertexStepMode::Vertex));
    }

    #[test]
    fn shader_locations_are_sequential() {
        for kind in PrimitiveKind::DRAW_ORDER {
            for (i, a) in attributes(kind).iter().enumerate() {
                assert_eq!(a.shader_location, i as u32);
                assert_eq!(a.offset, 0);
            }
        }
    }

    #[test]
    fn uniform_block_is_80_bytes() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 80);
    }

    #[test]
    fn uniforms_carry_projection_and_mapping() {
        let surface = RenderSurface::new(CoordinateSystem::PixelSpace, 200, 100, Color::BLACK);
        let mapping = ColorMapping {
            domain: [1.0, 5.0],
            no_data: -1.0,
            log_scale: true,
        };
        let u = FrameUniforms::new(&surface, &mapping, true);
        assert_eq!(u.projection[0], [0.01, 0.0, 0.0, 0.0]);
        assert_eq!(u.projection[1], [0.0, -0.02, 0.0, 0.0]);
        assert_eq!(u.projection[2], [-1.0, 1.0, 1.0, 0.0]);
        assert_eq!(u.pixel_scale, [1.0, 1.0]);
        assert_eq!(u.domain, [1.0, 5.0]);
        assert_eq!(u.no_data, -1.0);
        assert_eq!((u.log_scale, u.colorscale_enabled), (1, 1));
    }
}

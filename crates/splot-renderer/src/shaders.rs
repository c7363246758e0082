// WGSL shader sources, assembled per (tier, kind).
//
// Geometry, color mapping and symbol coverage are written once in the prelude
// and kind bodies; the tier adaptor only changes how the quad corner index is
// derived from the vertex index.

use splot_core::{BackendTier, PrimitiveKind};

const PRELUDE: &str = r#"
const FLAG_HAS_VALUE: u32 = 1u;
const FLAG_OPAQUE: u32 = 2u;
const MIN_POSITIVE: f32 = 1.17549435e-38;

struct FrameUniforms {
    projection: mat3x3<f32>,
    pixel_scale: vec2<f32>,
    domain: vec2<f32>,
    no_data: f32,
    log_scale: u32,
    colorscale_enabled: u32,
    _pad: u32,
};

@group(0) @binding(0)
var<uniform> frame: FrameUniforms;
@group(0) @binding(1)
var colorscale: texture_2d<f32>;
@group(0) @binding(2)
var colorscale_sampler: sampler;

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) @interpolate(flat) flags: u32,
    @location(2) quad_pos: vec2<f32>,
    @location(3) size: f32,
    @location(4) @interpolate(flat) symbol: u32,
};

fn unit_corner(index: u32) -> vec2<f32> {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 0.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(0.0, 0.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(0.0, 1.0),
    );
    return corners[index];
}

fn translation(t: vec2<f32>) -> mat3x3<f32> {
    return mat3x3<f32>(
        vec3<f32>(1.0, 0.0, 0.0),
        vec3<f32>(0.0, 1.0, 0.0),
        vec3<f32>(t, 1.0),
    );
}

fn scaling(s: vec2<f32>) -> mat3x3<f32> {
    return mat3x3<f32>(
        vec3<f32>(s.x, 0.0, 0.0),
        vec3<f32>(0.0, s.y, 0.0),
        vec3<f32>(0.0, 0.0, 1.0),
    );
}

fn rotation(angle: f32) -> mat3x3<f32> {
    let c = cos(angle);
    let s = sin(angle);
    return mat3x3<f32>(
        vec3<f32>(c, s, 0.0),
        vec3<f32>(-s, c, 0.0),
        vec3<f32>(0.0, 0.0, 1.0),
    );
}

fn to_clip(model: mat3x3<f32>, corner: vec2<f32>) -> vec4<f32> {
    let p = frame.projection * model * vec3<f32>(corner, 1.0);
    return vec4<f32>(p.xy, 0.0, 1.0);
}

// Gamut position in [0, 1], or -1 when the literal color should be kept.
fn normalize_value(value: f32) -> f32 {
    if (value == frame.no_data) {
        return -1.0;
    }
    var lo = frame.domain.x;
    var hi = frame.domain.y;
    var v = value;
    if (frame.log_scale != 0u) {
        if (v <= 0.0) {
            return -1.0;
        }
        lo = log2(max(lo, MIN_POSITIVE));
        hi = log2(max(hi, MIN_POSITIVE));
        v = log2(v);
    }
    let span = hi - lo;
    if (span == 0.0) {
        return 0.0;
    }
    return clamp((v - lo) / span, 0.0, 1.0);
}

fn instance_color(color: vec4<f32>, value: f32, flags: u32) -> vec4<f32> {
    if (frame.colorscale_enabled == 0u || (flags & FLAG_HAS_VALUE) == 0u) {
        return color;
    }
    let t = normalize_value(value);
    if (t < 0.0) {
        return color;
    }
    let index = min(floor(t * 256.0), 255.0);
    let uv = vec2<f32>((index + 0.5) / 256.0, 0.5);
    let mapped = textureSampleLevel(colorscale, colorscale_sampler, uv, 0.0);
    return vec4<f32>(mapped.rgb, mapped.a * color.a);
}

// Premultiplied output; opaque instances ignore alpha entirely.
fn shade(color: vec4<f32>, coverage: f32, flags: u32) -> vec4<f32> {
    if ((flags & FLAG_OPAQUE) != 0u) {
        return vec4<f32>(color.rgb, 1.0);
    }
    let a = color.a * coverage;
    return vec4<f32>(color.rgb * a, a);
}
"#;

const PRIMARY_ADAPTOR: &str = r#"
fn corner_index(vertex_index: u32) -> u32 {
    return vertex_index;
}
"#;

const LEGACY_ADAPTOR: &str = r#"
fn corner_index(vertex_index: u32) -> u32 {
    return vertex_index % 6u;
}
"#;

const RECT_BODY: &str = r#"
struct RectInput {
    @builtin(vertex_index) vertex_index: u32,
    @location(0) start: vec2<f32>,
    @location(1) end: vec2<f32>,
    @location(2) color: vec4<f32>,
    @location(3) value: f32,
    @location(4) flags: u32,
};

@vertex
fn vs_main(in: RectInput) -> VertexOutput {
    let corner = unit_corner(corner_index(in.vertex_index));
    let model = translation(in.start) * scaling(in.end - in.start);
    var out: VertexOutput;
    out.clip_position = to_clip(model, corner);
    out.color = instance_color(in.color, in.value, in.flags);
    out.flags = in.flags;
    out.quad_pos = corner;
    out.size = 0.0;
    out.symbol = 0u;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return shade(in.color, 1.0, in.flags);
}
"#;

const LINE_BODY: &str = r#"
struct LineInput {
    @builtin(vertex_index) vertex_index: u32,
    @location(0) start: vec2<f32>,
    @location(1) end: vec2<f32>,
    @location(2) width: f32,
    @location(3) color: vec4<f32>,
    @location(4) value: f32,
    @location(5) flags: u32,
};

@vertex
fn vs_main(in: LineInput) -> VertexOutput {
    let corner = unit_corner(corner_index(in.vertex_index)) - vec2<f32>(0.0, 0.5);
    // Lay the segment out in pixels so the width is independent of the coordinate system.
    let delta_px = (in.end - in.start) / frame.pixel_scale;
    let angle = atan2(delta_px.y, delta_px.x);
    let model = translation(in.start)
        * scaling(frame.pixel_scale)
        * rotation(angle)
        * scaling(vec2<f32>(length(delta_px), in.width));
    var out: VertexOutput;
    out.clip_position = to_clip(model, corner);
    out.color = instance_color(in.color, in.value, in.flags);
    out.flags = in.flags;
    out.quad_pos = corner;
    out.size = in.width;
    out.symbol = 0u;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return shade(in.color, 1.0, in.flags);
}
"#;

const DOT_BODY: &str = r#"
struct DotInput {
    @builtin(vertex_index) vertex_index: u32,
    @location(0) position: vec2<f32>,
    @location(1) size: f32,
    @location(2) color: vec4<f32>,
    @location(3) symbol: u32,
    @location(4) value: f32,
    @location(5) flags: u32,
};

@vertex
fn vs_main(in: DotInput) -> VertexOutput {
    let corner = unit_corner(corner_index(in.vertex_index)) - vec2<f32>(0.5, 0.5);
    let model = translation(in.position) * scaling(vec2<f32>(in.size, in.size) * frame.pixel_scale);
    var out: VertexOutput;
    out.clip_position = to_clip(model, corner);
    out.color = instance_color(in.color, in.value, in.flags);
    out.flags = in.flags;
    out.quad_pos = corner;
    out.size = in.size;
    out.symbol = in.symbol;
    return out;
}

fn circle_coverage(quad_pos: vec2<f32>) -> f32 {
    return 1.0 - smoothstep(0.5, 0.55, length(quad_pos));
}

fn inside_triangle(quad_pos: vec2<f32>) -> bool {
    return abs(quad_pos.x) * 2.0 <= quad_pos.y + 0.5;
}

// quad_pos: [-0.5, 0.5] per axis, y down. size in pixels.
fn symbol_coverage(symbol: u32, quad_pos: vec2<f32>, size: f32) -> f32 {
    let border = max(0.1 * size, 1.2);
    let px = quad_pos * size;
    let half_border = border * 0.5;
    var coverage = 1.0;
    switch symbol {
        case 0u: {
            coverage = 1.0;
        }
        case 1u: {
            let inner = size * 0.5 - border;
            if (abs(px.x) < inner && abs(px.y) < inner) {
                coverage = 0.0;
            }
        }
        case 3u: {
            if (length(quad_pos) < 0.5 - border / size) {
                coverage = 0.0;
            } else {
                coverage = circle_coverage(quad_pos);
            }
        }
        case 4u: {
            if (abs(px.x) > half_border && abs(px.y) > half_border) {
                coverage = 0.0;
            }
        }
        case 5u: {
            if (abs(abs(px.x) - abs(px.y)) > half_border) {
                coverage = 0.0;
            }
        }
        case 6u: {
            if (!inside_triangle(quad_pos)) {
                coverage = 0.0;
            }
        }
        case 7u: {
            if (!inside_triangle(quad_pos)) {
                coverage = 0.0;
            } else {
                let b = border / size;
                let from_top = quad_pos.y + 0.5;
                let side_distance = (from_top - abs(quad_pos.x) * 2.0) / sqrt(5.0);
                let base_distance = 1.0 - from_top;
                if (side_distance > b && base_distance > b) {
                    coverage = 0.0;
                }
            }
        }
        default: {
            coverage = circle_coverage(quad_pos);
        }
    }
    return coverage;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    var coverage = symbol_coverage(in.symbol, in.quad_pos, in.size);
    if ((in.flags & FLAG_OPAQUE) != 0u) {
        coverage = step(0.5, coverage);
    }
    if (coverage <= 0.0) {
        discard;
    }
    return shade(in.color, coverage, in.flags);
}
"#;

fn adaptor(tier: BackendTier) -> Option<&'static str> {
    match tier {
        BackendTier::Primary => Some(PRIMARY_ADAPTOR),
        BackendTier::Legacy => Some(LEGACY_ADAPTOR),
        BackendTier::Unavailable => None,
    }
}

fn body(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Rect => RECT_BODY,
        PrimitiveKind::Line => LINE_BODY,
        PrimitiveKind::Dot => DOT_BODY,
    }
}

/// Full WGSL module for `kind` on `tier`. `None` for the unavailable tier.
pub fn shader_source(tier: BackendTier, kind: PrimitiveKind) -> Option<String> {
    let adaptor = adaptor(tier)?;
    Some([PRELUDE, adaptor, body(kind)].concat())
}

// Core types for the splot batched-primitive renderer.
// Everything here is GPU-free: the renderer crate mirrors these types into
// vertex buffers and uniforms.

mod colorscale;
mod config;
mod error;
mod picking;
mod surface;
mod symbol;
mod transform;

use serde::{Deserialize, Serialize};

pub use glam::{Mat3, Vec2};

pub use colorscale::{
    ColorMapping, ColorScaleDefinition, ColorScaleRegistry, ColorStop, Gamut, DEFAULT_NO_DATA,
    GAMUT_SIZE,
};
pub use config::{RendererConfig, DEFAULT_CAPACITY};
pub use error::{RenderError, RenderResult};
pub use picking::{IdAllocator, PickId, MAX_PICK_ID};
pub use surface::{CoordinateSystem, RenderSurface};
pub use symbol::{border_width, coverage_for_code, SymbolKind, CIRCLE_BORDER};
pub use transform::{dot_model, line_model, quad_corner, rect_model, QUAD_CORNERS};

// ──────────────────────────────────────────────
// Colors
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Quantize to 8-bit channels, clamping out-of-range components.
    pub fn to_rgba8(self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    pub fn from_rgba8(rgba: [u8; 4]) -> Self {
        Self::new(
            rgba[0] as f32 / 255.0,
            rgba[1] as f32 / 255.0,
            rgba[2] as f32 / 255.0,
            rgba[3] as f32 / 255.0,
        )
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (the leading `#` is optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if !digits.is_ascii() {
            return None;
        }
        let byte = |s: &str| u8::from_str_radix(s, 16).ok();
        let rgba = match digits.len() {
            3 => {
                let mut out = [255u8; 4];
                for (i, c) in digits.chars().enumerate() {
                    let v = c.to_digit(16)? as u8;
                    out[i] = v * 17;
                }
                out
            }
            6 => [byte(&digits[0..2])?, byte(&digits[2..4])?, byte(&digits[4..6])?, 255],
            8 => [
                byte(&digits[0..2])?,
                byte(&digits[2..4])?,
                byte(&digits[4..6])?,
                byte(&digits[6..8])?,
            ],
            _ => return None,
        };
        Some(Self::from_rgba8(rgba))
    }

    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
            self.a + (other.a - self.a) * t,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

// ──────────────────────────────────────────────
// Primitive kinds
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Rect,
    Line,
    Dot,
}

impl PrimitiveKind {
    /// Fixed painter's order: later kinds paint over earlier ones.
    pub const DRAW_ORDER: [PrimitiveKind; 3] = [PrimitiveKind::Rect, PrimitiveKind::Line, PrimitiveKind::Dot];

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Rect => "rect",
            PrimitiveKind::Line => "line",
            PrimitiveKind::Dot => "dot",
        }
    }
}

impl std::fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ──────────────────────────────────────────────
// Instances
// ──────────────────────────────────────────────

/// A line segment, `width` in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineInstance {
    pub start: Vec2,
    pub end: Vec2,
    pub width: f32,
    pub color: Color,
    /// Scalar for colorscale mapping. `None` always draws `color`.
    pub value: Option<f32>,
    /// Ignore blending and write the color at full opacity (picking).
    pub opaque: bool,
}

impl LineInstance {
    pub fn new(start: Vec2, end: Vec2, width: f32, color: Color) -> Self {
        Self {
            start,
            end,
            width,
            color,
            value: None,
            opaque: false,
        }
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn opaque(mut self) -> Self {
        self.opaque = true;
        self
    }

    pub fn validate(&self) -> RenderResult<()> {
        ensure_finite("x1", self.start.x)?;
        ensure_finite("y1", self.start.y)?;
        ensure_finite("x2", self.end.x)?;
        ensure_finite("y2", self.end.y)?;
        ensure_finite("width", self.width)?;
        ensure_color(self.color)?;
        ensure_value(self.value)
    }
}

/// A point marker, `size` in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotInstance {
    pub position: Vec2,
    pub size: f32,
    pub symbol: SymbolKind,
    pub color: Color,
    pub value: Option<f32>,
    pub opaque: bool,
}

impl DotInstance {
    pub fn new(position: Vec2, size: f32, symbol: SymbolKind, color: Color) -> Self {
        Self {
            position,
            size,
            symbol,
            color,
            value: None,
            opaque: false,
        }
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn opaque(mut self) -> Self {
        self.opaque = true;
        self
    }

    pub fn validate(&self) -> RenderResult<()> {
        ensure_finite("x", self.position.x)?;
        ensure_finite("y", self.position.y)?;
        ensure_finite("size", self.size)?;
        ensure_color(self.color)?;
        ensure_value(self.value)
    }
}

/// An axis-aligned rectangle spanning `start`..`end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectInstance {
    pub start: Vec2,
    pub end: Vec2,
    pub color: Color,
    pub value: Option<f32>,
    pub opaque: bool,
}

impl RectInstance {
    pub fn new(start: Vec2, end: Vec2, color: Color) -> Self {
        Self {
            start,
            end,
            color,
            value: None,
            opaque: false,
        }
    }

    pub fn with_value(mut self, value: f32) -> Self {
        self.value = Some(value);
        self
    }

    pub fn opaque(mut self) -> Self {
        self.opaque = true;
        self
    }

    pub fn validate(&self) -> RenderResult<()> {
        ensure_finite("x1", self.start.x)?;
        ensure_finite("y1", self.start.y)?;
        ensure_finite("x2", self.end.x)?;
        ensure_finite("y2", self.end.y)?;
        ensure_color(self.color)?;
        ensure_value(self.value)
    }
}

fn ensure_finite(argument: &'static str, v: f32) -> RenderResult<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(RenderError::NonFinite(argument))
    }
}

fn ensure_color(color: Color) -> RenderResult<()> {
    ensure_finite("r", color.r)?;
    ensure_finite("g", color.g)?;
    ensure_finite("b", color.b)?;
    ensure_finite("a", color.a)
}

fn ensure_value(value: Option<f32>) -> RenderResult<()> {
    match value {
        Some(v) => ensure_finite("value", v),
        None => Ok(()),
    }
}

// ──────────────────────────────────────────────
// Backend tier
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendTier {
    /// Native per-instance attribute stepping.
    Primary,
    /// Downlevel backend; instancing emulated by replicating attributes per vertex.
    Legacy,
    Unavailable,
}

impl std::fmt::Display for BackendTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendTier::Primary => f.write_str("primary"),
            BackendTier::Legacy => f.write_str("legacy"),
            BackendTier::Unavailable => f.write_str("unavailable"),
        }
    }
}

// ──────────────────────────────────────────────
// Trait: PrimitiveSink
// ──────────────────────────────────────────────

/// Anything that accepts per-frame primitives.
/// The GPU renderer and the bare CPU batches both implement this.
pub trait PrimitiveSink {
    fn push_line(&mut self, line: LineInstance) -> RenderResult<()>;
    fn push_dot(&mut self, dot: DotInstance) -> RenderResult<()>;
    fn push_rect(&mut self, rect: RectInstance) -> RenderResult<()>;
}

// Marker symbols and the CPU mirror of the dot fragment stage.
//
// The WGSL in splot-renderer evaluates exactly these tests; keeping a Rust
// copy lets the shape rules be tested (and used for hit tests) without a GPU.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Antialiasing band of the circle edge, in local units.
pub const CIRCLE_BORDER: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum SymbolKind {
    FilledRect = 0,
    HollowRect = 1,
    #[default]
    FilledCircle = 2,
    HollowCircle = 3,
    Plus = 4,
    Cross = 5,
    FilledTriangle = 6,
    HollowTriangle = 7,
}

impl SymbolKind {
    pub const ALL: [SymbolKind; 8] = [
        SymbolKind::FilledRect,
        SymbolKind::HollowRect,
        SymbolKind::FilledCircle,
        SymbolKind::HollowCircle,
        SymbolKind::Plus,
        SymbolKind::Cross,
        SymbolKind::FilledTriangle,
        SymbolKind::HollowTriangle,
    ];

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// Coverage in `[0, 1]` of a fragment at `local` (quad-relative, each axis
    /// in `[-0.5, 0.5]`, y pointing down) for a marker `size` pixels wide.
    /// Zero means the fragment is discarded.
    pub fn coverage(self, local: Vec2, size: f32) -> f32 {
        coverage_for_code(self.code(), local, size)
    }

    /// Coverage used by opaque (picking) instances: no partial alpha.
    pub fn hard_coverage(self, local: Vec2, size: f32) -> f32 {
        if self.coverage(local, size) >= 0.5 {
            1.0
        } else {
            0.0
        }
    }
}

/// Stroke width in pixels for hollow shapes, plus and cross.
pub fn border_width(size: f32) -> f32 {
    (0.1 * size).max(1.2)
}

/// Raw-code variant of [`SymbolKind::coverage`]; unknown codes draw a filled circle.
pub fn coverage_for_code(code: u32, local: Vec2, size: f32) -> f32 {
    let border = border_width(size);
    let px = local * size;
    match SymbolKind::from_code(code).unwrap_or(SymbolKind::FilledCircle) {
        SymbolKind::FilledRect => 1.0,
        SymbolKind::HollowRect => {
            let inner = size * 0.5 - border;
            if px.x.abs() < inner && px.y.abs() < inner {
                0.0
            } else {
                1.0
            }
        }
        SymbolKind::FilledCircle => circle(local),
        SymbolKind::HollowCircle => {
            let inner = 0.5 - border / size;
            if local.length() < inner {
                0.0
            } else {
                circle(local)
            }
        }
        SymbolKind::Plus => {
            let half = border * 0.5;
            if px.x.abs() > half && px.y.abs() > half {
                0.0
            } else {
                1.0
            }
        }
        SymbolKind::Cross => {
            let half = border * 0.5;
            if (px.x.abs() - px.y.abs()).abs() > half {
                0.0
            } else {
                1.0
            }
        }
        SymbolKind::FilledTriangle => {
            if inside_triangle(local) {
                1.0
            } else {
                0.0
            }
        }
        SymbolKind::HollowTriangle => {
            if !inside_triangle(local) {
                return 0.0;
            }
            let b = border / size;
            let from_top = local.y + 0.5;
            // Perpendicular distance to the slanted sides of |x|*2 = y'.
            let side_distance = (from_top - local.x.abs() * 2.0) / 5.0_f32.sqrt();
            let base_distance = 1.0 - from_top;
            if side_distance > b && base_distance > b {
                0.0
            } else {
                1.0
            }
        }
    }
}

fn circle(local: Vec2) -> f32 {
    1.0 - smoothstep(0.5, 0.5 + CIRCLE_BORDER, local.length())
}

fn inside_triangle(local: Vec2) -> bool {
    local.x.abs() * 2.0 <= local.y + 0.5
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

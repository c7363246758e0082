// Synthetic scatter data: a spiral of valued points inside a plot frame.

use splot_core::{Color, CoordinateSystem, SymbolKind, Vec2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenePoint {
    /// Pixel position, origin top-left.
    pub position: Vec2,
    pub value: f32,
    pub symbol: SymbolKind,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub width: u32,
    pub height: u32,
    pub points: Vec<ScenePoint>,
}

/// Gap between the target edge and the plot frame, in pixels.
pub const MARGIN: f32 = 24.0;
pub const DOT_SIZE: f32 = 9.0;
pub const FRAME_COLOR: Color = Color::rgb(0.85, 0.85, 0.85);
pub const TRACE_COLOR: Color = Color::new(0.3, 0.3, 0.3, 0.5);

impl Scene {
    /// Deterministic spiral of `count` points. Every `no_data_every`-th point
    /// carries `no_data` instead of a measurement (0 disables that).
    pub fn spiral(count: usize, width: u32, height: u32, no_data: f32, no_data_every: usize) -> Self {
        let center = Vec2::new(width as f32, height as f32) * 0.5;
        let radius = (center.min_element() - MARGIN).max(1.0);
        let turns = 6.0;

        let points = (0..count)
            .map(|i| {
                let t = if count > 1 { i as f32 / (count - 1) as f32 } else { 0.0 };
                let angle = t * turns * std::f32::consts::TAU;
                let position = center + Vec2::new(angle.cos(), angle.sin()) * radius * t;
                let value = if no_data_every > 0 && i % no_data_every == no_data_every - 1 {
                    no_data
                } else {
                    // Strictly positive so the same data works under log scale.
                    1.0 + 99.0 * t
                };
                ScenePoint {
                    position,
                    value,
                    symbol: SymbolKind::ALL[i % SymbolKind::ALL.len()],
                }
            })
            .collect();

        Self { width, height, points }
    }

    /// Smallest and largest value, ignoring `no_data`. `None` when every point lacks data.
    pub fn value_range(&self, no_data: f32) -> Option<[f32; 2]> {
        self.points
            .iter()
            .map(|p| p.value)
            .filter(|v| *v != no_data)
            .fold(None, |range, v| match range {
                None => Some([v, v]),
                Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
            })
    }

    /// Corners of the plot frame, in pixels.
    pub fn frame(&self) -> (Vec2, Vec2) {
        (
            Vec2::splat(MARGIN * 0.5),
            Vec2::new(self.width as f32, self.height as f32) - Vec2::splat(MARGIN * 0.5),
        )
    }

    /// Pixel under the middle point, clamped into the target.
    pub fn middle_pixel(&self) -> Option<[u32; 2]> {
        let point = self.points.get(self.points.len() / 2)?;
        Some([
            (point.position.x.max(0.0) as u32).min(self.width.saturating_sub(1)),
            (point.position.y.max(0.0) as u32).min(self.height.saturating_sub(1)),
        ])
    }

    /// Map a pixel position into the coordinate system the renderer expects.
    /// Sizes and widths stay in pixels either way.
    pub fn place(&self, position: Vec2, coordinate_system: CoordinateSystem) -> Vec2 {
        match coordinate_system {
            CoordinateSystem::PixelSpace => position,
            CoordinateSystem::NormalizedDeviceSpace => Vec2::new(
                position.x / self.width as f32 * 2.0 - 1.0,
                1.0 - position.y / self.height as f32 * 2.0,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spiral_is_deterministic_and_inside_the_target() {
        let a = Scene::spiral(500, 320, 240, -1.0, 0);
        let b = Scene::spiral(500, 320, 240, -1.0, 0);
        assert_eq!(a.points, b.points);
        for p in &a.points {
            assert!(p.position.x >= 0.0 && p.position.x <= 320.0);
            assert!(p.position.y >= 0.0 && p.position.y <= 240.0);
        }
    }

    #[test]
    fn value_range_skips_no_data() {
        let scene = Scene::spiral(100, 200, 200, -9999.0, 10);
        assert_eq!(scene.points[9].value, -9999.0);
        let [lo, hi] = scene.value_range(-9999.0).unwrap();
        assert_eq!(lo, 1.0);
        assert!(hi <= 100.0 && hi > 90.0);
    }

    #[test]
    fn all_no_data_has_no_range() {
        let scene = Scene::spiral(5, 100, 100, 0.5, 1);
        assert_eq!(scene.value_range(0.5), None);
    }

    #[test]
    fn symbols_cycle_through_every_kind() {
        let scene = Scene::spiral(16, 100, 100, -1.0, 0);
        assert_eq!(scene.points[0].symbol, SymbolKind::ALL[0]);
        assert_eq!(scene.points[8].symbol, SymbolKind::ALL[0]);
        assert_eq!(scene.points[7].symbol, SymbolKind::ALL[7]);
    }

    #[test]
    fn normalized_placement_flips_y() {
        let scene = Scene::spiral(1, 200, 100, -1.0, 0);
        let ndc = CoordinateSystem::NormalizedDeviceSpace;
        assert_eq!(scene.place(Vec2::new(0.0, 0.0), ndc), Vec2::new(-1.0, 1.0));
        assert_eq!(scene.place(Vec2::new(200.0, 100.0), ndc), Vec2::new(1.0, -1.0));
    }
}

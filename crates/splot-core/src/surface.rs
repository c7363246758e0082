use glam::{Mat3, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Positions in pixels, origin top-left, y down.
    #[default]
    PixelSpace,
    /// Positions already in clip space `[-1, 1]`, y up.
    NormalizedDeviceSpace,
}

/// Size, coordinate system and clear color of a render target, plus the
/// projection derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSurface {
    coordinate_system: CoordinateSystem,
    width: u32,
    height: u32,
    clear_color: Color,
    projection: Mat3,
}

impl RenderSurface {
    pub fn new(coordinate_system: CoordinateSystem, width: u32, height: u32, clear_color: Color) -> Self {
        let mut surface = Self {
            coordinate_system,
            width: width.max(1),
            height: height.max(1),
            clear_color,
            projection: Mat3::IDENTITY,
        };
        surface.projection = surface.compute_projection();
        surface
    }

    /// Returns true if the size actually changed. Zero sizes clamp to 1.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        let width = width.max(1);
        let height = height.max(1);
        if self.width == width && self.height == height {
            return false;
        }
        self.width = width;
        self.height = height;
        self.projection = self.compute_projection();
        true
    }

    pub fn coordinate_system(&self) -> CoordinateSystem {
        self.coordinate_system
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    pub fn projection(&self) -> Mat3 {
        self.projection
    }

    /// Converts pixel-denominated sizes (line width, dot size) to surface units.
    /// The y component is negative in normalized space so that local "down"
    /// matches pixel space.
    pub fn pixel_scale(&self) -> Vec2 {
        match self.coordinate_system {
            CoordinateSystem::PixelSpace => Vec2::ONE,
            CoordinateSystem::NormalizedDeviceSpace => {
                Vec2::new(2.0 / self.width as f32, -2.0 / self.height as f32)
            }
        }
    }

    fn compute_projection(&self) -> Mat3 {
        match self.coordinate_system {
            CoordinateSystem::PixelSpace => Mat3::from_cols(
                Vec3::new(2.0 / self.width as f32, 0.0, 0.0),
                Vec3::new(0.0, -2.0 / self.height as f32, 0.0),
                Vec3::new(-1.0, 1.0, 1.0),
            ),
            CoordinateSystem::NormalizedDeviceSpace => Mat3::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn pixel_projection_maps_corners_to_clip_space() {
        let s = RenderSurface::new(CoordinateSystem::PixelSpace, 800, 600, Color::BLACK);
        let p = s.projection();
        assert!(approx(p.transform_point2(Vec2::ZERO), Vec2::new(-1.0, 1.0)));
        assert!(approx(p.transform_point2(Vec2::new(800.0, 600.0)), Vec2::new(1.0, -1.0)));
        assert!(approx(p.transform_point2(Vec2::new(400.0, 300.0)), Vec2::ZERO));
        assert_eq!(s.pixel_scale(), Vec2::ONE);
    }

    #[test]
    fn normalized_space_uses_identity_projection() {
        let s = RenderSurface::new(CoordinateSystem::NormalizedDeviceSpace, 200, 100, Color::BLACK);
        assert_eq!(s.projection(), Mat3::IDENTITY);
        assert!(approx(s.pixel_scale(), Vec2::new(0.01, -0.02)));
    }

    #[test]
    fn resize_recomputes_projection() {
        let mut s = RenderSurface::new(CoordinateSystem::PixelSpace, 100, 100, Color::BLACK);
        assert!(!s.resize(100, 100));
        assert!(s.resize(200, 50));
        let p = s.projection();
        assert!(approx(p.transform_point2(Vec2::new(200.0, 50.0)), Vec2::new(1.0, -1.0)));
    }

    #[test]
    fn zero_size_is_clamped() {
        let s = RenderSurface::new(CoordinateSystem::PixelSpace, 0, 0, Color::BLACK);
        assert_eq!((s.width(), s.height()), (1, 1));
    }
}

// Per-instance affine transforms, mirrored by the WGSL vertex stages.
//
// Each model matrix maps a corner of the kind's base quad into surface
// coordinates; the shared projection then maps those into clip space.

use glam::{Mat3, Vec2};

use crate::PrimitiveKind;

/// Two triangles over the unit square, in vertex-index order.
pub const QUAD_CORNERS: [Vec2; 6] = [
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 0.0),
    Vec2::new(1.0, 1.0),
    Vec2::new(0.0, 1.0),
];

/// Base-quad corner for `kind`: rects span `[0,1]²`, lines `[0,1]×[-0.5,0.5]`,
/// dots `[-0.5,0.5]²`.
pub fn quad_corner(kind: PrimitiveKind, index: usize) -> Vec2 {
    let corner = QUAD_CORNERS[index % QUAD_CORNERS.len()];
    match kind {
        PrimitiveKind::Rect => corner,
        PrimitiveKind::Line => corner - Vec2::new(0.0, 0.5),
        PrimitiveKind::Dot => corner - Vec2::splat(0.5),
    }
}

pub fn rect_model(start: Vec2, end: Vec2) -> Mat3 {
    Mat3::from_translation(start) * Mat3::from_scale(end - start)
}

/// `size` is in pixels; `pixel_scale` converts pixels to surface units.
pub fn dot_model(position: Vec2, size: f32, pixel_scale: Vec2) -> Mat3 {
    Mat3::from_translation(position) * Mat3::from_scale(Vec2::splat(size) * pixel_scale)
}

/// The segment is laid out in pixel space (so `width` stays in pixels under any
/// coordinate system), rotated by the segment angle, then scaled back.
pub fn line_model(start: Vec2, end: Vec2, width: f32, pixel_scale: Vec2) -> Mat3 {
    let delta_px = (end - start) / pixel_scale;
    let angle = delta_px.y.atan2(delta_px.x);
    Mat3::from_translation(start)
        * Mat3::from_scale(pixel_scale)
        * Mat3::from_angle(angle)
        * Mat3::from_scale(Vec2::new(delta_px.length(), width))
}

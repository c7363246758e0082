// Blocking readback of pixels from an offscreen render target.

use splot_core::{RenderError, RenderResult};
use splot_renderer::{GpuContext, RenderTarget};

/// Copies into a buffer must use rows aligned to this many bytes.
const ROW_ALIGN: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// RGBA8 value of pixel `(x, y)`, origin top-left. Coordinates are clamped into the target.
pub fn read_pixel(context: &GpuContext, target: &RenderTarget, x: u32, y: u32) -> RenderResult<[u8; 4]> {
    let x = x.min(target.width().saturating_sub(1));
    let y = y.min(target.height().saturating_sub(1));
    let pixels = read_region(context, target, x, y, 1, 1)?;
    pixels
        .first()
        .copied()
        .ok_or_else(|| RenderError::Gpu("empty readback".into()))
}

/// Pixels of a `width` x `height` region starting at `(x, y)`, row-major.
fn read_region(
    context: &GpuContext,
    target: &RenderTarget,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) -> RenderResult<Vec<[u8; 4]>> {
    let bytes_per_row = (4 * width).div_ceil(ROW_ALIGN) * ROW_ALIGN;
    let buffer = context.device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("target_readback"),
        size: bytes_per_row as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder = context
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("target_readback_encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::ImageCopyTexture {
            texture: &target.texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x, y, z: 0 },
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::ImageCopyBuffer {
            buffer: &buffer,
            layout: wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    context.queue.submit(std::iter::once(encoder.finish()));

    let slice = buffer.slice(..);
    let (tx, rx) = std::sync::mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    context.device.poll(wgpu::Maintain::Wait);
    rx.recv()
        .map_err(|e| RenderError::Gpu(format!("readback channel closed: {e}")))?
        .map_err(|e| RenderError::Gpu(format!("readback map failed: {e}")))?;

    let pixels = {
        let data = slice.get_mapped_range();
        data.chunks_exact(bytes_per_row as usize)
            .flat_map(|row| row[..4 * width as usize].chunks_exact(4))
            .map(|p| [p[0], p[1], p[2], p[3]])
            .collect()
    };
    buffer.unmap();
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use splot_core::{
        Color, ColorScaleRegistry, IdAllocator, PickId, PrimitiveKind, PrimitiveSink, RectInstance,
        RendererConfig, SymbolKind, Vec2,
    };
    use splot_renderer::{BatchRenderer, PickingRenderer};

    fn config() -> RendererConfig {
        RendererConfig {
            max_lines: 16,
            max_dots: 16,
            max_rects: 16,
            width: 64,
            height: 64,
            antialias: false,
            colorscales: ColorScaleRegistry::builtin(),
            ..Default::default()
        }
    }

    #[test]
    fn picked_pixel_decodes_to_the_drawn_id() {
        let mut picking = PickingRenderer::new(&config());
        if let Some(reason) = picking.renderer().init_error() {
            eprintln!("skipping GPU test: {reason}");
            return;
        }
        let mut ids = IdAllocator::new();
        let rect = ids.allocate().unwrap();
        let dot = ids.allocate().unwrap();
        picking.add_rect(rect, 0.0, 0.0, 32.0, 64.0).unwrap();
        picking.add_dot(dot, 48.0, 32.0, 12.0, SymbolKind::FilledRect).unwrap();
        picking.draw().unwrap();

        let context = picking.context().unwrap();
        let target = picking.target().unwrap();
        let [r, g, b, _] = read_pixel(context, target, 10, 10).unwrap();
        assert_eq!(PickId::from_rgb([r, g, b]), Some(rect));
        let [r, g, b, _] = read_pixel(context, target, 48, 32).unwrap();
        assert_eq!(PickId::from_rgb([r, g, b]), Some(dot));
        // Outside everything: the clear color decodes to no id.
        let [r, g, b, _] = read_pixel(context, target, 60, 2).unwrap();
        assert_eq!(PickId::from_rgb([r, g, b]), None);
    }

    #[test]
    fn no_data_rect_keeps_its_literal_color() {
        let mut chart = BatchRenderer::new(&config());
        if let Some(reason) = chart.init_error() {
            eprintln!("skipping GPU test: {reason}");
            return;
        }
        chart.set_color_scale("greys").unwrap();
        chart.set_domain([0.0, 10.0]).unwrap();
        chart.set_no_data_value(-1.0).unwrap();
        chart.refresh_uniforms().unwrap();

        let red = Color::rgb(1.0, 0.0, 0.0);
        chart
            .push_rect(RectInstance::new(Vec2::ZERO, Vec2::splat(32.0), red).with_value(-1.0))
            .unwrap();
        chart
            .push_rect(RectInstance::new(Vec2::new(32.0, 0.0), Vec2::new(64.0, 32.0), red).with_value(10.0))
            .unwrap();
        chart.draw().unwrap();

        let context = chart.context().unwrap();
        let target = chart.target().unwrap();
        assert_eq!(read_pixel(context, target, 8, 8).unwrap(), [255, 0, 0, 255]);
        // Top of the domain maps to the last greys entry.
        assert_eq!(read_pixel(context, target, 48, 8).unwrap(), [255, 255, 255, 255]);
    }

    fn pick(context: &GpuContext, target: &RenderTarget, x: u32, y: u32) -> Option<PickId> {
        let [r, g, b, _] = read_pixel(context, target, x, y).unwrap();
        PickId::from_rgb([r, g, b])
    }

    #[test]
    fn draw_builds_on_the_target_until_cleared() {
        const RED: [u8; 4] = [255, 0, 0, 255];
        const BLUE: [u8; 4] = [0, 0, 255, 255];
        for antialias in [false, true] {
            let config = RendererConfig {
                max_rects: 1,
                antialias,
                ..config()
            };
            let mut chart = BatchRenderer::new(&config);
            if let Some(reason) = chart.init_error() {
                eprintln!("skipping GPU test: {reason}");
                return;
            }

            chart.add_rect(0.0, 0.0, 16.0, 16.0, 1.0, 0.0, 0.0, 1.0).unwrap();
            assert!(matches!(
                chart.add_rect(32.0, 0.0, 48.0, 16.0, 0.0, 0.0, 1.0, 1.0),
                Err(RenderError::CapacityExceeded { .. })
            ));
            chart.draw().unwrap();
            assert_eq!(read_pixel(chart.context().unwrap(), chart.target().unwrap(), 8, 8).unwrap(), RED);

            // Nothing batched: nothing drawn, nothing erased.
            assert_eq!(chart.draw().unwrap().call_count(), 0);
            assert_eq!(read_pixel(chart.context().unwrap(), chart.target().unwrap(), 8, 8).unwrap(), RED);

            // The flush emptied the batch, so the rejected rect fits now.
            chart.add_rect(32.0, 0.0, 48.0, 16.0, 0.0, 0.0, 1.0, 1.0).unwrap();
            chart.draw().unwrap();
            let (context, target) = (chart.context().unwrap(), chart.target().unwrap());
            assert_eq!(read_pixel(context, target, 8, 8).unwrap(), RED, "antialias {antialias}");
            assert_eq!(read_pixel(context, target, 40, 8).unwrap(), BLUE, "antialias {antialias}");

            chart.clear().unwrap();
            let (context, target) = (chart.context().unwrap(), chart.target().unwrap());
            assert_eq!(read_pixel(context, target, 8, 8).unwrap(), [0, 0, 0, 0]);
            assert_eq!(read_pixel(context, target, 40, 8).unwrap(), [0, 0, 0, 0]);
        }
    }

    #[test]
    fn later_kinds_paint_over_earlier_ones() {
        let mut picking = PickingRenderer::new(&config());
        if picking.renderer().init_error().is_some() {
            return;
        }
        let mut ids = IdAllocator::new();
        let (rect, line, dot) = (ids.allocate().unwrap(), ids.allocate().unwrap(), ids.allocate().unwrap());
        // Submitted in reverse; drawn rect, line, dot.
        picking.add_dot(dot, 16.0, 16.0, 8.0, SymbolKind::FilledRect).unwrap();
        picking.add_line(line, 0.0, 16.0, 32.0, 16.0, 4.0).unwrap();
        picking.add_rect(rect, 0.0, 0.0, 32.0, 32.0).unwrap();
        picking.draw().unwrap();

        let (context, target) = (picking.context().unwrap(), picking.target().unwrap());
        assert_eq!(pick(context, target, 16, 16), Some(dot));
        assert_eq!(pick(context, target, 4, 16), Some(line));
        assert_eq!(pick(context, target, 4, 4), Some(rect));
        assert_eq!(pick(context, target, 48, 48), None);
    }

    #[test]
    fn symbol_shapes_match_their_coverage_rules() {
        const SIZE: f32 = 20.0;
        const CELL: u32 = 32;
        // Pixels this close to a shape edge may round either way.
        const EPS: f32 = 0.03;

        let config = RendererConfig {
            width: 4 * CELL,
            height: 2 * CELL,
            ..config()
        };
        let mut picking = PickingRenderer::new(&config);
        if picking.renderer().init_error().is_some() {
            return;
        }
        let mut ids = IdAllocator::new();
        let mut placed = Vec::new();
        for (i, symbol) in SymbolKind::ALL.into_iter().enumerate() {
            let center = (CELL / 2 + CELL * (i as u32 % 4), CELL / 2 + CELL * (i as u32 / 4));
            let id = ids.allocate().unwrap();
            picking
                .add_dot(id, center.0 as f32, center.1 as f32, SIZE, symbol)
                .unwrap();
            placed.push((symbol, center, id));
        }
        assert_eq!(picking.draw().unwrap().instances(PrimitiveKind::Dot), 8);

        let (context, target) = (picking.context().unwrap(), picking.target().unwrap());
        let pixels = read_region(context, target, 0, 0, config.width, config.height).unwrap();
        let id_at = |x: u32, y: u32| {
            let [r, g, b, _] = pixels[(y * config.width + x) as usize];
            PickId::from_rgb([r, g, b])
        };

        let mut compared = 0;
        for &(symbol, (cx, cy), id) in &placed {
            for y in cy - 10..cy + 10 {
                for x in cx - 10..cx + 10 {
                    let local = Vec2::new(
                        (x as f32 + 0.5 - cx as f32) / SIZE,
                        (y as f32 + 0.5 - cy as f32) / SIZE,
                    );
                    if local.abs().max_element() > 0.5 - EPS {
                        continue;
                    }
                    let nudges = [Vec2::ZERO, Vec2::X * EPS, -Vec2::X * EPS, Vec2::Y * EPS, -Vec2::Y * EPS];
                    let coverage = symbol.hard_coverage(local, SIZE);
                    if nudges.iter().any(|n| symbol.hard_coverage(local + *n, SIZE) != coverage) {
                        continue;
                    }
                    let expected = (coverage > 0.0).then_some(id);
                    assert_eq!(id_at(x, y), expected, "{symbol:?} at pixel ({x}, {y}), local {local}");
                    compared += 1;
                }
            }
        }
        assert!(compared > 1000, "only {compared} pixels compared");

        let center_of = |kind: SymbolKind| placed.iter().find(|p| p.0 == kind).map(|p| (p.1, p.2)).unwrap();
        let ((hx, hy), hollow) = center_of(SymbolKind::HollowCircle);
        assert_eq!(id_at(hx, hy), None);
        assert_eq!(id_at(hx + 9, hy), Some(hollow));
        let ((fx, fy), filled) = center_of(SymbolKind::FilledCircle);
        assert_eq!(id_at(fx, fy), Some(filled));
        let ((tx, ty), triangle) = center_of(SymbolKind::FilledTriangle);
        assert_eq!(id_at(tx, ty - 9), Some(triangle), "apex");
        assert_eq!(id_at(tx - 9, ty - 9), None, "top-left corner");
        assert_eq!(id_at(tx - 9, ty + 9), Some(triangle), "bottom-left corner");
    }
}

#[cfg(test)]
mod tests {
    use crate::{BatchRenderer, FrameState, PickingRenderer};
    use splot_core::{
        BackendTier, Color, ColorScaleRegistry, DotInstance, PickId, PrimitiveKind, PrimitiveSink,
        RenderError, RendererConfig, SymbolKind, Vec2,
    };

    /// A renderer on whatever adapter this machine has, or `None` when it has none.
    fn renderer(config: RendererConfig) -> Option<BatchRenderer> {
        let renderer = BatchRenderer::new(&config);
        if let Some(reason) = renderer.init_error() {
            eprintln!("skipping GPU test: {reason}");
            return None;
        }
        Some(renderer)
    }

    fn small_config() -> RendererConfig {
        RendererConfig {
            max_lines: 2,
            max_dots: 8,
            max_rects: 8,
            width: 64,
            height: 64,
            colorscales: ColorScaleRegistry::builtin(),
            ..Default::default()
        }
    }

    #[test]
    fn line_capacity_scenario() {
        let Some(mut r) = renderer(small_config()) else { return };
        r.add_line(0.0, 0.0, 10.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0).unwrap();
        r.add_line(0.0, 0.0, 10.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0).unwrap();
        assert!(matches!(
            r.add_line(0.0, 0.0, 10.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0),
            Err(RenderError::CapacityExceeded {
                kind: PrimitiveKind::Line,
                capacity: 2
            })
        ));
        assert_eq!(r.count(PrimitiveKind::Line), 2);

        let stats = r.draw().unwrap();
        assert_eq!(stats.call_count(), 1);
        assert_eq!(stats.instances(PrimitiveKind::Line), 2);
        assert_eq!(r.count(PrimitiveKind::Line), 0);
        assert_eq!(r.frame_state(), FrameState::Idle);

        assert!(r.add_line(0.0, 0.0, 10.0, 0.0, 2.0, 1.0, 0.0, 0.0, 1.0).is_ok());
    }

    #[test]
    fn empty_frame_issues_no_draw_calls() {
        let Some(mut r) = renderer(small_config()) else { return };
        let stats = r.draw().unwrap();
        assert_eq!(stats.call_count(), 0);
    }

    #[test]
    fn kinds_draw_rect_line_dot() {
        let Some(mut r) = renderer(small_config()) else { return };
        r.add_dot(5.0, 5.0, 6.0, 2, 0.0, 0.0, 1.0, 1.0, 0.5).unwrap();
        r.add_line(0.0, 0.0, 10.0, 10.0, 1.0, 0.0, 1.0, 0.0, 1.0).unwrap();
        r.add_rect(0.0, 0.0, 20.0, 20.0, 1.0, 1.0, 1.0, 1.0).unwrap();
        r.set_color_scale("viridis").unwrap();
        let stats = r.draw().unwrap();
        let kinds: Vec<_> = stats.calls.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![PrimitiveKind::Rect, PrimitiveKind::Line, PrimitiveKind::Dot]);
        assert_ne!(stats.tier, BackendTier::Unavailable);
    }

    #[test]
    fn unknown_colorscale_changes_nothing() {
        let Some(mut r) = renderer(small_config()) else { return };
        r.set_color_scale("greys").unwrap();
        r.set_domain([2.0, 4.0]).unwrap();
        r.refresh_uniforms().unwrap();
        let before = r.uniforms().unwrap();

        assert_eq!(
            r.set_color_scale("nonexistent"),
            Err(RenderError::ColorScaleNotFound("nonexistent".into()))
        );
        assert_eq!(r.active_color_scale(), Some("greys"));
        assert_eq!(r.mapping().domain, [2.0, 4.0]);
        assert_eq!(r.uniforms().unwrap(), before);
    }

    #[test]
    fn mapping_setters_wait_for_refresh() {
        let Some(mut r) = renderer(small_config()) else { return };
        r.set_domain([0.0, 10.0]).unwrap();
        r.set_no_data_value(-1.0).unwrap();
        r.set_log_scale(true).unwrap();
        let stale = r.uniforms().unwrap();
        assert_eq!(stale.domain, [0.0, 1.0]);

        r.refresh_uniforms().unwrap();
        let fresh = r.uniforms().unwrap();
        assert_eq!(fresh.domain, [0.0, 10.0]);
        assert_eq!(fresh.no_data, -1.0);
        assert_eq!(fresh.log_scale, 1);
    }

    #[test]
    fn no_data_value_keeps_literal_color() {
        let Some(mut r) = renderer(small_config()) else { return };
        r.set_color_scale("greys").unwrap();
        r.set_no_data_value(-5.0).unwrap();
        let literal = Color::new(0.9, 0.1, 0.1, 1.0);
        assert_eq!(r.resolve_color(literal, Some(-5.0)), literal);
        assert_eq!(r.resolve_color(literal, Some(1.0)), Color::WHITE);
    }

    #[test]
    fn canvas_resize_updates_projection() {
        let Some(mut r) = renderer(small_config()) else { return };
        r.update_canvas_size(128, 32).unwrap();
        let target = r.target().unwrap();
        assert_eq!((target.width(), target.height()), (128, 32));
        let u = r.uniforms().unwrap();
        assert_eq!(u.projection[0][0], 2.0 / 128.0);
        assert_eq!(u.projection[1][1], -2.0 / 32.0);
    }

    #[test]
    fn resized_batches_accept_more_instances() {
        let Some(mut r) = renderer(small_config()) else { return };
        r.resize_capacity(PrimitiveKind::Line, 4).unwrap();
        for _ in 0..4 {
            r.add_line(0.0, 0.0, 1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 1.0).unwrap();
        }
        assert_eq!(r.draw().unwrap().instances(PrimitiveKind::Line), 4);
    }

    #[test]
    fn legacy_tier_can_be_forced() {
        let config = RendererConfig {
            force_legacy_backend: true,
            ..small_config()
        };
        let Some(mut r) = renderer(config) else { return };
        assert_eq!(r.tier(), BackendTier::Legacy);
        r.push_dot(DotInstance::new(Vec2::new(8.0, 8.0), 10.0, SymbolKind::HollowTriangle, Color::BLACK))
            .unwrap();
        let stats = r.draw().unwrap();
        assert_eq!(stats.calls[0].ranges(stats.tier), (0..6, 0..1));
    }

    #[test]
    fn destroyed_renderer_rejects_everything() {
        let Some(mut r) = renderer(small_config()) else { return };
        r.destroy();
        assert_eq!(r.draw(), Err(RenderError::Destroyed));
        assert_eq!(
            r.add_rect(0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0),
            Err(RenderError::Destroyed)
        );
        assert!(r.context().is_err());
        assert_eq!(r.tier(), BackendTier::Unavailable);
    }

    #[test]
    fn oversized_batches_fail_initialization() {
        if renderer(small_config()).is_none() {
            return;
        }
        let config = RendererConfig {
            max_dots: 20_000_000,
            ..small_config()
        };
        let mut r = BatchRenderer::new(&config);
        let reason = r.init_error().map(str::to_owned);
        assert!(
            reason.as_deref().is_some_and(|m| m.contains("dot batch of 20000000")),
            "{reason:?}"
        );
        assert_eq!(r.tier(), BackendTier::Unavailable);
        assert_eq!(r.capacity(PrimitiveKind::Dot), 0);
        assert!(matches!(r.draw(), Err(RenderError::Unavailable(_))));
    }

    #[test]
    fn oversized_legacy_batches_fail_initialization() {
        let legacy = RendererConfig {
            force_legacy_backend: true,
            ..small_config()
        };
        if renderer(legacy.clone()).is_none() {
            return;
        }
        // 16-byte color column: fits once (160 MB), not six times.
        let r = BatchRenderer::new(&RendererConfig {
            max_lines: 10_000_000,
            ..legacy
        });
        assert!(r.init_error().is_some());
    }

    #[test]
    fn oversized_resize_keeps_the_current_batch() {
        let Some(mut r) = renderer(small_config()) else { return };
        r.add_dot(4.0, 4.0, 6.0, 0, 1.0, 0.0, 0.0, 1.0, 0.0).unwrap();
        assert_eq!(
            r.resize_capacity(PrimitiveKind::Dot, 20_000_000),
            Err(RenderError::CapacityTooLarge {
                kind: PrimitiveKind::Dot,
                capacity: 20_000_000
            })
        );
        assert_eq!(r.capacity(PrimitiveKind::Dot), 8);
        assert_eq!(r.count(PrimitiveKind::Dot), 1);
        assert!(r.is_ready());
        assert_eq!(r.draw().unwrap().instances(PrimitiveKind::Dot), 1);
    }

    #[test]
    fn clear_keeps_batched_instances() {
        let Some(mut r) = renderer(small_config()) else { return };
        r.add_rect(0.0, 0.0, 4.0, 4.0, 1.0, 1.0, 1.0, 1.0).unwrap();
        r.clear().unwrap();
        assert_eq!(r.count(PrimitiveKind::Rect), 1);
        assert_eq!(r.draw().unwrap().call_count(), 1);
    }

    #[test]
    fn picking_path_is_single_sampled() {
        let config = small_config();
        let mut picking = PickingRenderer::new(&config);
        if picking.renderer().init_error().is_some() {
            return;
        }
        assert_eq!(picking.target().unwrap().sample_count(), 1);
        let id = PickId::new(0x00_12_34).unwrap();
        picking.add_rect(id, 0.0, 0.0, 10.0, 10.0).unwrap();
        picking.add_dot(id, 20.0, 20.0, 8.0, SymbolKind::Plus).unwrap();
        let stats = picking.draw().unwrap();
        assert_eq!(stats.total_instances(), 2);
    }
}

// splot demo: renders a spiral scatter chart offscreen, then draws the same
// points into the picking target and resolves the point under one pixel.

mod readback;
mod scene;
mod settings;

use splot_core::{
    Color, CoordinateSystem, DotInstance, IdAllocator, LineInstance, PickId, PrimitiveSink,
    RectInstance, RenderError, RenderResult, Vec2,
};
use splot_renderer::{BatchRenderer, PickingRenderer};

use scene::{Scene, DOT_SIZE, FRAME_COLOR, TRACE_COLOR};
use settings::SplotSettings;

/// Every n-th synthetic point is recorded without a measurement.
const NO_DATA_EVERY: usize = 25;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("splot failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> RenderResult<()> {
    let settings = settings::load_settings();
    if let Some(path) = settings::settings_path().filter(|p| !p.exists()) {
        match settings::save_settings_to(&path, &settings) {
            Ok(()) => log::info!("Wrote default settings to {}", path.display()),
            Err(e) => log::warn!("Failed to write default settings to {}: {}", path.display(), e),
        }
    }

    let config = settings.renderer_config();
    let scene = Scene::spiral(settings.points, config.width, config.height, settings.no_data, NO_DATA_EVERY);

    let mut chart = BatchRenderer::new(&config);
    if let Some(reason) = chart.init_error() {
        return Err(RenderError::Unavailable(reason.to_string()));
    }
    configure_mapping(&mut chart, &settings, &scene)?;
    submit_chart(&mut chart, &scene, config.coordinate_system)?;
    let stats = chart.draw()?;
    log::info!(
        "Drew {} instances in {} calls on the {} tier",
        stats.total_instances(),
        stats.call_count(),
        stats.tier
    );

    let mut picking = PickingRenderer::new(&config);
    if let Some(reason) = picking.renderer().init_error() {
        return Err(RenderError::Unavailable(reason.to_string()));
    }
    let mut ids = IdAllocator::new();
    submit_picking(&mut picking, &mut ids, &scene, config.coordinate_system)?;
    picking.draw()?;

    let Some([x, y]) = settings.pick_pixel.or_else(|| scene.middle_pixel()) else {
        log::info!("Nothing to pick: the scene is empty");
        return Ok(());
    };
    let [r, g, b, _] = readback::read_pixel(picking.context()?, picking.target()?, x, y)?;
    match PickId::from_rgb([r, g, b]) {
        // Ids were handed out in point order starting at 1.
        Some(id) => match scene.points.get(id.get() as usize - 1) {
            Some(point) => log::info!(
                "Pixel ({x}, {y}) hits point {} ({:?}, value {})",
                id.get() - 1,
                point.symbol,
                point.value
            ),
            None => log::warn!("Pixel ({x}, {y}) holds unknown id {}", id.get()),
        },
        None => log::info!("Pixel ({x}, {y}) hits nothing"),
    }

    chart.destroy();
    picking.destroy();
    Ok(())
}

fn configure_mapping(chart: &mut BatchRenderer, settings: &SplotSettings, scene: &Scene) -> RenderResult<()> {
    match chart.set_color_scale(&settings.colorscale) {
        Ok(()) => {}
        Err(RenderError::ColorScaleNotFound(name)) => {
            let known: Vec<_> = chart.registry().names().collect();
            log::warn!("Unknown colorscale {name:?}, drawing literal colors (known: {known:?})");
        }
        Err(e) => return Err(e),
    }

    let domain = settings
        .domain
        .or_else(|| scene.value_range(settings.no_data))
        .unwrap_or([0.0, 1.0]);
    chart.set_domain(domain)?;
    chart.set_no_data_value(settings.no_data)?;
    chart.set_log_scale(settings.log_scale)?;
    chart.refresh_uniforms()
}

fn submit_chart(chart: &mut BatchRenderer, scene: &Scene, cs: CoordinateSystem) -> RenderResult<()> {
    let (top_left, bottom_right) = scene.frame();
    chart.push_rect(RectInstance::new(
        scene.place(top_left, cs),
        scene.place(bottom_right, cs),
        FRAME_COLOR,
    ))?;

    for pair in scene.points.windows(2) {
        chart.push_line(LineInstance::new(
            scene.place(pair[0].position, cs),
            scene.place(pair[1].position, cs),
            1.0,
            TRACE_COLOR,
        ))?;
    }

    for point in &scene.points {
        // Literal black shows through wherever the value is missing.
        chart.push_dot(
            DotInstance::new(scene.place(point.position, cs), DOT_SIZE, point.symbol, Color::BLACK)
                .with_value(point.value),
        )?;
    }
    Ok(())
}

fn submit_picking(
    picking: &mut PickingRenderer,
    ids: &mut IdAllocator,
    scene: &Scene,
    cs: CoordinateSystem,
) -> RenderResult<()> {
    for point in &scene.points {
        let Vec2 { x, y } = scene.place(point.position, cs);
        picking.add_dot(ids.allocate()?, x, y, DOT_SIZE, point.symbol)?;
    }
    log::debug!("Allocated {} picking ids", ids.allocated());
    Ok(())
}

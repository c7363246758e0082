use serde::{Deserialize, Serialize};

use crate::{Color, ColorScaleRegistry, CoordinateSystem};

/// Instances per batch unless configured otherwise.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Construction-time settings for a renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub max_lines: usize,
    pub max_dots: usize,
    pub max_rects: usize,
    /// Skip the primary tier even when it is available.
    pub force_legacy_backend: bool,
    pub clear_color: Color,
    pub coordinate_system: CoordinateSystem,
    pub width: u32,
    pub height: u32,
    /// Multisample the display path when the adapter supports it.
    pub antialias: bool,
    pub colorscales: ColorScaleRegistry,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            max_lines: DEFAULT_CAPACITY,
            max_dots: DEFAULT_CAPACITY,
            max_rects: DEFAULT_CAPACITY,
            force_legacy_backend: false,
            clear_color: Color::TRANSPARENT,
            coordinate_system: CoordinateSystem::PixelSpace,
            width: 800,
            height: 600,
            antialias: true,
            colorscales: ColorScaleRegistry::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: RendererConfig = serde_json::from_str(r#"{ "max_lines": 2 }"#).unwrap();
        assert_eq!(config.max_lines, 2);
        assert_eq!(config.max_dots, DEFAULT_CAPACITY);
        assert_eq!(config.max_rects, DEFAULT_CAPACITY);
        assert!(!config.force_legacy_backend);
        assert!(config.colorscales.is_empty());
    }

    #[test]
    fn coordinate_system_and_colorscales_deserialize() {
        let json = r##"{
            "coordinate_system": "NormalizedDeviceSpace",
            "clear_color": { "r": 1.0, "g": 1.0, "b": 1.0, "a": 1.0 },
            "colorscales": { "mono": { "colors": ["#000", "#fff"], "positions": [0.0, 1.0] } }
        }"##;
        let config: RendererConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.coordinate_system, CoordinateSystem::NormalizedDeviceSpace);
        assert_eq!(config.clear_color, Color::WHITE);
        assert!(config.colorscales.contains("mono"));
    }
}

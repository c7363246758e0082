// Settings persistence for the demo binary.
// Uses platform-native config dir: e.g. ~/Library/Application Support/splot/settings.json
// on macOS, ~/.config/splot/settings.json on Linux.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use splot_core::{ColorScaleRegistry, RendererConfig, DEFAULT_NO_DATA};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplotSettings {
    #[serde(default)]
    pub renderer: RendererConfig,
    /// Registry entry used to color points by value.
    #[serde(default = "default_colorscale")]
    pub colorscale: String,
    /// Value range mapped onto the colorscale. Derived from the data when absent.
    #[serde(default)]
    pub domain: Option<[f32; 2]>,
    #[serde(default = "default_no_data")]
    pub no_data: f32,
    #[serde(default)]
    pub log_scale: bool,
    #[serde(default = "default_points")]
    pub points: usize,
    /// Pixel to pick after rendering. Defaults to the middle point of the scatter.
    #[serde(default)]
    pub pick_pixel: Option<[u32; 2]>,
}

fn default_colorscale() -> String {
    "viridis".to_string()
}

fn default_no_data() -> f32 {
    DEFAULT_NO_DATA
}

fn default_points() -> usize {
    2_000
}

impl Default for SplotSettings {
    fn default() -> Self {
        Self {
            renderer: RendererConfig::default(),
            colorscale: default_colorscale(),
            domain: None,
            no_data: default_no_data(),
            log_scale: false,
            points: default_points(),
            pick_pixel: None,
        }
    }
}

impl SplotSettings {
    /// Renderer config with the built-in colorscales underneath the user's own,
    /// and batches large enough for the whole scatter.
    pub fn renderer_config(&self) -> RendererConfig {
        let mut colorscales = ColorScaleRegistry::builtin();
        colorscales.extend(self.renderer.colorscales.clone());
        RendererConfig {
            max_lines: self.renderer.max_lines.max(self.points.saturating_sub(1)),
            max_dots: self.renderer.max_dots.max(self.points),
            colorscales,
            ..self.renderer.clone()
        }
    }
}

pub fn settings_path() -> Option<PathBuf> {
    let config_dir = dirs::config_dir()?;
    Some(config_dir.join("splot").join("settings.json"))
}

pub fn load_settings() -> SplotSettings {
    match settings_path() {
        Some(path) => load_settings_from(&path),
        None => SplotSettings::default(),
    }
}

pub fn load_settings_from(path: &Path) -> SplotSettings {
    match std::fs::read_to_string(path) {
        Ok(data) => match serde_json::from_str(&data) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Failed to parse {}: {}", path.display(), e);
                SplotSettings::default()
            }
        },
        Err(_) => SplotSettings::default(),
    }
}

/// Write `settings` as pretty JSON, creating parent directories as needed.
pub fn save_settings_to(path: &Path, settings: &SplotSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)
}

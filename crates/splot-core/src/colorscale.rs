// Colorscale definitions, the caller-owned registry, gradient rasterization
// and the value -> color mapping evaluated by the vertex stage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Color, RenderError, RenderResult};

/// Number of entries in a lookup gamut (texture width).
pub const GAMUT_SIZE: usize = 256;

/// Default sentinel meaning "do not color-map this instance".
pub const DEFAULT_NO_DATA: f32 = -9999.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub position: f32,
    pub color: Color,
}

impl ColorStop {
    pub fn new(position: f32, color: Color) -> Self {
        Self { position, color }
    }
}

/// 256 RGBA8 entries, row-major, exactly `GAMUT_SIZE * 4` bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gamut(Vec<u8>);

impl Gamut {
    pub fn from_bytes(bytes: Vec<u8>) -> RenderResult<Self> {
        if bytes.len() != GAMUT_SIZE * 4 {
            return Err(RenderError::InvalidColorScale(format!(
                "gamut must hold {} bytes, got {}",
                GAMUT_SIZE * 4,
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn entry(&self, index: usize) -> [u8; 4] {
        let i = index.min(GAMUT_SIZE - 1) * 4;
        [self.0[i], self.0[i + 1], self.0[i + 2], self.0[i + 3]]
    }

    /// Nearest-entry lookup with edge clamping, the way the GPU samples it.
    pub fn sample(&self, t: f32) -> Color {
        let index = (t.clamp(0.0, 1.0) * GAMUT_SIZE as f32).floor() as usize;
        Color::from_rgba8(self.entry(index))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PersistedColorScale", into = "PersistedColorScale")]
pub enum ColorScaleDefinition {
    Stops(Vec<ColorStop>),
    Gamut(Gamut),
}

impl ColorScaleDefinition {
    /// Stops must be non-empty with ascending positions inside `[0, 1]`.
    pub fn stops(stops: Vec<ColorStop>) -> RenderResult<Self> {
        if stops.is_empty() {
            return Err(RenderError::InvalidColorScale("no color stops".into()));
        }
        for stop in &stops {
            if !(0.0..=1.0).contains(&stop.position) {
                return Err(RenderError::InvalidColorScale(format!(
                    "stop position {} outside [0, 1]",
                    stop.position
                )));
            }
        }
        if stops.windows(2).any(|w| w[1].position < w[0].position) {
            return Err(RenderError::InvalidColorScale("stop positions must ascend".into()));
        }
        Ok(Self::Stops(stops))
    }

    pub fn gamut(bytes: Vec<u8>) -> RenderResult<Self> {
        Gamut::from_bytes(bytes).map(Self::Gamut)
    }

    /// Build a stop list from hex colors and positions, as persisted in settings.
    pub fn from_hex_stops(colors: &[&str], positions: &[f32]) -> RenderResult<Self> {
        if colors.len() != positions.len() {
            return Err(RenderError::InvalidColorScale(format!(
                "{} colors but {} positions",
                colors.len(),
                positions.len()
            )));
        }
        let stops = colors
            .iter()
            .zip(positions)
            .map(|(hex, &position)| {
                Color::from_hex(hex)
                    .map(|color| ColorStop::new(position, color))
                    .ok_or_else(|| RenderError::InvalidColorScale(format!("bad color `{hex}`")))
            })
            .collect::<RenderResult<Vec<_>>>()?;
        Self::stops(stops)
    }

    /// Evenly spaced stops.
    pub fn uniform(colors: &[&str]) -> RenderResult<Self> {
        let last = colors.len().saturating_sub(1).max(1) as f32;
        let positions: Vec<f32> = (0..colors.len()).map(|i| i as f32 / last).collect();
        Self::from_hex_stops(colors, &positions)
    }

    /// Rasterize into the 256-entry lookup gamut.
    pub fn rasterize(&self) -> Gamut {
        match self {
            ColorScaleDefinition::Gamut(gamut) => gamut.clone(),
            ColorScaleDefinition::Stops(stops) => {
                let mut bytes = Vec::with_capacity(GAMUT_SIZE * 4);
                for i in 0..GAMUT_SIZE {
                    let t = i as f32 / (GAMUT_SIZE - 1) as f32;
                    bytes.extend_from_slice(&gradient_at(stops, t).to_rgba8());
                }
                Gamut(bytes)
            }
        }
    }
}

fn gradient_at(stops: &[ColorStop], t: f32) -> Color {
    let first = stops[0];
    let last = stops[stops.len() - 1];
    if t <= first.position {
        return first.color;
    }
    if t >= last.position {
        return last.color;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t >= a.position && t <= b.position {
            let span = b.position - a.position;
            if span <= f32::EPSILON {
                return b.color;
            }
            return a.color.lerp(b.color, (t - a.position) / span);
        }
    }
    last.color
}

fn to_hex(color: Color) -> String {
    let [r, g, b, a] = color.to_rgba8();
    if a == 255 {
        format!("#{r:02x}{g:02x}{b:02x}")
    } else {
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

/// On-disk shape: `{ "colors": [...], "positions": [...] }` or a flat byte array.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum PersistedColorScale {
    Stops { colors: Vec<String>, positions: Vec<f32> },
    Gamut(Vec<u8>),
}

impl TryFrom<PersistedColorScale> for ColorScaleDefinition {
    type Error = RenderError;

    fn try_from(raw: PersistedColorScale) -> RenderResult<Self> {
        match raw {
            PersistedColorScale::Stops { colors, positions } => {
                let colors: Vec<&str> = colors.iter().map(String::as_str).collect();
                Self::from_hex_stops(&colors, &positions)
            }
            PersistedColorScale::Gamut(bytes) => Self::gamut(bytes),
        }
    }
}

impl From<ColorScaleDefinition> for PersistedColorScale {
    fn from(def: ColorScaleDefinition) -> Self {
        match def {
            ColorScaleDefinition::Stops(stops) => PersistedColorScale::Stops {
                colors: stops.iter().map(|s| to_hex(s.color)).collect(),
                positions: stops.iter().map(|s| s.position).collect(),
            },
            ColorScaleDefinition::Gamut(gamut) => PersistedColorScale::Gamut(gamut.0),
        }
    }
}

// ──────────────────────────────────────────────
// Registry
// ──────────────────────────────────────────────

/// Named colorscales, owned by whoever constructs the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorScaleRegistry {
    scales: BTreeMap<String, ColorScaleDefinition>,
}

impl ColorScaleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A few common scales to start from.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let presets: [(&str, &[&str]); 3] = [
            (
                "viridis",
                &[
                    "#440154", "#482878", "#3e4989", "#31688e", "#26828e", "#1f9e89", "#35b779",
                    "#6ece58", "#b5de2b", "#fde725",
                ],
            ),
            ("magma", &["#000004", "#3b0f70", "#8c2981", "#de4968", "#fe9f6d", "#fcfdbf"]),
            ("greys", &["#000000", "#ffffff"]),
        ];
        for (name, colors) in presets {
            match ColorScaleDefinition::uniform(colors) {
                Ok(def) => registry.insert(name, def),
                Err(e) => log::error!("Built-in colorscale {name} is invalid: {e}"),
            }
        }
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>, definition: ColorScaleDefinition) {
        self.scales.insert(name.into(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&ColorScaleDefinition> {
        self.scales.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scales.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.scales.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// Merge `other` into `self`, replacing same-named entries.
    pub fn extend(&mut self, other: ColorScaleRegistry) {
        self.scales.extend(other.scales);
    }
}

// ──────────────────────────────────────────────
// Value mapping
// ──────────────────────────────────────────────

/// Domain, no-data sentinel and log flag: how a scalar picks a gamut entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMapping {
    pub domain: [f32; 2],
    pub no_data: f32,
    pub log_scale: bool,
}

impl Default for ColorMapping {
    fn default() -> Self {
        Self {
            domain: [0.0, 1.0],
            no_data: DEFAULT_NO_DATA,
            log_scale: false,
        }
    }
}

impl ColorMapping {
    /// Position of `value` along the gamut, or `None` when the instance keeps
    /// its literal color (no-data sentinel, or a non-positive value in log scale).
    pub fn normalize(&self, value: f32) -> Option<f32> {
        if value == self.no_data {
            return None;
        }
        let [mut lo, mut hi] = self.domain;
        let mut v = value;
        if self.log_scale {
            if v <= 0.0 {
                return None;
            }
            lo = lo.max(f32::MIN_POSITIVE).log2();
            hi = hi.max(f32::MIN_POSITIVE).log2();
            v = v.log2();
        }
        let span = hi - lo;
        if span == 0.0 {
            return Some(0.0);
        }
        Some(((v - lo) / span).clamp(0.0, 1.0))
    }

    /// Final instance color. The gamut supplies rgb and scales alpha.
    pub fn resolve(&self, color: Color, value: Option<f32>, gamut: Option<&Gamut>) -> Color {
        let (Some(value), Some(gamut)) = (value, gamut) else {
            return color;
        };
        match self.normalize(value) {
            Some(t) => {
                let mapped = gamut.sample(t);
                Color::new(mapped.r, mapped.g, mapped.b, mapped.a * color.a)
            }
            None => color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_stop_gradient_spans_black_to_white() {
        let def = ColorScaleDefinition::uniform(&["#000000", "#ffffff"]).unwrap();
        let gamut = def.rasterize();
        assert_eq!(gamut.as_bytes().len(), 1024);
        assert_eq!(gamut.entry(0), [0, 0, 0, 255]);
        assert_eq!(gamut.entry(255), [255, 255, 255, 255]);
        assert_eq!(gamut.entry(128)[0], 128);
    }

    #[test]
    fn stops_clamp_outside_their_range() {
        let def = ColorScaleDefinition::from_hex_stops(&["#ff0000", "#0000ff"], &[0.25, 0.75]).unwrap();
        let gamut = def.rasterize();
        assert_eq!(gamut.entry(10), [255, 0, 0, 255]);
        assert_eq!(gamut.entry(250), [0, 0, 255, 255]);
    }

    #[test]
    fn invalid_stop_lists_are_rejected() {
        assert!(ColorScaleDefinition::from_hex_stops(&["#000", "#fff"], &[0.6, 0.2]).is_err());
        assert!(ColorScaleDefinition::from_hex_stops(&["#000"], &[1.5]).is_err());
        assert!(ColorScaleDefinition::from_hex_stops(&["#000", "#fff"], &[0.0]).is_err());
        assert!(ColorScaleDefinition::from_hex_stops(&["nope"], &[0.0]).is_err());
        assert!(ColorScaleDefinition::stops(Vec::new()).is_err());
    }

    #[test]
    fn raw_gamut_is_used_directly() {
        let bytes: Vec<u8> = (0..1024).map(|i| (i % 256) as u8).collect();
        let def = ColorScaleDefinition::gamut(bytes.clone()).unwrap();
        assert_eq!(def.rasterize().as_bytes(), &bytes[..]);
        assert!(ColorScaleDefinition::gamut(vec![0; 10]).is_err());
    }

    #[test]
    fn registry_parses_persisted_format() {
        let json = r##"{
            "heat": { "colors": ["#000000", "#ff0000", "#ffff00"], "positions": [0.0, 0.5, 1.0] }
        }"##;
        let registry: ColorScaleRegistry = serde_json::from_str(json).unwrap();
        assert!(registry.contains("heat"));
        let gamut = registry.get("heat").unwrap().rasterize();
        assert_eq!(gamut.entry(255), [255, 255, 0, 255]);
    }

    #[test]
    fn registry_rejects_bad_persisted_entries() {
        let json = r##"{ "bad": { "colors": ["#000000"], "positions": [0.0, 1.0] } }"##;
        assert!(serde_json::from_str::<ColorScaleRegistry>(json).is_err());
    }

    #[test]
    fn stop_lists_survive_serialization() {
        let registry = ColorScaleRegistry::builtin();
        let json = serde_json::to_string(&registry).unwrap();
        let back: ColorScaleRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, registry);
    }

    #[test]
    fn builtin_registry_has_viridis() {
        let registry = ColorScaleRegistry::builtin();
        let viridis = registry.get("viridis").unwrap().rasterize();
        assert_eq!(viridis.entry(0), [0x44, 0x01, 0x54, 255]);
        assert_eq!(viridis.entry(255), [0xfd, 0xe7, 0x25, 255]);
    }

    #[test]
    fn linear_domain_normalizes() {
        let mapping = ColorMapping {
            domain: [10.0, 20.0],
            ..Default::default()
        };
        assert_eq!(mapping.normalize(15.0), Some(0.5));
        assert_eq!(mapping.normalize(5.0), Some(0.0));
        assert_eq!(mapping.normalize(25.0), Some(1.0));
    }

    #[test]
    fn degenerate_domain_maps_to_start() {
        let mapping = ColorMapping {
            domain: [3.0, 3.0],
            ..Default::default()
        };
        assert_eq!(mapping.normalize(3.0), Some(0.0));
    }

    #[test]
    fn log_domain_normalizes_by_decade() {
        let mapping = ColorMapping {
            domain: [1.0, 100.0],
            log_scale: true,
            ..Default::default()
        };
        let t = mapping.normalize(10.0).unwrap();
        assert!((t - 0.5).abs() < 1e-5);
        assert_eq!(mapping.normalize(-1.0), None);
    }

    #[test]
    fn no_data_value_keeps_literal_color() {
        let mapping = ColorMapping {
            no_data: -1.0,
            ..Default::default()
        };
        let gamut = ColorScaleRegistry::builtin().get("greys").unwrap().rasterize();
        let literal = Color::new(0.2, 0.4, 0.6, 1.0);
        assert_eq!(mapping.resolve(literal, Some(-1.0), Some(&gamut)), literal);
        assert_eq!(mapping.resolve(literal, None, Some(&gamut)), literal);
        assert_eq!(mapping.resolve(literal, Some(0.5), None), literal);
        let mapped = mapping.resolve(literal, Some(1.0), Some(&gamut));
        assert_eq!(mapped, Color::WHITE);
    }
}

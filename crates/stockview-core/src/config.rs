//! Viewer configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::occupancy::OccupancyRules;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid color {0:?}, expected #rrggbb")]
    InvalidColor(String),
}

/// sRGB color with components in 0.0..=1.0, written as `#rrggbb` in config files
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub [f32; 3]);

impl Rgb {
    pub fn from_hex(hex: u32) -> Self {
        Self([
            ((hex >> 16) & 0xff) as f32 / 255.0,
            ((hex >> 8) & 0xff) as f32 / 255.0,
            (hex & 0xff) as f32 / 255.0,
        ])
    }

    /// Parse `#rrggbb`, `0xrrggbb` or bare `rrggbb`
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .unwrap_or(trimmed);
        if digits.len() != 6 {
            return Err(ConfigError::InvalidColor(text.to_string()));
        }
        u32::from_str_radix(digits, 16)
            .map(Self::from_hex)
            .map_err(|_| ConfigError::InvalidColor(text.to_string()))
    }

    pub fn to_hex(&self) -> String {
        let [r, g, b] = self.0.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_hex()
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub geometry: GeometryConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub palette: Palette,
    #[serde(default)]
    pub occupancy: OccupancyRules,
    #[serde(default)]
    pub interaction: InteractionConfig,
}

/// ERP endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Origin prepended to the endpoint paths; empty means same-origin
    pub base_url: String,
    pub layout: String,
    pub quantity: String,
    pub product: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            layout: "/3Dstock/data/standalone".to_string(),
            quantity: "/3Dstock/data/quantity".to_string(),
            product: "/3Dstock/data/product".to_string(),
        }
    }
}

impl RpcConfig {
    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

/// Bin geometry settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryConfig {
    /// Records whose largest extent is below this are treated as meters
    pub unit_scale_threshold: f64,
    /// Factor applied to position and extents of such records
    pub unit_scale_factor: f64,
    /// Edge length of the placeholder cube shown for an empty layout
    pub fallback_size: f64,
    /// Label text size as a fraction of the smaller horizontal extent
    pub label_scale: f64,
    /// Gap between the box face and the label, as a fraction of the text size
    pub label_gap: f64,
    pub show_labels: bool,
    /// Font asset used for labels; empty selects the built-in font
    pub label_font: String,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            unit_scale_threshold: 10.0,
            unit_scale_factor: 100.0,
            fallback_size: 100.0,
            label_scale: 0.25,
            label_gap: 0.1,
            show_labels: true,
            label_font: String::new(),
        }
    }
}

/// Camera framing and orbit settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub padding: f32,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 60.0,
            padding: 1.5,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
        }
    }
}

/// Opacity tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpacityTiers {
    pub high: f32,
    pub medium: f32,
    pub low: f32,
}

impl Default for OpacityTiers {
    fn default() -> Self {
        Self {
            high: 0.8,
            medium: 0.6,
            low: 0.35,
        }
    }
}

/// Bin and scene colors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub overload: Rgb,
    pub almost_full: Rgb,
    pub free_space: Rgb,
    pub empty: Rgb,
    pub inactive: Rgb,
    pub outline: Rgb,
    pub background: Rgb,
    pub floor: Rgb,
    pub opacity: OpacityTiers,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            overload: Rgb::from_hex(0xcc0000),
            almost_full: Rgb::from_hex(0xe6b800),
            free_space: Rgb::from_hex(0x00802b),
            empty: Rgb::from_hex(0x0000ff),
            inactive: Rgb::from_hex(0x8c8c8c),
            outline: Rgb::from_hex(0x404040),
            background: Rgb::from_hex(0xdfdfdf),
            floor: Rgb::from_hex(0xffffff),
            opacity: OpacityTiers::default(),
        }
    }
}

/// Pointer gesture settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Maximum delay between the two presses of a double-click
    pub double_click_ms: u64,
    /// Maximum pointer travel between the two presses, in logical pixels
    pub double_click_slop: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            double_click_ms: 400,
            double_click_slop: 6.0,
        }
    }
}

impl ViewerConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize to pretty TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Load configuration from file, falling back to defaults when it does not exist
pub fn load_config(path: &Path) -> Result<ViewerConfig, ConfigError> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config = ViewerConfig::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(ViewerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_rgb_parse() {
        assert_eq!(Rgb::parse("#ff0000").unwrap(), Rgb([1.0, 0.0, 0.0]));
        assert_eq!(Rgb::parse("0x00ff00").unwrap(), Rgb([0.0, 1.0, 0.0]));
        assert_eq!(Rgb::parse("0000ff").unwrap().to_hex(), "#0000ff");
        assert!(matches!(Rgb::parse("#fff"), Err(ConfigError::InvalidColor(_))));
        assert!(matches!(Rgb::parse("#gggggg"), Err(ConfigError::InvalidColor(_))));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = ViewerConfig::from_toml_str(
            r##"
[palette]
overload = "#ff0000"

[palette.opacity]
low = 0.18

[camera]
padding = 2.0
"##,
        )
        .unwrap();

        assert_eq!(config.palette.overload, Rgb([1.0, 0.0, 0.0]));
        assert_eq!(config.palette.almost_full, Palette::default().almost_full);
        assert_eq!(config.palette.opacity.low, 0.18);
        assert_eq!(config.palette.opacity.high, 0.8);
        assert_eq!(config.camera.padding, 2.0);
        assert_eq!(config.camera.fov_degrees, 60.0);
        assert_eq!(config.rpc, RpcConfig::default());
        assert!(config.geometry.label_font.is_empty());
    }

    #[test]
    fn test_bad_color_is_parse_error() {
        let err = ViewerConfig::from_toml_str("[palette]\nempty = \"blue\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_config_roundtrip_through_toml() {
        let config = ViewerConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(ViewerConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[geometry]\nfallback_size = 2.5").unwrap();
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.geometry.fallback_size, 2.5);

        let missing = file.path().with_extension("missing");
        assert_eq!(load_config(&missing).unwrap(), ViewerConfig::default());
    }

    #[test]
    fn test_rpc_url() {
        let mut rpc = RpcConfig::default();
        assert_eq!(rpc.url(&rpc.quantity), "/3Dstock/data/quantity");
        rpc.base_url = "https://erp.example.com/".to_string();
        assert_eq!(rpc.url(&rpc.layout), "https://erp.example.com/3Dstock/data/standalone");
    }
}

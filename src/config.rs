//! Configuration types for the fog engine and the demo scene.
//!
//! These types can be serialized to JSON presets and loaded by the demo
//! host. Runtime changes go through [`ConfigPatch`]: a patch is validated as
//! a whole and either applied completely or rejected.

use std::fmt;
use std::fs;
use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, FogError, Result};
use crate::generator::RotationMode;
use crate::update::UpdateParams;
use crate::volume::BoundingVolume;

/// 24-bit RGB color.
///
/// Serialized as `"#rrggbb"`; deserializes from that form, from
/// `"0xrrggbb"`, or from a plain integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub struct Color(pub u32);

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Int(u32),
    Text(String),
}

impl Color {
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Color(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Parse `#rrggbb`, `0xrrggbb` or bare `rrggbb`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let hex = text
            .strip_prefix('#')
            .or_else(|| text.strip_prefix("0x"))
            .or_else(|| text.strip_prefix("0X"))
            .unwrap_or(text);
        if hex.len() != 6 {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Color)
    }

    /// Channels scaled to `[0, 1]`.
    pub fn to_vec3(self) -> Vec3 {
        let r = (self.0 >> 16) & 0xff;
        let g = (self.0 >> 8) & 0xff;
        let b = self.0 & 0xff;
        Vec3::new(r as f32, g as f32, b as f32) / 255.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0 & 0xff_ffff)
    }
}

impl TryFrom<ColorRepr> for Color {
    type Error = String;

    fn try_from(repr: ColorRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            ColorRepr::Int(value) if value <= 0xff_ffff => Ok(Color(value)),
            ColorRepr::Int(value) => Err(format!("color {value:#x} does not fit in 24 bits")),
            ColorRepr::Text(text) => Color::parse(&text).ok_or_else(|| format!("invalid color `{text}`")),
        }
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

fn default_density() -> f32 {
    15.0
}

fn default_unit() -> f32 {
    1.0
}

fn default_origin() -> [f32; 3] {
    [0.0, 0.5, 0.0]
}

fn default_speed_size_change() -> f32 {
    0.029
}

fn default_opacity_coef() -> f32 {
    0.00999
}

fn default_spawn_spread() -> f32 {
    0.3
}

fn default_frame_duration() -> f32 {
    300.0
}

fn default_fog_color() -> Color {
    Color(0x1a75ff)
}

fn default_inner_color() -> Color {
    Color(0xffce00)
}

fn default_opacity() -> f32 {
    0.9
}

/// Everything that shapes and animates one fog field.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FogConfig {
    /// Particles per cubic unit of the bounding volume.
    #[serde(default = "default_density")]
    pub density: f32,
    #[serde(default = "default_unit")]
    pub height: f32,
    #[serde(default = "default_unit")]
    pub width: f32,
    #[serde(default = "default_unit")]
    pub depth: f32,
    #[serde(default = "default_origin")]
    pub origin: [f32; 3],
    /// Size growth per reference frame. Must be `>= 0`.
    #[serde(default = "default_speed_size_change")]
    pub speed_size_change: f32,
    /// Opacity loss per reference frame.
    #[serde(default = "default_opacity_coef")]
    pub opacity_coef: f32,
    /// Edge of the cube respawned particles scatter in around the source point.
    #[serde(default = "default_spawn_spread")]
    pub spawn_spread: f32,
    /// Milliseconds per sprite-sheet frame.
    #[serde(default = "default_frame_duration")]
    pub frame_duration: f32,
    #[serde(default = "default_fog_color")]
    pub color: Color,
    #[serde(default = "default_inner_color")]
    pub inner_color: Color,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default)]
    pub rotation: RotationMode,
    /// Fixed seed for reproducible fields. `None` seeds from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for FogConfig {
    fn default() -> Self {
        Self {
            density: default_density(),
            height: 1.0,
            width: 1.0,
            depth: 1.0,
            origin: default_origin(),
            speed_size_change: default_speed_size_change(),
            opacity_coef: default_opacity_coef(),
            spawn_spread: default_spawn_spread(),
            frame_duration: default_frame_duration(),
            color: default_fog_color(),
            inner_color: default_inner_color(),
            opacity: default_opacity(),
            rotation: RotationMode::Identity,
            seed: None,
        }
    }
}

impl FogConfig {
    pub fn volume(&self) -> BoundingVolume {
        BoundingVolume::new(self.height, self.width, self.depth, Vec3::from_array(self.origin))
    }

    pub fn update_params(&self) -> UpdateParams {
        UpdateParams {
            speed_size_change: self.speed_size_change,
            opacity_coef: self.opacity_coef,
            spawn_spread: self.spawn_spread,
        }
    }

    /// Number of instances a field generated from this config holds.
    pub fn instance_count(&self) -> Result<usize> {
        self.volume().instance_count(self.density)
    }

    /// Check every field. Fails on the first invalid one.
    pub fn validate(&self) -> Result<()> {
        self.instance_count()?;
        non_negative("speed_size_change", self.speed_size_change)?;
        non_negative("opacity_coef", self.opacity_coef)?;
        non_negative("spawn_spread", self.spawn_spread)?;
        if !(self.frame_duration.is_finite() && self.frame_duration > 0.0) {
            return Err(invalid("frame_duration", "must be finite and > 0"));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(invalid("opacity", "must be within [0, 1]"));
        }
        Ok(())
    }

    /// Copy of this config with `patch` applied, plus what the patch changed.
    ///
    /// Fields set to their current value do not count as changes.
    pub fn patched(&self, patch: &ConfigPatch) -> (FogConfig, ConfigChange) {
        let mut next = self.clone();
        let mut change = ConfigChange::default();

        change.regenerate |= replace(&mut next.density, patch.density);
        change.regenerate |= replace(&mut next.height, patch.height);
        change.regenerate |= replace(&mut next.width, patch.width);
        change.regenerate |= replace(&mut next.depth, patch.depth);
        change.regenerate |= replace(&mut next.origin, patch.origin);
        change.regenerate |= replace(&mut next.rotation, patch.rotation);
        change.regenerate |= replace(&mut next.seed, patch.seed.map(Some));

        change.motion |= replace(&mut next.speed_size_change, patch.speed_size_change);
        change.motion |= replace(&mut next.opacity_coef, patch.opacity_coef);
        change.motion |= replace(&mut next.spawn_spread, patch.spawn_spread);

        change.material |= replace(&mut next.frame_duration, patch.frame_duration);
        change.material |= replace(&mut next.color, patch.color);
        change.material |= replace(&mut next.inner_color, patch.inner_color);
        change.material |= replace(&mut next.opacity, patch.opacity);

        (next, change)
    }
}

fn replace<T: PartialEq>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(value) if *slot != value => {
            *slot = value;
            true
        }
        _ => false,
    }
}

fn invalid(field: &'static str, reason: &str) -> FogError {
    FogError::InvalidConfig {
        field,
        reason: reason.to_string(),
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be finite and >= 0"))
    }
}

/// A partial [`FogConfig`]. Unset fields keep their current value.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConfigPatch {
    pub density: Option<f32>,
    pub height: Option<f32>,
    pub width: Option<f32>,
    pub depth: Option<f32>,
    pub origin: Option<[f32; 3]>,
    pub speed_size_change: Option<f32>,
    pub opacity_coef: Option<f32>,
    pub spawn_spread: Option<f32>,
    pub frame_duration: Option<f32>,
    pub color: Option<Color>,
    pub inner_color: Option<Color>,
    pub opacity: Option<f32>,
    pub rotation: Option<RotationMode>,
    pub seed: Option<u64>,
}

/// What applying a [`ConfigPatch`] changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConfigChange {
    /// A shape-affecting field changed; the field is rebuilt on the next tick.
    pub regenerate: bool,
    /// An update rate changed; read live by the next tick.
    pub motion: bool,
    /// A material uniform changed; pushed with the next tick's commands.
    pub material: bool,
}

impl ConfigChange {
    pub fn is_empty(&self) -> bool {
        !(self.regenerate || self.motion || self.material)
    }
}

fn default_water_color() -> Color {
    Color(0x8eb4e6)
}

fn default_foam_colors() -> [Color; 3] {
    [Color(0xc2e3ff), Color(0xe6f6ff), Color(0x000001)]
}

fn default_wave_period() -> f32 {
    1068.0
}

/// Water surface material settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WaterConfig {
    #[serde(default = "default_water_color")]
    pub color: Color,
    /// Foam colors from the shore line outward.
    #[serde(default = "default_foam_colors")]
    pub foam_colors: [Color; 3],
    /// Milliseconds per radian of the wave clock.
    #[serde(default = "default_wave_period")]
    pub wave_period_ms: f32,
}

impl Default for WaterConfig {
    fn default() -> Self {
        Self {
            color: default_water_color(),
            foam_colors: default_foam_colors(),
            wave_period_ms: default_wave_period(),
        }
    }
}

impl WaterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.wave_period_ms.is_finite() && self.wave_period_ms > 0.0 {
            Ok(())
        } else {
            Err(invalid("wave_period_ms", "must be finite and > 0"))
        }
    }
}

/// A complete demo preset.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DemoConfig {
    #[serde(default)]
    pub fog: FogConfig,
    #[serde(default)]
    pub water: WaterConfig,
}

impl DemoConfig {
    /// Save the preset to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> std::result::Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a preset from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config: DemoConfig = serde_json::from_str(&json)?;
        config.fog.validate()?;
        config.water.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parsing() {
        assert_eq!(Color::parse("#1a75ff"), Some(Color(0x1a75ff)));
        assert_eq!(Color::parse("0xFFCE00"), Some(Color(0xffce00)));
        assert_eq!(Color::parse("8eb4e6"), Some(Color(0x8eb4e6)));
        assert_eq!(Color::parse("#fff"), None);
        assert_eq!(Color::parse("#gggggg"), None);
        assert_eq!(Color::from_rgb(0x1a, 0x75, 0xff), Color(0x1a75ff));
    }

    #[test]
    fn test_color_serde_forms() {
        let from_text: Color = serde_json::from_str("\"#c2e3ff\"").unwrap();
        let from_int: Color = serde_json::from_str("12772351").unwrap();
        assert_eq!(from_text, Color(0xc2e3ff));
        assert_eq!(from_int, Color(0xc2e3ff));
        assert_eq!(serde_json::to_string(&Color(1)).unwrap(), "\"#000001\"");
        assert!(serde_json::from_str::<Color>("\"blue\"").is_err());
        assert!(serde_json::from_str::<Color>("16777216").is_err());
    }

    #[test]
    fn test_color_channels() {
        let c = Color(0xff8000).to_vec3();
        assert_eq!(c.x, 1.0);
        assert!((c.y - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.z, 0.0);
    }

    #[test]
    fn test_defaults_validate() {
        let config = FogConfig::default();
        config.validate().unwrap();
        assert_eq!(config.instance_count().unwrap(), 15);
        WaterConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = FogConfig {
            width: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FogError::InvalidDimension { field: "width", .. })
        ));

        let config = FogConfig {
            frame_duration: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FogError::InvalidConfig { field: "frame_duration", .. })
        ));

        let config = FogConfig {
            opacity_coef: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        // Zero growth keeps sprites at their spawn size
        let config = FogConfig {
            speed_size_change: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_growth_rate_is_rejected() {
        // A shrinking sprite would reach negative sizes before it fades out
        for rate in [-0.5, -0.01, f32::NAN, f32::INFINITY] {
            let config = FogConfig {
                speed_size_change: rate,
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(FogError::InvalidConfig { field: "speed_size_change", .. })),
                "rate {rate} accepted"
            );
        }

        let (next, _) = FogConfig::default().patched(&ConfigPatch {
            speed_size_change: Some(-0.5),
            ..Default::default()
        });
        assert!(next.validate().is_err());
    }

    #[test]
    fn test_patch_classifies_changes() {
        let base = FogConfig::default();

        let (next, change) = base.patched(&ConfigPatch {
            opacity_coef: Some(0.02),
            color: Some(Color(0xffffff)),
            ..Default::default()
        });
        assert_eq!(next.opacity_coef, 0.02);
        assert_eq!(
            change,
            ConfigChange {
                regenerate: false,
                motion: true,
                material: true
            }
        );

        let (_, change) = base.patched(&ConfigPatch {
            origin: Some([1.0, 0.0, 0.0]),
            ..Default::default()
        });
        assert!(change.regenerate);

        // Same value is not a change
        let (_, change) = base.patched(&ConfigPatch {
            density: Some(base.density),
            ..Default::default()
        });
        assert!(change.is_empty());
    }

    #[test]
    fn test_partial_preset_uses_defaults() {
        let config: DemoConfig = serde_json::from_str(r#"{ "fog": { "density": 40, "color": "0x00ff00" } }"#).unwrap();
        assert_eq!(config.fog.density, 40.0);
        assert_eq!(config.fog.color, Color(0x00ff00));
        assert_eq!(config.fog.speed_size_change, 0.029);
        assert_eq!(config.water, WaterConfig::default());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.json");

        let mut config = DemoConfig::default();
        config.fog.rotation = RotationMode::Random;
        config.fog.seed = Some(7);
        config.water.foam_colors[2] = Color(0x123456);
        config.save(&path).unwrap();

        assert_eq!(DemoConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_rejects_invalid_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{ "fog": { "height": -2 } }"#).unwrap();

        assert!(matches!(
            DemoConfig::load(&path),
            Err(ConfigError::Invalid(FogError::InvalidDimension { field: "height", .. }))
        ));
        assert!(matches!(
            DemoConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}

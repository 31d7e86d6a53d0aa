// RustPixel
// copyright zipxing@hotmail.com 2022～2025

//! Pipeline configuration loaded from TOML.
//!
//! ```toml
//! log_level = "debug"
//! log_file = "log/crt_pixel.log"
//! initial_preset = "Composite CRT"
//! output_format = "bgra8"
//!
//! [overrides."Composite CRT"]
//! maskType = 1
//! scanlineStrength = 0.4
//! ```
//!
//! Overrides are keyed by preset name and parameter storage key; they go
//! through the same sanitizing path as the preference panels.

use crate::error::{PipelineError, Result};
use crate::render::image::ImageFormat;
use crate::render::registry::EffectRegistry;
use log::{warn, LevelFilter};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub log_level: String,
    pub log_file: String,
    pub initial_preset: Option<String>,
    pub output_format: String,
    pub overrides: BTreeMap<String, BTreeMap<String, f32>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: "log/crt_pixel.log".to_string(),
            initial_preset: None,
            output_format: "bgra8".to_string(),
            overrides: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Unrecognized levels fall back to `Info`.
    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level.parse::<LevelFilter>() {
            Ok(level) => level,
            Err(_) => {
                warn!("PipelineConfig: unknown log level {:?}", self.log_level);
                LevelFilter::Info
            }
        }
    }

    pub fn output_format(&self) -> Result<ImageFormat> {
        match self.output_format.to_ascii_lowercase().as_str() {
            "bgra8" | "bgra8unorm" => Ok(ImageFormat::Bgra8Unorm),
            "rgba8" | "rgba8unorm" => Ok(ImageFormat::Rgba8Unorm),
            "rgba16f" | "rgba16float" => Ok(ImageFormat::Rgba16Float),
            other => Err(PipelineError::Config(format!(
                "unknown output format {:?}",
                other
            ))),
        }
    }

    /// Index of `initial_preset`, or the fallback when unset or unknown.
    pub fn initial_index(&self, registry: &EffectRegistry) -> usize {
        let Some(name) = &self.initial_preset else {
            return 0;
        };
        registry.index_of(name).unwrap_or_else(|| {
            warn!("PipelineConfig: unknown preset {:?}", name);
            0
        })
    }

    /// Write every override into the matching preset. Unknown presets and
    /// keys are logged and skipped. Returns how many values were applied.
    pub fn apply_overrides(&self, registry: &mut EffectRegistry) -> usize {
        let mut applied = 0;
        for (preset_name, values) in &self.overrides {
            let Some(index) = registry.index_of(preset_name) else {
                warn!("PipelineConfig: overrides for unknown preset {:?}", preset_name);
                continue;
            };
            let Some(preset) = registry.preset_mut(index) else {
                continue;
            };
            let params = preset.params_mut();
            for (key, value) in values {
                match params.set(key, *value) {
                    Ok(stored) => {
                        if stored != *value {
                            warn!(
                                "PipelineConfig: {}.{} = {} clamped to {}",
                                preset_name, key, value, stored
                            );
                        }
                        applied += 1;
                    }
                    Err(e) => warn!("PipelineConfig: {}: {}", preset_name, e),
                }
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::presets::CompositeCrt;

    const SAMPLE: &str = r#"
log_level = "debug"
initial_preset = "Composite CRT"
output_format = "rgba8"

[overrides."Composite CRT"]
maskType = 1
scanlineStrength = 0.4
bogus = 3.0

[overrides.Nowhere]
gamma = 1.0
"#;

    #[test]
    fn test_defaults_when_empty() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.level_filter(), LevelFilter::Info);
        assert_eq!(config.output_format().unwrap(), ImageFormat::Bgra8Unorm);
    }

    #[test]
    fn test_parse_sample() {
        let config = PipelineConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.level_filter(), LevelFilter::Debug);
        assert_eq!(config.output_format().unwrap(), ImageFormat::Rgba8Unorm);
        assert_eq!(config.overrides["Composite CRT"].len(), 3);
    }

    #[test]
    fn test_bad_input() {
        assert!(matches!(
            PipelineConfig::from_toml_str("log_level = 3"),
            Err(PipelineError::Config(_))
        ));
        let config = PipelineConfig {
            output_format: "yuv".into(),
            ..Default::default()
        };
        assert!(config.output_format().is_err());
    }

    #[test]
    fn test_apply_overrides_skips_unknown() {
        let config = PipelineConfig::from_toml_str(SAMPLE).unwrap();
        let mut registry = EffectRegistry::new();
        let crt = registry.register(Box::new(CompositeCrt::new()));
        assert_eq!(config.initial_index(&registry), crt);
        assert_eq!(config.apply_overrides(&mut registry), 2);
        let params = registry.preset(crt).unwrap().params();
        assert_eq!(params.get("maskType"), Some(1.0));
        assert!((params.get("scanlineStrength").unwrap() - 0.4).abs() < 1e-6);
    }
}

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use fractview_core::Complex;
use fractview_render::{EngineConfig, RenderParameters, DEFAULT_BATCH_SIZE};

/// A headless render job: surface, parameters, optional starting view and
/// the gestures to replay once the first generation is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_downscale")]
    pub raster_downscale: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub params: RenderParameters,
    /// Starting rectangle; the default view when absent.
    #[serde(default)]
    pub view: Option<ViewRect>,
    #[serde(default)]
    pub script: Vec<Gesture>,
}

fn default_width() -> u32 {
    800
}
fn default_height() -> u32 {
    600
}
fn default_downscale() -> u32 {
    1
}
fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            raster_downscale: default_downscale(),
            batch_size: default_batch_size(),
            params: RenderParameters::default(),
            view: None,
            script: Vec::new(),
        }
    }
}

/// Centre and real-axis span of a view; the imaginary span follows the
/// surface's aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewRect {
    pub center_re: f64,
    pub center_im: f64,
    pub range_re: f64,
}

impl ViewRect {
    pub fn center(&self) -> Complex {
        Complex::new(self.center_re, self.center_im)
    }
}

/// One scripted input event. Coordinates are surface pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum Gesture {
    Pan { dx: f64, dy: f64 },
    Pinch { factor: f64, x: f64, y: f64 },
    Resize { width: u32, height: u32 },
    Parameters { params: RenderParameters },
    RestoreDefault,
    Cancel,
    /// Keep polling for `millis`, or until idle when absent.
    Wait {
        #[serde(default)]
        millis: Option<u64>,
    },
}

impl RenderConfig {
    /// Read a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read render config {}", path.display()))?;
        let config = serde_json::from_str::<RenderConfig>(&json)
            .with_context(|| format!("failed to parse render config {}", path.display()))?;
        info!("Loaded render config from {}", path.display());
        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            width: self.width,
            height: self.height,
            raster_downscale: self.raster_downscale,
            batch_size: self.batch_size,
            params: self.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fractview_core::FractalVariant;

    #[test]
    fn empty_object_uses_defaults() {
        let config: RenderConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, RenderConfig::default());
        assert_eq!(config.engine_config().batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn parses_script() {
        let json = r#"{
            "width": 320,
            "height": 200,
            "params": { "variant": "burning_ship", "max_iterations": 300 },
            "view": { "center_re": -1.75, "center_im": -0.03, "range_re": 0.1 },
            "script": [
                { "gesture": "pan", "dx": 12.5, "dy": -4 },
                { "gesture": "pinch", "factor": 2.0, "x": 160, "y": 100 },
                { "gesture": "resize", "width": 400, "height": 300 },
                { "gesture": "parameters", "params": { "color_distribution": 10 } },
                { "gesture": "restore_default" },
                { "gesture": "cancel" },
                { "gesture": "wait", "millis": 50 },
                { "gesture": "wait" }
            ]
        }"#;
        let config: RenderConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.params.variant, FractalVariant::BurningShip);
        assert_eq!(config.params.max_iterations, 300);
        assert_eq!(config.params.escape_radius, 2.0);
        assert_eq!(config.view.unwrap().center(), Complex::new(-1.75, -0.03));
        assert_eq!(config.script.len(), 8);
        assert_eq!(config.script[0], Gesture::Pan { dx: 12.5, dy: -4.0 });
        assert_eq!(config.script[6], Gesture::Wait { millis: Some(50) });
        assert_eq!(config.script[7], Gesture::Wait { millis: None });
        match &config.script[3] {
            Gesture::Parameters { params } => {
                assert_eq!(params.color_distribution, 10.0);
                assert_eq!(params.max_iterations, 100);
            }
            other => panic!("unexpected gesture {other:?}"),
        }
    }

    #[test]
    fn invalid_parameters_fail_validation() {
        let json = r#"{ "params": { "escape_radius": -2 } }"#;
        let config: RenderConfig = serde_json::from_str(json).unwrap();
        assert!(config.engine_config().validate().is_err());
    }

    #[test]
    fn rejects_unknown_gesture() {
        let json = r#"{ "script": [ { "gesture": "twirl" } ] }"#;
        assert!(serde_json::from_str::<RenderConfig>(json).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = RenderConfig::load(Path::new("/nonexistent/fractview.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read render config"));
    }
}

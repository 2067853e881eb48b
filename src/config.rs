// src/config.rs

//! Configuration for the kernel harness.
//!
//! Every struct is `#[serde(default)]`, so a configuration file only needs the
//! keys it wants to change. The process-wide [`CONFIG`] reads the JSON file
//! named by `LANEFLOW_CONFIG`, or falls back to the defaults.

use std::path::Path;

use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::LaneError;
use crate::kernels::PixelFormat;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "LANEFLOW_CONFIG";

/// Configuration loaded on first access.
pub static CONFIG: Lazy<Config> = Lazy::new(|| match std::env::var(CONFIG_ENV) {
    Ok(path) => Config::load(&path).unwrap_or_else(|err| {
        warn!("Ignoring {}={}: {}", CONFIG_ENV, path, err);
        Config::default()
    }),
    Err(_) => Config::default(),
});

// --- Top-Level Configuration Structure ---

/// Root of the harness configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Timing loop settings.
    pub harness: HarnessConfig,
    /// Generated input sizes and seed.
    pub data: DataConfig,
    /// Test image for the pixel kernels.
    pub image: ImageConfig,
    /// Output settings.
    pub report: ReportConfig,
}

impl Config {
    pub fn from_json_str(text: &str) -> Result<Self, LaneError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LaneError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

// --- Harness ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Timed iterations per strategy.
    pub iterations: u32,
    /// Untimed iterations run first.
    pub warmup: u32,
    /// Relative tolerance for the reductions.
    pub epsilon: f64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        HarnessConfig {
            iterations: 100,
            warmup: 10,
            epsilon: 1e-4,
        }
    }
}

// --- Data ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Vectors per batch for the dot product.
    pub vector_count: usize,
    /// Seed for the generated inputs.
    pub seed: u64,
    /// Length of the elementwise, masking and conversion inputs.
    pub array_len: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            vector_count: 100_000,
            seed: 42,
            array_len: 1 << 16,
        }
    }
}

// --- Image ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub width: usize,
    pub height: usize,
    pub format: PixelFormat,
    /// Brightness delta applied by the suite.
    pub brightness: i32,
    /// Contrast factor applied by the suite.
    pub contrast: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        ImageConfig {
            width: 1920,
            height: 1080,
            format: PixelFormat::Rgb,
            brightness: 50,
            contrast: 1.5,
        }
    }
}

// --- Report ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReportConfig {
    /// Print the report as JSON on stdout.
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(Config::from_json_str("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::from_json_str(
            r#"{ "harness": { "iterations": 3 }, "image": { "format": "bgra" } }"#,
        )
        .unwrap();
        assert_eq!(config.harness.iterations, 3);
        assert_eq!(config.harness.warmup, 10);
        assert_eq!(config.image.format, PixelFormat::Bgra);
        assert_eq!(config.image.width, 1920);
    }

    #[test]
    fn test_malformed_json_is_config_error() {
        let err = Config::from_json_str("{ harness: ").unwrap_err();
        assert!(matches!(err, LaneError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/laneflow.json").unwrap_err();
        assert!(matches!(err, LaneError::Io(_)));
    }

    #[test]
    fn test_round_trip_through_json() {
        let mut config = Config::default();
        config.report.json = true;
        config.data.seed = 7;
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(Config::from_json_str(&text).unwrap(), config);
    }
}

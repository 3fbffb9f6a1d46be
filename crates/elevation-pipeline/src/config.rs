//! Pipeline configuration.

use std::path::Path;
use std::time::Duration;

use dem_common::ResamplingMethod;
use raster_encoder::EncoderOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tile_fetcher::{FetchConfig, TileSourceConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Everything a pipeline needs, passed in at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub source: TileSourceConfig,

    pub fetch: FetchConfig,

    pub encoder: EncoderOptions,

    /// Largest tile set a single request may resolve to.
    pub max_tiles: usize,

    /// Zoom used when a request gives neither zoom nor resolution.
    pub default_zoom: u8,

    /// Fraction of tiles allowed to be unavailable, unless the request
    /// overrides it.
    pub tolerance: f64,

    pub resampling: ResamplingMethod,

    /// Wall-clock limit for one request.
    #[serde(with = "millis", rename = "deadline_ms")]
    pub deadline: Duration,

    /// Upper bound on reprojected output size.
    pub max_output_pixels: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: TileSourceConfig::default(),
            fetch: FetchConfig::default(),
            encoder: EncoderOptions::default(),
            max_tiles: 50,
            default_zoom: 10,
            tolerance: 0.0,
            resampling: ResamplingMethod::Bilinear,
            deadline: Duration::from_secs(60),
            max_output_pixels: 64 * 1024 * 1024,
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            source: TileSourceConfig::from_env(),
            fetch: FetchConfig::from_env(),
            encoder: EncoderOptions::from_env(),
            ..Self::default()
        };
        config.apply_env();
        config
    }

    /// Load a YAML file, then apply environment overrides on top.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let mut config: Self = serde_yaml::from_str(&contents)?;
        config.apply_env();
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    /// Parse YAML; omitted keys keep their defaults.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("PIPELINE_MAX_TILES") {
            if let Ok(n) = val.parse() {
                self.max_tiles = n;
            }
        }

        if let Ok(val) = std::env::var("PIPELINE_DEFAULT_ZOOM") {
            if let Ok(z) = val.parse() {
                self.default_zoom = z;
            }
        }

        if let Ok(val) = std::env::var("PIPELINE_TOLERANCE") {
            if let Ok(t) = val.parse() {
                self.tolerance = t;
            }
        }

        if let Ok(val) = std::env::var("PIPELINE_RESAMPLING") {
            if let Some(method) = ResamplingMethod::parse(&val) {
                self.resampling = method;
            }
        }

        if let Ok(val) = std::env::var("PIPELINE_DEADLINE_MS") {
            if let Ok(ms) = val.parse() {
                self.deadline = Duration::from_millis(ms);
            }
        }

        if let Ok(val) = std::env::var("PIPELINE_MAX_OUTPUT_PIXELS") {
            if let Ok(n) = val.parse() {
                self.max_output_pixels = n;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;
        self.fetch.validate()?;
        self.encoder.validate()?;

        if self.max_tiles == 0 {
            return Err("max_tiles must be > 0".to_string());
        }

        if self.default_zoom > self.source.max_zoom {
            return Err(format!(
                "default_zoom {} exceeds source max_zoom {}",
                self.default_zoom, self.source.max_zoom
            ));
        }

        if !(0.0..=1.0).contains(&self.tolerance) {
            return Err("tolerance must lie in [0, 1]".to_string());
        }

        if self.deadline.is_zero() {
            return Err("deadline must be > 0".to_string());
        }

        if self.max_output_pixels == 0 {
            return Err("max_output_pixels must be > 0".to_string());
        }

        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

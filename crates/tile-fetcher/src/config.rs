//! Tile source and fetch configuration.

use std::time::Duration;

use dem_common::{TileEncoding, TilePyramid, TileSourceSpec};
use serde::{Deserialize, Serialize};

/// Default public Terrarium tile set on AWS.
pub const DEFAULT_TILE_URL: &str =
    "https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png";

/// Where tiles come from and how they are encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileSourceConfig {
    /// Address template with `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,

    pub encoding: TileEncoding,

    /// Tile edge length in pixels.
    pub tile_size: u32,

    /// Deepest zoom level served.
    pub max_zoom: u8,

    /// Override for the encoding's default no-data sentinel.
    pub nodata: Option<f32>,
}

impl Default for TileSourceConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_TILE_URL.to_string(),
            encoding: TileEncoding::Terrarium,
            tile_size: 256,
            max_zoom: 15,
            nodata: None,
        }
    }
}

impl TileSourceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("TILE_URL_TEMPLATE") {
            config.url_template = val;
        }

        if let Ok(val) = std::env::var("TILE_ENCODING") {
            if let Some(encoding) = TileEncoding::parse(&val) {
                config.encoding = encoding;
            }
        }

        if let Ok(val) = std::env::var("TILE_SIZE") {
            if let Ok(size) = val.parse() {
                config.tile_size = size;
            }
        }

        if let Ok(val) = std::env::var("TILE_MAX_ZOOM") {
            if let Ok(zoom) = val.parse() {
                config.max_zoom = zoom;
            }
        }

        if let Ok(val) = std::env::var("TILE_NODATA") {
            if let Ok(nodata) = val.parse() {
                config.nodata = Some(nodata);
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !self.url_template.contains(placeholder) {
                return Err(format!("url_template must contain {}", placeholder));
            }
        }

        if self.tile_size == 0 || self.tile_size > 4096 {
            return Err("tile_size must be in 1..=4096".to_string());
        }

        if self.max_zoom > 24 {
            return Err("max_zoom must be <= 24".to_string());
        }

        Ok(())
    }

    pub fn pyramid(&self) -> TilePyramid {
        TilePyramid::new(self.tile_size, self.max_zoom)
    }

    pub fn spec(&self) -> TileSourceSpec {
        TileSourceSpec {
            encoding: self.encoding,
            tile_size: self.tile_size,
            nodata: self.nodata,
        }
    }
}

/// Fetch concurrency and retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Maximum number of tile requests in flight per pipeline run.
    pub concurrency: usize,

    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,

    /// Delay before the first retry (doubles each retry).
    #[serde(with = "millis")]
    pub initial_backoff: Duration,

    /// Upper bound for the retry delay.
    #[serde(with = "millis")]
    pub max_backoff: Duration,

    /// Per-attempt HTTP timeout.
    #[serde(with = "millis")]
    pub request_timeout: Duration,

    #[serde(with = "millis")]
    pub connect_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl FetchConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("FETCH_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                config.concurrency = n;
            }
        }

        if let Ok(val) = std::env::var("FETCH_MAX_RETRIES") {
            if let Ok(n) = val.parse() {
                config.max_retries = n;
            }
        }

        if let Ok(val) = std::env::var("FETCH_INITIAL_BACKOFF_MS") {
            if let Ok(ms) = val.parse() {
                config.initial_backoff = Duration::from_millis(ms);
            }
        }

        if let Ok(val) = std::env::var("FETCH_MAX_BACKOFF_MS") {
            if let Ok(ms) = val.parse() {
                config.max_backoff = Duration::from_millis(ms);
            }
        }

        if let Ok(val) = std::env::var("FETCH_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                config.request_timeout = Duration::from_millis(ms);
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("fetch concurrency must be > 0".to_string());
        }

        if self.max_retries > 10 {
            return Err("fetch max_retries must be <= 10".to_string());
        }

        if self.initial_backoff > self.max_backoff {
            return Err("initial_backoff must not exceed max_backoff".to_string());
        }

        if self.request_timeout.is_zero() {
            return Err("request_timeout must be > 0".to_string());
        }

        Ok(())
    }

    /// Backoff delay before retry number `retry` (1-based).
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let mut delay = self.initial_backoff;
        for _ in 1..retry {
            delay = std::cmp::min(delay * 2, self.max_backoff);
        }
        delay
    }
}

/// Durations as integer milliseconds in config files.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(TileSourceConfig::default().validate().is_ok());
        assert!(FetchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_template_placeholders_required() {
        let config = TileSourceConfig {
            url_template: "https://tiles.example.com/{z}/{x}.png".to_string(),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("{y}"));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = FetchConfig {
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(700),
            ..Default::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(200));
        assert_eq!(config.backoff_for(2), Duration::from_millis(400));
        assert_eq!(config.backoff_for(3), Duration::from_millis(700));
        assert_eq!(config.backoff_for(6), Duration::from_millis(700));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let config = FetchConfig {
            concurrency: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_spec_uses_encoding_default_nodata() {
        let config = TileSourceConfig::default();
        assert_eq!(config.spec().nodata_sentinel(), Some(-32768.0));
        assert_eq!(config.pyramid().max_zoom, 15);
    }
}

//! Encoder configuration.

use serde::{Deserialize, Serialize};

/// Compression of GeoTIFF strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TiffCompression {
    None,
    Lzw,
    #[default]
    Deflate,
}

impl TiffCompression {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "none" | "uncompressed" => Some(Self::None),
            "lzw" => Some(Self::Lzw),
            "deflate" | "zip" => Some(Self::Deflate),
            _ => None,
        }
    }

    pub(crate) fn to_tiff(self) -> tiff::encoder::Compression {
        match self {
            Self::None => tiff::encoder::Compression::Uncompressed,
            Self::Lzw => tiff::encoder::Compression::Lzw,
            Self::Deflate => tiff::encoder::Compression::Deflate(
                tiff::encoder::compression::DeflateLevel::Fast,
            ),
        }
    }
}

/// Raster encoder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderOptions {
    /// GeoTIFF compression
    pub compression: TiffCompression,

    /// No-data value written into Float32 GeoTIFFs
    pub nodata_value: f64,

    /// Whether to add reduced-resolution overviews to the Float32 GeoTIFF
    pub overviews: bool,

    /// Overview levels whose larger side would fall below this size are skipped
    pub overview_min_size: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            compression: TiffCompression::Deflate,
            nodata_value: -9999.0,
            overviews: true,
            overview_min_size: 256,
        }
    }
}

impl EncoderOptions {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let mut options = Self::default();

        if let Ok(val) = std::env::var("ENCODER_COMPRESSION") {
            if let Some(c) = TiffCompression::parse(&val) {
                options.compression = c;
            }
        }

        if let Ok(val) = std::env::var("ENCODER_NODATA") {
            if let Ok(v) = val.parse() {
                options.nodata_value = v;
            }
        }

        if let Ok(val) = std::env::var("ENCODER_OVERVIEWS") {
            options.overviews = val.to_lowercase() != "false" && val != "0";
        }

        if let Ok(val) = std::env::var("ENCODER_OVERVIEW_MIN_SIZE") {
            if let Ok(v) = val.parse() {
                options.overview_min_size = v;
            }
        }

        options
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.nodata_value.is_finite() {
            return Err("nodata_value must be finite".to_string());
        }
        if self.nodata_value as f32 as f64 != self.nodata_value {
            return Err(format!(
                "nodata_value {} is not representable as Float32",
                self.nodata_value
            ));
        }
        if self.overview_min_size == 0 {
            return Err("overview_min_size must be at least 1".to_string());
        }
        Ok(())
    }
}

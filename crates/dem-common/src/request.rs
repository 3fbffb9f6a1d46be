//! Inbound request model and extent normalization.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::tile::mercator_to_lonlat;
use crate::{CrsCode, DemError, DemResult};

/// A request for an elevation mosaic as received from a caller.
///
/// Optional fields are kept as raw strings so that parse failures surface as
/// typed [`DemError`] kinds during validation rather than as transport-level
/// deserialization errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElevationRequest {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,

    /// CRS of the four extent coordinates (default EPSG:4326)
    #[serde(default)]
    pub bbox_crs: Option<String>,

    /// Source pyramid zoom level
    #[serde(default)]
    pub zoom: Option<u32>,

    /// Output pixel size in target CRS units
    #[serde(default)]
    pub resolution: Option<f64>,

    /// Output CRS (default: the source pyramid's Web Mercator)
    #[serde(default)]
    pub target_crs: Option<String>,

    /// Primary output format (default: geotiff)
    #[serde(default)]
    pub format: Option<String>,

    /// Additional renditions produced from the same grid
    #[serde(default)]
    pub extra_formats: Vec<String>,

    #[serde(default)]
    pub resampling: Option<String>,

    /// Fraction of tiles allowed to be unavailable
    #[serde(default)]
    pub tolerance: Option<f64>,
}

impl ElevationRequest {
    /// Create a geographic request with every option left at its default.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
            bbox_crs: None,
            zoom: None,
            resolution: None,
            target_crs: None,
            format: None,
            extra_formats: Vec::new(),
            resampling: None,
            tolerance: None,
        }
    }

    pub fn with_zoom(mut self, zoom: u32) -> Self {
        self.zoom = Some(zoom);
        self
    }

    pub fn with_target_crs(mut self, crs: impl Into<String>) -> Self {
        self.target_crs = Some(crs.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Normalized geographic extent of this request.
    pub fn extent(&self) -> DemResult<GeoExtent> {
        let crs = match &self.bbox_crs {
            Some(name) => CrsCode::parse(name)
                .map_err(|e| DemError::InvalidExtent(format!("bbox_crs: {}", e)))?,
            None => CrsCode::Wgs84,
        };
        GeoExtent::from_corners(self.west, self.south, self.east, self.north, crs)
    }

    /// Output CRS, defaulting to the source pyramid's Web Mercator.
    pub fn target_crs(&self) -> DemResult<CrsCode> {
        match &self.target_crs {
            Some(name) => CrsCode::parse(name).map_err(|e| DemError::ReprojectionError(e.to_string())),
            None => Ok(CrsCode::WebMercator),
        }
    }

    /// Primary format followed by any extra formats, duplicates removed.
    pub fn formats(&self) -> DemResult<Vec<OutputFormat>> {
        let mut formats = vec![match &self.format {
            Some(name) => OutputFormat::from_name(name)?,
            None => OutputFormat::default(),
        }];
        for name in &self.extra_formats {
            let format = OutputFormat::from_name(name)?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }

    pub fn resampling(&self) -> DemResult<Option<ResamplingMethod>> {
        self.resampling
            .as_deref()
            .map(|name| {
                ResamplingMethod::parse(name).ok_or_else(|| {
                    DemError::ReprojectionError(format!("Unknown resampling method: {}", name))
                })
            })
            .transpose()
    }

    /// Requested output pixel size, rejected when not a positive number.
    pub fn resolution(&self) -> DemResult<Option<f64>> {
        match self.resolution {
            Some(r) if !r.is_finite() || r <= 0.0 => Err(DemError::InvalidExtent(format!(
                "resolution must be a positive number, got {}",
                r
            ))),
            other => Ok(other),
        }
    }

    pub fn tolerance(&self) -> DemResult<Option<f64>> {
        match self.tolerance {
            Some(t) if !(0.0..=1.0).contains(&t) => Err(DemError::InvalidExtent(format!(
                "tolerance must lie in [0, 1], got {}",
                t
            ))),
            other => Ok(other),
        }
    }
}

/// A validated geographic extent in degrees.
///
/// `west` lies in [-180, 180). `east` is strictly greater than `west` and may
/// exceed 180 when the extent crosses the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoExtent {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

fn normalize_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

impl GeoExtent {
    /// Validate and normalize four corner coordinates given in `crs`.
    ///
    /// Only geographic CRSs and Web Mercator are accepted for extents.
    pub fn from_corners(
        west: f64,
        south: f64,
        east: f64,
        north: f64,
        crs: CrsCode,
    ) -> DemResult<Self> {
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return Err(DemError::InvalidExtent(
                "extent coordinates must be finite".to_string(),
            ));
        }

        let (west, south, east, north) = match crs {
            CrsCode::Wgs84 | CrsCode::Nad83 => (west, south, east, north),
            CrsCode::WebMercator => {
                let (w, s) = mercator_to_lonlat(west, south);
                let (e, n) = mercator_to_lonlat(east, north);
                (w, s, e, n)
            }
            other => {
                return Err(DemError::InvalidExtent(format!(
                    "extent CRS {} is not supported, use EPSG:4326 or EPSG:3857",
                    other
                )))
            }
        };

        Self::normalize(west, south, east, north)
    }

    /// Normalize a geographic extent.
    pub fn normalize(west: f64, south: f64, east: f64, north: f64) -> DemResult<Self> {
        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
            return Err(DemError::InvalidExtent(format!(
                "latitude outside [-90, 90]: south={}, north={}",
                south, north
            )));
        }
        if south >= north {
            return Err(DemError::InvalidExtent(format!(
                "south ({}) must be less than north ({})",
                south, north
            )));
        }

        let span = east - west;
        if span == 0.0 {
            return Err(DemError::InvalidExtent(format!(
                "west and east are equal ({})",
                west
            )));
        }
        if span.abs() > 360.0 {
            return Err(DemError::InvalidExtent(format!(
                "longitude span {} exceeds 360 degrees",
                span
            )));
        }

        let west_n = normalize_longitude(west);
        let east_n = if span == 360.0 {
            west_n + 360.0
        } else {
            let mut e = normalize_longitude(east);
            if e <= west_n {
                // Crosses the antimeridian: keep counting eastward.
                e += 360.0;
            }
            e
        };

        Ok(Self {
            west: west_n,
            south,
            east: east_n,
            north,
        })
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.east > 180.0
    }

    /// Center as (lon, lat), longitude wrapped back into [-180, 180).
    pub fn center(&self) -> (f64, f64) {
        (
            normalize_longitude((self.west + self.east) / 2.0),
            (self.south + self.north) / 2.0,
        )
    }
}

/// Output raster container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Float32 GeoTIFF with overviews
    #[serde(rename = "geotiff")]
    GeoTiff,
    /// 8-bit scaled GeoTIFF for display
    #[serde(rename = "geotiff_display")]
    GeoTiffDisplay,
    /// Terrarium packed RGB PNG
    #[serde(rename = "terrarium_png")]
    TerrariumPng,
}

impl OutputFormat {
    /// Parse a format name, accepting common aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "geotiff" | "gtiff" | "tif" | "tiff" | "cog" => Some(Self::GeoTiff),
            "geotiff_display" | "display" | "gtiff_display" => Some(Self::GeoTiffDisplay),
            "terrarium_png" | "terrarium" | "png" => Some(Self::TerrariumPng),
            _ => None,
        }
    }

    /// Parse a format name, failing with `UnsupportedFormat`.
    pub fn from_name(s: &str) -> DemResult<Self> {
        Self::parse(s).ok_or_else(|| DemError::UnsupportedFormat(s.to_string()))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeoTiff => "geotiff",
            Self::GeoTiffDisplay => "geotiff_display",
            Self::TerrariumPng => "terrarium_png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::GeoTiff | Self::GeoTiffDisplay => "image/tiff",
            Self::TerrariumPng => "image/png",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::GeoTiff | Self::GeoTiffDisplay => "tif",
            Self::TerrariumPng => "png",
        }
    }

    /// Base file name of the stored artifact.
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Self::GeoTiff => "mosaic",
            Self::GeoTiffDisplay => "mosaic_display",
            Self::TerrariumPng => "mosaic_terrarium",
        }
    }

    /// Storage key of this artifact within a request prefix.
    pub fn artifact_key(&self, request_id: &str) -> String {
        format!("{}/{}.{}", request_id, self.artifact_name(), self.extension())
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::GeoTiff
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interpolation kernel used when resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingMethod {
    Nearest,
    Bilinear,
    Cubic,
}

impl ResamplingMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "nearest" | "near" => Some(Self::Nearest),
            "bilinear" | "linear" => Some(Self::Bilinear),
            "cubic" | "bicubic" => Some(Self::Cubic),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Cubic => "cubic",
        }
    }
}

impl Default for ResamplingMethod {
    fn default() -> Self {
        Self::Bilinear
    }
}

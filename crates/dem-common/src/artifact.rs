//! Encoded output rasters.

use bytes::Bytes;
use serde::Serialize;

use crate::request::OutputFormat;
use crate::{CrsCode, GeoTransform};

/// A serialized raster plus the metadata needed to describe it.
#[derive(Debug, Clone)]
pub struct RasterArtifact {
    pub bytes: Bytes,
    pub format: OutputFormat,
    pub width: usize,
    pub height: usize,
    pub transform: GeoTransform,
    pub crs: CrsCode,
    /// Value written into the file for no-data cells
    pub nodata: Option<f64>,
}

impl RasterArtifact {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Metadata view without the payload.
    pub fn metadata(&self) -> ArtifactMetadata {
        ArtifactMetadata {
            format: self.format,
            content_type: self.content_type().to_string(),
            width: self.width,
            height: self.height,
            crs: self.crs,
            geo_transform: self.transform.to_gdal(),
            nodata: self.nodata,
            size_bytes: self.bytes.len(),
        }
    }
}

/// Serializable description of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactMetadata {
    pub format: OutputFormat,
    pub content_type: String,
    pub width: usize,
    pub height: usize,
    pub crs: CrsCode,
    /// GDAL-ordered affine coefficients
    pub geo_transform: [f64; 6],
    pub nodata: Option<f64>,
    pub size_bytes: usize,
}

//! Terrarium PNG encoding.
//!
//! Elevations are packed into RGB as `h + 32768 = R * 256 + G + B / 256`.
//! No-data is (0, 0, 0), which decodes to the Terrarium sentinel -32768.
//! Georeferencing travels in `tEXt` chunks:
//!
//! - `crs`: e.g. `EPSG:3857`
//! - `geotransform`: six GDAL-ordered coefficients, comma separated
//! - `nodata`: `-32768`

use std::io::Write;

use bytes::Bytes;
use dem_common::{DemError, DemResult, ElevationGrid, OutputFormat, RasterArtifact};
use tracing::debug;

use crate::RasterEncoder;

/// Elevation that (0, 0, 0) decodes to
pub const TERRARIUM_NODATA: f64 = -32768.0;

const TERRARIUM_OFFSET: f64 = 32768.0;
const TERRARIUM_MAX: f64 = 65535.0 + 255.0 / 256.0;

/// Pack one elevation into a Terrarium RGB triplet.
///
/// Values are truncated to 1/256 m and clamped to the representable range.
pub fn terrarium_pack(height: f32) -> [u8; 3] {
    if height.is_nan() {
        return [0, 0, 0];
    }
    let v = (height as f64 + TERRARIUM_OFFSET).clamp(0.0, TERRARIUM_MAX);
    let whole = v.floor();
    let fraction = v - whole;
    let whole = whole as u32;
    [(whole >> 8) as u8, (whole & 0xFF) as u8, (fraction * 256.0).floor() as u8]
}

/// Terrarium PNG encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerrariumPngEncoder;

impl TerrariumPngEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl RasterEncoder for TerrariumPngEncoder {
    fn format(&self) -> OutputFormat {
        OutputFormat::TerrariumPng
    }

    fn encode(&self, grid: &ElevationGrid) -> DemResult<RasterArtifact> {
        if grid.is_empty() {
            return Err(DemError::Internal("cannot encode an empty grid".to_string()));
        }

        let mut pixels = Vec::with_capacity(grid.len() * 3);
        for v in &grid.data {
            pixels.extend_from_slice(&terrarium_pack(*v));
        }

        let geotransform = grid
            .transform
            .to_gdal()
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let text = [
            ("crs", grid.crs.to_string()),
            ("geotransform", geotransform),
            ("nodata", TERRARIUM_NODATA.to_string()),
        ];

        let png = create_png_rgb(&pixels, grid.width, grid.height, &text)
            .map_err(|e| DemError::Internal(format!("PNG encoding failed: {}", e)))?;
        debug!(size_bytes = png.len(), "Encoded Terrarium PNG");

        Ok(RasterArtifact {
            bytes: Bytes::from(png),
            format: OutputFormat::TerrariumPng,
            width: grid.width,
            height: grid.height,
            transform: grid.transform,
            crs: grid.crs,
            nodata: Some(TERRARIUM_NODATA),
        })
    }
}

/// Create an RGB PNG with optional `tEXt` chunks.
///
/// # Arguments
/// - `pixels`: RGB pixel data (3 bytes per pixel)
/// - `width`: Image width in pixels
/// - `height`: Image height in pixels
/// - `text`: keyword/value pairs written before the image data
pub fn create_png_rgb(
    pixels: &[u8],
    width: usize,
    height: usize,
    text: &[(&str, String)],
) -> Result<Vec<u8>, String> {
    if pixels.len() != width * height * 3 {
        return Err(format!(
            "expected {} bytes of RGB data, got {}",
            width * height * 3,
            pixels.len()
        ));
    }

    let mut png = Vec::new();

    // PNG signature
    png.extend_from_slice(&[137, 80, 78, 71, 13, 10, 26, 10]);

    // IHDR chunk
    let mut ihdr_data = Vec::new();
    ihdr_data.extend_from_slice(&(width as u32).to_be_bytes());
    ihdr_data.extend_from_slice(&(height as u32).to_be_bytes());
    ihdr_data.push(8); // bit depth
    ihdr_data.push(2); // color type (RGB)
    ihdr_data.push(0); // compression method
    ihdr_data.push(0); // filter method
    ihdr_data.push(0); // interlace method
    write_chunk(&mut png, b"IHDR", &ihdr_data);

    for (keyword, value) in text {
        let mut data = Vec::with_capacity(keyword.len() + 1 + value.len());
        data.extend_from_slice(keyword.as_bytes());
        data.push(0);
        data.extend_from_slice(value.as_bytes());
        write_chunk(&mut png, b"tEXt", &data);
    }

    // IDAT chunk (image data)
    let idat_data = deflate_idat_rgb(pixels, width, height)
        .map_err(|e| format!("IDAT compression failed: {}", e))?;
    write_chunk(&mut png, b"IDAT", &idat_data);

    // IEND chunk
    write_chunk(&mut png, b"IEND", &[]);

    Ok(png)
}

/// Write a PNG chunk
fn write_chunk(png: &mut Vec<u8>, chunk_type: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    png.extend_from_slice(chunk_type);
    png.extend_from_slice(data);

    let mut hasher = crc32fast::Hasher::new();
    hasher.update(chunk_type);
    hasher.update(data);
    png.extend_from_slice(&hasher.finalize().to_be_bytes());
}

/// Deflate RGB image data for IDAT chunk.
fn deflate_idat_rgb(pixels: &[u8], width: usize, height: usize) -> std::io::Result<Vec<u8>> {
    let stride = width * 3;
    let mut uncompressed = Vec::with_capacity(height * (1 + stride));
    for row in pixels.chunks_exact(stride) {
        uncompressed.push(0); // filter type: none
        uncompressed.extend_from_slice(row);
    }

    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&uncompressed)?;
    encoder.finish()
}

//! Colour-packed elevation tiles (Terrarium and Terrain-RGB PNGs).

use dem_common::{DemError, DemResult, TileEncoding};
use image::ColorType;

/// Terrarium: `R*256 + G + B/256 - 32768`.
#[inline]
pub fn terrarium_to_height(r: u8, g: u8, b: u8) -> f32 {
    r as f32 * 256.0 + g as f32 + b as f32 / 256.0 - 32768.0
}

/// Mapbox Terrain-RGB: `-10000 + (R*65536 + G*256 + B) * 0.1`.
#[inline]
pub fn terrain_rgb_to_height(r: u8, g: u8, b: u8) -> f32 {
    let packed = (r as u32) * 65536 + (g as u32) * 256 + b as u32;
    (-10000.0 + packed as f64 * 0.1) as f32
}

/// Decode an RGB(A) tile into (width, height, heights).
///
/// Pixels with zero alpha decode to `NaN`. Sentinel handling is left to the
/// caller.
pub fn decode_rgb(bytes: &[u8], encoding: TileEncoding) -> DemResult<(u32, u32, Vec<f32>)> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| DemError::DecodeError(format!("invalid {:?} tile: {}", encoding, e)))?;

    let height_of = match encoding {
        TileEncoding::TerrainRgb => terrain_rgb_to_height,
        _ => terrarium_to_height,
    };

    let (width, height) = (image.width(), image.height());
    let data = match image.color() {
        ColorType::Rgb8 => image
            .to_rgb8()
            .pixels()
            .map(|p| height_of(p[0], p[1], p[2]))
            .collect(),
        ColorType::Rgba8 => image
            .to_rgba8()
            .pixels()
            .map(|p| {
                if p[3] == 0 {
                    f32::NAN
                } else {
                    height_of(p[0], p[1], p[2])
                }
            })
            .collect(),
        other => {
            return Err(DemError::DecodeError(format!(
                "unsupported colour type {:?}, expected 8-bit RGB or RGBA",
                other
            )))
        }
    };

    Ok((width, height, data))
}

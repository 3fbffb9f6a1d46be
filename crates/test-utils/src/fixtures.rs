//! Common test fixtures for elevation mosaic tests.
//!
//! This module provides pre-defined extents, requests and tile sets that
//! represent common scenarios.

use dem_common::{ElevationRequest, TileCoordinate};

use crate::generators::{synthetic_elevation, terrarium_png_with};

/// Common extents as (west, south, east, north) in degrees.
pub mod extents {
    /// San Francisco peninsula; four tiles at zoom 10
    pub const SAN_FRANCISCO: (f64, f64, f64, f64) = (-122.5, 37.7, -122.3, 37.9);

    /// Small box straddling the antimeridian
    pub const ANTIMERIDIAN: (f64, f64, f64, f64) = (179.5, -0.5, -179.5, 0.5);

    /// Small box at the origin
    pub const NULL_ISLAND: (f64, f64, f64, f64) = (-0.5, -0.5, 0.5, 0.5);

    /// Degenerate box (west == east)
    pub const DEGENERATE: (f64, f64, f64, f64) = (10.0, 10.0, 10.0, 11.0);
}

/// Request over one of the [`extents`].
pub fn request_for(extent: (f64, f64, f64, f64)) -> ElevationRequest {
    ElevationRequest::new(extent.0, extent.1, extent.2, extent.3)
}

/// San Francisco at zoom 10 in the source CRS, GeoTIFF output.
pub fn sf_request() -> ElevationRequest {
    request_for(extents::SAN_FRANCISCO)
        .with_zoom(10)
        .with_target_crs("EPSG:3857")
        .with_format("geotiff")
}

/// The four zoom 10 tiles covering [`extents::SAN_FRANCISCO`].
pub fn sf_tiles() -> Vec<TileCoordinate> {
    vec![
        TileCoordinate::new(10, 163, 395),
        TileCoordinate::new(10, 164, 395),
        TileCoordinate::new(10, 163, 396),
        TileCoordinate::new(10, 164, 396),
    ]
}

/// Terrarium PNG for `coord` filled with [`synthetic_elevation`] of each
/// pixel's global position, so neighbouring tiles line up at the seams.
pub fn synthetic_tile_png(coord: TileCoordinate, tile_size: u32) -> Vec<u8> {
    let base_x = coord.x as u64 * tile_size as u64;
    let base_y = coord.y as u64 * tile_size as u64;
    terrarium_png_with(tile_size, |col, row| {
        synthetic_elevation(base_x + col as u64, base_y + row as u64)
    })
}

/// Encoded synthetic tiles for every coordinate.
pub fn synthetic_tiles(coords: &[TileCoordinate], tile_size: u32) -> Vec<(TileCoordinate, Vec<u8>)> {
    coords
        .iter()
        .map(|c| (*c, synthetic_tile_png(*c, tile_size)))
        .collect()
}

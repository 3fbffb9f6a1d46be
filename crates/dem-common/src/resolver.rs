//! Tile coordinate resolution.
//!
//! Converts a normalized geographic extent into the rectangular set of
//! source tiles that covers it at one zoom level.

use serde::Serialize;

use crate::request::GeoExtent;
use crate::tile::{TileCoordinate, TilePyramid, MAX_LATITUDE};
use crate::{CrsCode, DemError, DemResult};

/// Meters per degree of longitude at the equator on the WGS84 sphere.
const METERS_PER_DEGREE: f64 = 111_319.490_793_273_57;

/// Rounding allowance on the pyramid's latitude limit.
const LATITUDE_SLACK: f64 = 1e-9;

/// Inclusive range of tile columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnRange {
    pub start: u32,
    pub end: u32,
}

impl ColumnRange {
    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn contains(&self, column: u32) -> bool {
        column >= self.start && column <= self.end
    }
}

/// The tiles covering one extent at one zoom level.
///
/// An extent crossing the antimeridian yields two column ranges: the eastern
/// edge of the pyramid first, then its western edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TileSet {
    pub zoom: u8,
    pub columns: Vec<ColumnRange>,
    pub row_start: u32,
    pub row_end: u32,
}

impl TileSet {
    pub fn rows(&self) -> usize {
        (self.row_end - self.row_start + 1) as usize
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.columns.iter().map(ColumnRange::len).sum::<usize>() * self.rows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_split(&self) -> bool {
        self.columns.len() > 1
    }

    pub fn contains(&self, coord: &TileCoordinate) -> bool {
        coord.z == self.zoom
            && coord.y >= self.row_start
            && coord.y <= self.row_end
            && self.columns.iter().any(|r| r.contains(coord.x))
    }

    /// Every tile coordinate, row-major.
    pub fn coordinates(&self) -> Vec<TileCoordinate> {
        let mut coords = Vec::with_capacity(self.len());
        for y in self.row_start..=self.row_end {
            for range in &self.columns {
                for x in range.start..=range.end {
                    coords.push(TileCoordinate::new(self.zoom, x, y));
                }
            }
        }
        coords
    }

    /// Fail with `TooManyTiles` when the set exceeds `limit`.
    pub fn enforce_limit(&self, limit: usize) -> DemResult<()> {
        let requested = self.len();
        if requested > limit {
            return Err(DemError::TooManyTiles { requested, limit });
        }
        Ok(())
    }
}

/// Check a zoom level against the pyramid depth.
pub fn check_zoom(pyramid: &TilePyramid, zoom: u32) -> DemResult<u8> {
    if zoom > pyramid.max_zoom as u32 {
        return Err(DemError::ZoomOutOfRange {
            zoom,
            max_zoom: pyramid.max_zoom,
        });
    }
    Ok(zoom as u8)
}

/// Resolve the tiles covering `extent` at `zoom`.
///
/// Corner coordinates are converted to global pixel space; the covering tile
/// rectangle runs from the floor of the minima to the ceiling of the maxima
/// minus one.
///
/// Latitudes beyond the pyramid's reach (about ±85.0511°) are rejected
/// rather than clamped, since no tile could cover them.
pub fn resolve_tiles(pyramid: &TilePyramid, extent: &GeoExtent, zoom: u32) -> DemResult<TileSet> {
    let zoom = check_zoom(pyramid, zoom)?;

    if !(extent.west < extent.east) || !(extent.south < extent.north) {
        return Err(DemError::InvalidExtent(format!(
            "extent ({}, {}, {}, {}) is empty",
            extent.west, extent.south, extent.east, extent.north
        )));
    }
    check_latitude_coverage(extent)?;

    let n = 1i64 << zoom;
    let tile_size = pyramid.tile_size as f64;

    let px_min = pyramid.lon_to_pixel_x(extent.west, zoom);
    let px_max = pyramid.lon_to_pixel_x(extent.east, zoom);
    let col_min = ((px_min / tile_size).floor() as i64).clamp(0, n - 1);
    let col_max = ((px_max / tile_size).ceil() as i64 - 1).max(col_min);

    // North maps to the smaller pixel row.
    let py_min = pyramid.lat_to_pixel_y(extent.north, zoom);
    let py_max = pyramid.lat_to_pixel_y(extent.south, zoom);
    let row_start = ((py_min / tile_size).floor() as i64).clamp(0, n - 1);
    let row_end = ((py_max / tile_size).ceil() as i64 - 1).clamp(row_start, n - 1);

    let columns = if col_max - col_min + 1 >= n {
        vec![ColumnRange {
            start: 0,
            end: (n - 1) as u32,
        }]
    } else if col_max >= n {
        vec![
            ColumnRange {
                start: col_min as u32,
                end: (n - 1) as u32,
            },
            ColumnRange {
                start: 0,
                end: (col_max - n) as u32,
            },
        ]
    } else {
        vec![ColumnRange {
            start: col_min as u32,
            end: col_max as u32,
        }]
    };

    Ok(TileSet {
        zoom,
        columns,
        row_start: row_start as u32,
        row_end: row_end as u32,
    })
}

/// Fail with `InvalidExtent` when part of `extent` lies outside the
/// Web Mercator tile pyramid.
pub fn check_latitude_coverage(extent: &GeoExtent) -> DemResult<()> {
    let limit = MAX_LATITUDE + LATITUDE_SLACK;
    if extent.north > limit || extent.south < -limit {
        return Err(DemError::InvalidExtent(format!(
            "latitudes {}..{} exceed the tile pyramid limit of ±{:.4}",
            extent.south, extent.north, MAX_LATITUDE
        )));
    }
    Ok(())
}

/// Pick the shallowest zoom whose native pixel is at least as fine as
/// `resolution` (in `target_crs` units), capped at the pyramid depth.
///
/// Native ground size is measured at the extent's center latitude.
pub fn zoom_for_resolution(
    pyramid: &TilePyramid,
    extent: &GeoExtent,
    resolution: f64,
    target_crs: CrsCode,
) -> u8 {
    let (_, center_lat) = extent.center();
    let lat_scale = center_lat
        .clamp(-MAX_LATITUDE, MAX_LATITUDE)
        .to_radians()
        .cos();

    for zoom in 0..=pyramid.max_zoom {
        let native = match target_crs {
            CrsCode::WebMercator => pyramid.resolution(zoom),
            CrsCode::Wgs84 | CrsCode::Nad83 => {
                pyramid.resolution(zoom) * lat_scale / METERS_PER_DEGREE
            }
            CrsCode::Utm { .. } => pyramid.resolution(zoom) * lat_scale,
        };
        if native <= resolution {
            return zoom;
        }
    }
    pyramid.max_zoom
}

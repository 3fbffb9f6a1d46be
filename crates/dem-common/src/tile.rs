//! Web Mercator tile pyramid definitions.
//!
//! Source elevation tiles are addressed XYZ style: zoom `z` splits the world
//! into `2^z x 2^z` square tiles, column 0 at 180°W, row 0 at the northern
//! Mercator limit.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use crate::{BoundingBox, GeoTransform};

/// WGS84 semi-major axis used by spherical Web Mercator.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Half the Web Mercator world width in meters.
pub const HALF_WORLD: f64 = PI * EARTH_RADIUS;

/// Latitude where the square Web Mercator world ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoordinate {
    /// Zoom level
    pub z: u8,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoordinate {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one axis at this zoom.
    pub fn matrix_size(&self) -> u32 {
        1u32 << self.z
    }

    /// Check that column and row lie within `[0, 2^z)`.
    pub fn is_valid(&self) -> bool {
        self.z <= 30 && self.x < self.matrix_size() && self.y < self.matrix_size()
    }

    /// Web Mercator bounds of this tile in meters.
    pub fn mercator_bounds(&self) -> BoundingBox {
        let span = 2.0 * HALF_WORLD / self.matrix_size() as f64;
        let min_x = -HALF_WORLD + self.x as f64 * span;
        let max_y = HALF_WORLD - self.y as f64 * span;
        BoundingBox::new(min_x, max_y - span, min_x + span, max_y)
    }

    /// Affine transform for a `tile_size` pixel rendition of this tile.
    pub fn geo_transform(&self, tile_size: u32) -> GeoTransform {
        let bounds = self.mercator_bounds();
        let pixel = bounds.width() / tile_size as f64;
        GeoTransform::new(bounds.min_x, bounds.max_y, pixel, pixel)
    }

    /// Fill a `{z}/{x}/{y}` address template.
    pub fn fill_template(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

impl fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Encoded tile bytes as returned by a tile source.
#[derive(Debug, Clone)]
pub struct EncodedTile {
    pub coord: TileCoordinate,
    pub bytes: Bytes,
}

impl EncodedTile {
    pub fn new(coord: TileCoordinate, bytes: impl Into<Bytes>) -> Self {
        Self {
            coord,
            bytes: bytes.into(),
        }
    }
}

/// How elevation is packed into a source tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileEncoding {
    /// Mapzen/AWS Terrarium PNG: `R*256 + G + B/256 - 32768`
    Terrarium,
    /// Mapbox Terrain-RGB PNG: `-10000 + (R*65536 + G*256 + B) * 0.1`
    TerrainRgb,
    /// Single band GeoTIFF with raw elevation samples
    GeoTiff,
}

impl TileEncoding {
    /// Parse an encoding name as used in configuration.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "terrarium" => Some(Self::Terrarium),
            "terrain-rgb" | "terrain_rgb" | "terrainrgb" | "mapbox" => Some(Self::TerrainRgb),
            "geotiff" | "tiff" | "tif" => Some(Self::GeoTiff),
            _ => None,
        }
    }

    /// Decoded value that marks no-data unless configured otherwise.
    pub fn default_nodata_sentinel(&self) -> Option<f32> {
        match self {
            Self::Terrarium => Some(-32768.0),
            Self::TerrainRgb => Some(-10000.0),
            Self::GeoTiff => None,
        }
    }
}

impl Default for TileEncoding {
    fn default() -> Self {
        Self::Terrarium
    }
}

/// What a decoder needs to know about a source's tiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileSourceSpec {
    pub encoding: TileEncoding,
    /// Expected tile edge length in pixels
    pub tile_size: u32,
    /// Decoded value treated as no-data; `None` uses the encoding default
    pub nodata: Option<f32>,
}

impl TileSourceSpec {
    pub fn new(encoding: TileEncoding, tile_size: u32) -> Self {
        Self {
            encoding,
            tile_size,
            nodata: None,
        }
    }

    /// Effective no-data sentinel.
    pub fn nodata_sentinel(&self) -> Option<f32> {
        self.nodata.or_else(|| self.encoding.default_nodata_sentinel())
    }
}

impl Default for TileSourceSpec {
    fn default() -> Self {
        Self::new(TileEncoding::Terrarium, 256)
    }
}

/// Description of the source Web Mercator tile pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TilePyramid {
    /// Tile edge length in pixels
    pub tile_size: u32,
    /// Deepest zoom level the source serves
    pub max_zoom: u8,
}

impl Default for TilePyramid {
    fn default() -> Self {
        Self {
            tile_size: 256,
            max_zoom: 15,
        }
    }
}

impl TilePyramid {
    pub fn new(tile_size: u32, max_zoom: u8) -> Self {
        Self {
            tile_size,
            max_zoom,
        }
    }

    /// Width of the whole world in pixels at `zoom`.
    pub fn world_pixels(&self, zoom: u8) -> f64 {
        self.tile_size as f64 * (1u64 << zoom) as f64
    }

    /// Ground size of one pixel in meters at the equator.
    pub fn resolution(&self, zoom: u8) -> f64 {
        2.0 * HALF_WORLD / self.world_pixels(zoom)
    }

    /// Global pixel x of a longitude. Longitudes past 180° keep counting
    /// eastward so antimeridian-crossing extents stay monotonic.
    pub fn lon_to_pixel_x(&self, lon: f64, zoom: u8) -> f64 {
        (lon + 180.0) / 360.0 * self.world_pixels(zoom)
    }

    /// Global pixel y of a latitude, clamped to the Mercator limit.
    pub fn lat_to_pixel_y(&self, lat: f64, zoom: u8) -> f64 {
        let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * self.world_pixels(zoom)
    }

    /// Web Mercator x (meters) of a global pixel column edge.
    pub fn pixel_x_to_meters(&self, px: f64, zoom: u8) -> f64 {
        -HALF_WORLD + px * self.resolution(zoom)
    }

    /// Web Mercator y (meters) of a global pixel row edge.
    pub fn pixel_y_to_meters(&self, py: f64, zoom: u8) -> f64 {
        HALF_WORLD - py * self.resolution(zoom)
    }
}

/// Project lon/lat degrees to spherical Web Mercator meters.
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Inverse of [`lonlat_to_mercator`].
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (y / EARTH_RADIUS).sinh().atan().to_degrees();
    (lon, lat)
}

/// Convert lat/lon to the Web Mercator tile containing it.
pub fn latlon_to_tile(lat: f64, lon: f64, zoom: u8) -> TileCoordinate {
    let n = (1u32 << zoom) as f64;

    let x = ((lon + 180.0) / 360.0 * n).floor().clamp(0.0, n - 1.0) as u32;
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n)
        .floor()
        .clamp(0.0, n - 1.0) as u32;

    TileCoordinate { z: zoom, x, y }
}

/// Convert Web Mercator tile coordinates to lat/lon bounds.
pub fn tile_to_latlon_bounds(coord: &TileCoordinate) -> BoundingBox {
    let n = coord.matrix_size() as f64;

    let lon_min = coord.x as f64 / n * 360.0 - 180.0;
    let lon_max = (coord.x + 1) as f64 / n * 360.0 - 180.0;

    let lat_max = (PI * (1.0 - 2.0 * coord.y as f64 / n)).sinh().atan().to_degrees();
    let lat_min = (PI * (1.0 - 2.0 * (coord.y + 1) as f64 / n))
        .sinh()
        .atan()
        .to_degrees();

    BoundingBox::new(lon_min, lat_min, lon_max, lat_max)
}

//! Spherical Web Mercator (EPSG:3857).

use dem_common::tile::{lonlat_to_mercator, mercator_to_lonlat, MAX_LATITUDE};

use crate::transform::CoordinateTransform;

/// Latitudes are accepted up to this much past the square-world limit to
/// absorb rounding at the pyramid edge.
const LATITUDE_SLACK: f64 = 1e-9;

/// Spherical Web Mercator on the WGS84 semi-major axis.
///
/// Longitudes are not wrapped: 190°E projects east of the antimeridian so
/// extents crossing it stay continuous.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl CoordinateTransform for WebMercator {
    fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if lat.abs() > MAX_LATITUDE + LATITUDE_SLACK || !lon.is_finite() {
            return None;
        }
        let (x, y) = lonlat_to_mercator(lon, lat);
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        Some(mercator_to_lonlat(x, y))
    }

    fn name(&self) -> &'static str {
        "Web Mercator"
    }
}

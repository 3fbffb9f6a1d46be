//! Geographic coordinates (longitude/latitude in degrees).

use crate::transform::CoordinateTransform;

/// Identity projection for WGS84 and NAD83 (treated as coincident).
#[derive(Debug, Clone, Copy, Default)]
pub struct Geographic;

impl CoordinateTransform for Geographic {
    fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if lat.abs() > 90.0 || !lon.is_finite() {
            return None;
        }
        Some((lon, lat))
    }

    fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        self.forward(x, y)
    }

    fn name(&self) -> &'static str {
        "Geographic"
    }
}

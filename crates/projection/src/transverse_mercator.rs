//! Transverse Mercator on the WGS84 ellipsoid, parameterized for UTM.
//!
//! Series expansions follow Snyder, "Map Projections: A Working Manual"
//! (USGS PP 1395), equations 8-9 through 8-10 and 8-17 through 8-25. They are
//! accurate to well under a meter within a few degrees of the central
//! meridian and degrade gracefully further out.

use std::f64::consts::PI;

use crate::transform::CoordinateTransform;

/// WGS84 semi-major axis (meters)
const SEMI_MAJOR: f64 = 6_378_137.0;
/// WGS84 inverse flattening
const INV_FLATTENING: f64 = 298.257_223_563;
/// UTM scale factor on the central meridian
const UTM_SCALE: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

/// Longitude offset from the central meridian beyond which points are
/// rejected; the series diverge rapidly past it.
const MAX_CENTRAL_OFFSET_DEG: f64 = 60.0;

/// Transverse Mercator projection parameters.
#[derive(Debug, Clone)]
pub struct TransverseMercator {
    /// Central meridian in radians
    pub lon0: f64,
    pub scale: f64,
    pub false_easting: f64,
    pub false_northing: f64,
    /// First eccentricity squared
    e2: f64,
    /// Second eccentricity squared
    ep2: f64,
}

impl TransverseMercator {
    /// Create a projection with the given central meridian (degrees).
    pub fn new(lon0_deg: f64, scale: f64, false_easting: f64, false_northing: f64) -> Self {
        let f = 1.0 / INV_FLATTENING;
        let e2 = f * (2.0 - f);
        Self {
            lon0: lon0_deg.to_radians(),
            scale,
            false_easting,
            false_northing,
            e2,
            ep2: e2 / (1.0 - e2),
        }
    }

    /// UTM zone 1..=60, northern or southern hemisphere.
    pub fn utm(zone: u8, north: bool) -> Self {
        let lon0 = zone as f64 * 6.0 - 183.0;
        let false_northing = if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH };
        Self::new(lon0, UTM_SCALE, UTM_FALSE_EASTING, false_northing)
    }

    /// Central meridian in degrees.
    pub fn central_meridian(&self) -> f64 {
        self.lon0.to_degrees()
    }

    /// Meridional arc length from the equator to `phi` (radians).
    fn meridian_arc(&self, phi: f64) -> f64 {
        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        SEMI_MAJOR
            * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin())
    }
}

fn wrap_radians(mut angle: f64) -> f64 {
    while angle > PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

impl CoordinateTransform for TransverseMercator {
    fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)> {
        if !lon.is_finite() || !lat.is_finite() || lat.abs() >= 90.0 {
            return None;
        }

        let dlon = wrap_radians(lon.to_radians() - self.lon0);
        if dlon.abs() > MAX_CENTRAL_OFFSET_DEG.to_radians() {
            return None;
        }

        let phi = lat.to_radians();
        let (sin_phi, cos_phi) = phi.sin_cos();
        let tan_phi = phi.tan();

        let n = SEMI_MAJOR / (1.0 - self.e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = self.ep2 * cos_phi * cos_phi;
        let a = dlon * cos_phi;
        let ep2 = self.ep2;

        let x = self.scale
            * n
            * (a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0);

        let y = self.scale
            * (self.meridian_arc(phi)
                + n * tan_phi
                    * (a * a / 2.0
                        + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                        + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6)
                            / 720.0));

        let (x, y) = (x + self.false_easting, y + self.false_northing);
        (x.is_finite() && y.is_finite()).then_some((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }

        let e2 = self.e2;
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = self.ep2;

        let x = x - self.false_easting;
        let m = (y - self.false_northing) / self.scale;
        let mu = m / (SEMI_MAJOR * (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0));

        let sqrt_1_e2 = (1.0 - e2).sqrt();
        let e1 = (1.0 - sqrt_1_e2) / (1.0 + sqrt_1_e2);

        // Footpoint latitude
        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

        if phi1.abs() >= PI / 2.0 {
            return None;
        }

        let (sin_p1, cos_p1) = phi1.sin_cos();
        let tan_p1 = phi1.tan();
        let c1 = ep2 * cos_p1 * cos_p1;
        let t1 = tan_p1 * tan_p1;
        let denom = 1.0 - e2 * sin_p1 * sin_p1;
        let n1 = SEMI_MAJOR / denom.sqrt();
        let r1 = SEMI_MAJOR * (1.0 - e2) / denom.powf(1.5);
        let d = x / (n1 * self.scale);

        let phi = phi1
            - (n1 * tan_p1 / r1)
                * (d * d / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                        * d.powi(6)
                        / 720.0);

        let lambda = self.lon0
            + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d.powi(5)
                    / 120.0)
                / cos_p1;

        let (lon, lat) = (lambda.to_degrees(), phi.to_degrees());
        (lon.is_finite() && lat.is_finite() && lat.abs() <= 90.0).then_some((lon, lat))
    }

    fn name(&self) -> &'static str {
        "Transverse Mercator"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equator_reference_points() {
        let zone31 = TransverseMercator::utm(31, true);
        let (x, y) = zone31.forward(3.0, 0.0).unwrap();
        assert!((x - 500_000.0).abs() < 1e-6);
        assert!(y.abs() < 1e-6);

        let (x, _) = zone31.forward(0.0, 0.0).unwrap();
        assert!((x - 166_021.443).abs() < 0.01, "got {}", x);

        let (_, y) = zone31.forward(3.0, 45.0).unwrap();
        assert!((y - 4_982_950.400).abs() < 0.01, "got {}", y);
    }

    #[test]
    fn test_san_francisco_zone_10() {
        let utm = TransverseMercator::utm(10, true);
        assert_eq!(utm.central_meridian(), -123.0);

        let (x, y) = utm.forward(-122.4194, 37.7749).unwrap();
        assert!((x - 551_130.768).abs() < 0.01, "easting {}", x);
        assert!((y - 4_180_998.882).abs() < 0.01, "northing {}", y);

        let (lon, lat) = utm.inverse(x, y).unwrap();
        assert!((lon + 122.4194).abs() < 1e-7);
        assert!((lat - 37.7749).abs() < 1e-7);
    }

    #[test]
    fn test_southern_hemisphere_false_northing() {
        let utm = TransverseMercator::utm(56, false);
        let (x, y) = utm.forward(151.2093, -33.8688).unwrap();
        assert!((x - 334_368.634).abs() < 0.01);
        assert!((y - 6_250_948.345).abs() < 0.01);

        let (lon, lat) = utm.inverse(x, y).unwrap();
        assert!((lon - 151.2093).abs() < 1e-7);
        assert!((lat + 33.8688).abs() < 1e-7);
    }

    #[test]
    fn test_far_from_central_meridian_rejected() {
        let utm = TransverseMercator::utm(10, true);
        assert!(utm.forward(-123.0 + 61.0, 10.0).is_none());
        assert!(utm.forward(-123.0 + 59.0, 10.0).is_some());
        assert!(utm.forward(-123.0, 90.0).is_none());
    }
}

//! The narrow transform interface used by the reprojector.

use dem_common::CrsCode;

use crate::{Geographic, ProjectionError, ProjectionResult, TransverseMercator, WebMercator};

/// A map projection between geographic lon/lat (degrees) and projected
/// coordinates.
///
/// Both directions return `None` where the projection is undefined.
pub trait CoordinateTransform: Send + Sync {
    /// Project lon/lat degrees into CRS coordinates.
    fn forward(&self, lon: f64, lat: f64) -> Option<(f64, f64)>;

    /// Unproject CRS coordinates into lon/lat degrees.
    fn inverse(&self, x: f64, y: f64) -> Option<(f64, f64)>;

    fn name(&self) -> &'static str;
}

/// Build the projection for a supported CRS.
pub fn projection_for(crs: CrsCode) -> Box<dyn CoordinateTransform> {
    match crs {
        CrsCode::WebMercator => Box::new(WebMercator),
        CrsCode::Wgs84 | CrsCode::Nad83 => Box::new(Geographic),
        CrsCode::Utm { zone, north } => Box::new(TransverseMercator::utm(zone, north)),
    }
}

/// Point transformer between two CRSs.
pub struct Transformer {
    source_crs: CrsCode,
    target_crs: CrsCode,
    source: Box<dyn CoordinateTransform>,
    target: Box<dyn CoordinateTransform>,
}

impl std::fmt::Debug for Transformer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transformer")
            .field("source_crs", &self.source_crs)
            .field("target_crs", &self.target_crs)
            .finish()
    }
}

impl Transformer {
    pub fn new(source_crs: CrsCode, target_crs: CrsCode) -> Self {
        Self {
            source_crs,
            target_crs,
            source: projection_for(source_crs),
            target: projection_for(target_crs),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.source_crs == self.target_crs
            || (self.source_crs.is_geographic() && self.target_crs.is_geographic())
    }

    /// Transform one point from the source CRS into the target CRS.
    pub fn transform_point(&self, x: f64, y: f64) -> ProjectionResult<(f64, f64)> {
        if self.is_identity() {
            return Ok((x, y));
        }

        let (lon, lat) = self
            .source
            .inverse(x, y)
            .ok_or_else(|| self.out_of_domain(self.source_crs, x, y))?;
        self.target
            .forward(lon, lat)
            .ok_or_else(|| self.out_of_domain(self.target_crs, lon, lat))
    }

    /// Like [`transform_point`](Self::transform_point) but yields `None`
    /// instead of an error; used in per-pixel loops.
    pub fn try_transform(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        if self.is_identity() {
            return Some((x, y));
        }
        let (lon, lat) = self.source.inverse(x, y)?;
        self.target.forward(lon, lat)
    }

    fn out_of_domain(&self, crs: CrsCode, x: f64, y: f64) -> ProjectionError {
        ProjectionError::OutOfDomain {
            crs: crs.to_string(),
            x,
            y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mercator_to_geographic() {
        let t = Transformer::new(CrsCode::WebMercator, CrsCode::Wgs84);
        let (lon, lat) = t.transform_point(-13_625_505.673, 0.0).unwrap();
        assert!((lon + 122.4).abs() < 1e-6);
        assert!(lat.abs() < 1e-9);
    }

    #[test]
    fn test_geographic_aliases_are_identity() {
        let t = Transformer::new(CrsCode::Nad83, CrsCode::Wgs84);
        assert!(t.is_identity());
        assert_eq!(t.transform_point(12.5, -3.25).unwrap(), (12.5, -3.25));
    }

    #[test]
    fn test_utm_roundtrip_through_mercator() {
        let utm = CrsCode::Utm {
            zone: 10,
            north: true,
        };
        let to_utm = Transformer::new(CrsCode::WebMercator, utm);
        let back = Transformer::new(utm, CrsCode::WebMercator);

        let (x, y) = (-13_627_000.0, 4_548_000.0);
        let (e, n) = to_utm.transform_point(x, y).unwrap();
        let (x2, y2) = back.transform_point(e, n).unwrap();
        assert!((x - x2).abs() < 1e-3);
        assert!((y - y2).abs() < 1e-3);
    }

    #[test]
    fn test_pole_is_singular_for_mercator() {
        let t = Transformer::new(CrsCode::Wgs84, CrsCode::WebMercator);
        let err = t.transform_point(0.0, 89.0).unwrap_err();
        assert!(matches!(err, ProjectionError::OutOfDomain { .. }));
        assert!(t.try_transform(0.0, 89.0).is_none());
    }
}

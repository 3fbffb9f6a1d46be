//! Coordinate Reference System codes supported by the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Well-known CRS codes the reprojector can target.
///
/// The source tile pyramid is always Web Mercator; any of these may be
/// requested as output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CrsCode {
    /// Web Mercator (meters)
    WebMercator,
    /// WGS84 Geographic (lon/lat in degrees)
    Wgs84,
    /// NAD83 Geographic, treated as coincident with WGS84
    Nad83,
    /// WGS84 / UTM zone (EPSG:326xx north, EPSG:327xx south)
    Utm { zone: u8, north: bool },
}

impl CrsCode {
    /// Parse a CRS string such as "EPSG:4326", "epsg:3857", "CRS:84" or "EPSG:32610".
    pub fn parse(s: &str) -> Result<Self, CrsParseError> {
        let normalized = s.trim().to_uppercase();

        match normalized.as_str() {
            "EPSG:4326" | "CRS:84" | "WGS84" => return Ok(CrsCode::Wgs84),
            "EPSG:3857" | "EPSG:900913" | "EPSG:3785" => return Ok(CrsCode::WebMercator),
            "EPSG:4269" => return Ok(CrsCode::Nad83),
            _ => {}
        }

        let code = normalized
            .strip_prefix("EPSG:")
            .and_then(|c| c.parse::<u32>().ok())
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;

        Self::from_epsg(code).ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))
    }

    /// Look up a CRS by its numeric EPSG code.
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(CrsCode::Wgs84),
            3857 | 900913 | 3785 => Some(CrsCode::WebMercator),
            4269 => Some(CrsCode::Nad83),
            32601..=32660 => Some(CrsCode::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Some(CrsCode::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => None,
        }
    }

    /// Numeric EPSG code.
    pub fn epsg(&self) -> u32 {
        match self {
            CrsCode::WebMercator => 3857,
            CrsCode::Wgs84 => 4326,
            CrsCode::Nad83 => 4269,
            CrsCode::Utm { zone, north: true } => 32600 + *zone as u32,
            CrsCode::Utm { zone, north: false } => 32700 + *zone as u32,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Wgs84 | CrsCode::Nad83)
    }

    /// Linear unit of the CRS axes.
    pub fn units(&self) -> &'static str {
        if self.is_geographic() {
            "degree"
        } else {
            "metre"
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for CrsCode {
    type Err = CrsParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CrsCode {
    type Error = CrsParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CrsCode> for String {
    fn from(code: CrsCode) -> Self {
        code.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}

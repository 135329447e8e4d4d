//! Geographic bounding boxes and Web Mercator (EPSG:3857) projection.

use std::f64::consts::PI;

/// WGS84 semi-major axis used by EPSG:3857, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the square Web Mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// A geographic bounding box in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Western boundary longitude.
    pub west: f64,
    /// Southern boundary latitude.
    pub south: f64,
    /// Eastern boundary longitude.
    pub east: f64,
    /// Northern boundary latitude.
    pub north: f64,
}

impl GeoBounds {
    /// Create a new bounding box.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &GeoBounds) -> GeoBounds {
        GeoBounds {
            west: self.west.min(other.west),
            south: self.south.min(other.south),
            east: self.east.max(other.east),
            north: self.north.max(other.north),
        }
    }

    /// Corners scaled by 1e7 and truncated toward zero, as
    /// `(west, south, east, north)`.
    pub fn to_e7(&self) -> (i32, i32, i32, i32) {
        (
            degrees_to_e7(self.west),
            degrees_to_e7(self.south),
            degrees_to_e7(self.east),
            degrees_to_e7(self.north),
        )
    }
}

/// Scale degrees by 1e7 and truncate toward zero.
#[inline]
pub fn degrees_to_e7(degrees: f64) -> i32 {
    (degrees * 1e7) as i32
}

/// Project longitude/latitude in degrees to EPSG:3857 meters.
///
/// Latitudes at the poles project to infinity; callers check finiteness.
#[inline]
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Latitude of the northern edge of tile row `y` at a zoom with `n` tiles per side.
#[inline]
pub(crate) fn row_to_lat(y: f64, n: f64) -> f64 {
    (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees()
}

/// Longitude of the western edge of tile column `x`.
#[inline]
pub(crate) fn col_to_lon(x: f64, n: f64) -> f64 {
    x / n * 360.0 - 180.0
}

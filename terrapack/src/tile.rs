//! Tile addressing.
//!
//! This module provides [`TileCoord`], a validated position in the standard
//! power-of-two tile pyramid, and [`tile_id`], the PMTiles v3 mapping from
//! `(z, x, y)` to a single integer.
//!
//! # Tile IDs
//!
//! Ids are ordered first by zoom level and then by position along a Hilbert
//! curve within the level. Zoom `z` occupies the range
//! `[(4^z - 1) / 3, (4^(z+1) - 1) / 3)`, so every tile of a shallower zoom
//! sorts before every tile of a deeper one. Archives store tiles in id order,
//! which lets readers find a tile from its id alone.

use std::fmt;

use crate::error::{Result, TerrainError};
use crate::mercator::{col_to_lon, row_to_lat, GeoBounds};

/// Deepest zoom level whose ids fit in a `u64`.
pub const MAX_ZOOM: u8 = 31;

/// A tile position `(z, x, y)` with `0 <= x, y < 2^z`.
///
/// Construction through [`TileCoord::new`] guarantees the position is legal,
/// so id conversion never fails afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoord {
    z: u8,
    x: u32,
    y: u32,
}

impl TileCoord {
    /// Create a tile coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidTileCoordinate`] if `z > MAX_ZOOM` or
    /// the column or row is outside `[0, 2^z)`.
    pub fn new(z: u8, x: u32, y: u32) -> Result<Self> {
        if z > MAX_ZOOM || u64::from(x) >= tiles_per_side(z) || u64::from(y) >= tiles_per_side(z) {
            return Err(TerrainError::InvalidTileCoordinate { z, x, y });
        }
        Ok(Self { z, x, y })
    }

    /// Recover the coordinate for a tile id.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidTileId`] for ids past the last tile of
    /// [`MAX_ZOOM`].
    pub fn from_id(tile_id: u64) -> Result<Self> {
        let mut acc = 0u64;
        for z in 0..=MAX_ZOOM {
            let level_tiles = 1u64 << (2 * u32::from(z));
            if tile_id - acc < level_tiles {
                let (x, y) = hilbert_to_xy(z, tile_id - acc);
                return Ok(Self { z, x, y });
            }
            acc += level_tiles;
        }
        Err(TerrainError::InvalidTileId { tile_id })
    }

    /// Zoom level.
    pub fn z(&self) -> u8 {
        self.z
    }

    /// Column, counted from the antimeridian eastward.
    pub fn x(&self) -> u32 {
        self.x
    }

    /// Row, counted from the north edge southward.
    pub fn y(&self) -> u32 {
        self.y
    }

    /// The PMTiles tile id of this coordinate.
    pub fn id(&self) -> u64 {
        tile_id(self.z, self.x, self.y)
    }

    /// Geographic extent of the tile in degrees.
    pub fn bounds(&self) -> GeoBounds {
        let n = tiles_per_side(self.z) as f64;
        let x = f64::from(self.x);
        let y = f64::from(self.y);
        GeoBounds {
            west: col_to_lon(x, n),
            south: row_to_lat(y + 1.0, n),
            east: col_to_lon(x + 1.0, n),
            north: row_to_lat(y, n),
        }
    }

    /// The tile one zoom level up that contains this one.
    pub fn parent(&self) -> Option<TileCoord> {
        if self.z == 0 {
            return None;
        }
        Some(TileCoord {
            z: self.z - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// The four tiles one zoom level down, in row-major order.
    pub fn children(&self) -> Option<[TileCoord; 4]> {
        if self.z == MAX_ZOOM {
            return None;
        }
        let (z, x, y) = (self.z + 1, self.x * 2, self.y * 2);
        Some([
            TileCoord { z, x, y },
            TileCoord { z, x: x + 1, y },
            TileCoord { z, x, y: y + 1 },
            TileCoord {
                z,
                x: x + 1,
                y: y + 1,
            },
        ])
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Number of tiles along one side of the pyramid at zoom `z`.
#[inline]
fn tiles_per_side(z: u8) -> u64 {
    1u64 << z
}

/// First tile id of zoom level `z`: `(4^z - 1) / 3`.
#[inline]
pub fn zoom_base_id(z: u8) -> u64 {
    ((1u64 << (2 * u32::from(z))) - 1) / 3
}

/// Compute the PMTiles v3 tile id of `(z, x, y)`.
///
/// The caller must pass a legal position (see [`TileCoord::new`]).
///
/// # Examples
///
/// ```
/// use terrapack::tile::tile_id;
///
/// assert_eq!(tile_id(0, 0, 0), 0);
/// assert_eq!(tile_id(1, 0, 0), 1);
/// assert_eq!(tile_id(1, 0, 1), 2);
/// assert_eq!(tile_id(1, 1, 1), 3);
/// assert_eq!(tile_id(1, 1, 0), 4);
/// ```
#[inline]
pub fn tile_id(z: u8, x: u32, y: u32) -> u64 {
    debug_assert!(z <= MAX_ZOOM);
    debug_assert!(u64::from(x) < tiles_per_side(z) && u64::from(y) < tiles_per_side(z));

    let n = tiles_per_side(z);
    let (mut x, mut y) = (u64::from(x), u64::from(y));
    let mut d = 0u64;
    let mut s = n >> 1;
    while s > 0 {
        let rx = u64::from((x & s) > 0);
        let ry = u64::from((y & s) > 0);
        d += s * s * ((3 * rx) ^ ry);
        rotate(n, &mut x, &mut y, rx, ry);
        s >>= 1;
    }
    zoom_base_id(z) + d
}

/// Position `d` along the Hilbert curve of zoom `z` back to `(x, y)`.
fn hilbert_to_xy(z: u8, d: u64) -> (u32, u32) {
    let n = tiles_per_side(z);
    let (mut x, mut y) = (0u64, 0u64);
    let mut t = d;
    let mut s = 1u64;
    while s < n {
        let rx = 1 & (t / 2);
        let ry = 1 & (t ^ rx);
        rotate(s, &mut x, &mut y, rx, ry);
        x += s * rx;
        y += s * ry;
        t /= 4;
        s *= 2;
    }
    // x, y < 2^31 here
    (x as u32, y as u32)
}

#[inline]
fn rotate(n: u64, x: &mut u64, y: &mut u64, rx: u64, ry: u64) {
    if ry == 0 {
        if rx == 1 {
            *x = n - 1 - *x;
            *y = n - 1 - *y;
        }
        std::mem::swap(x, y);
    }
}

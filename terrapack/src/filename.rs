//! Filename conventions.
//!
//! Two naming schemes meet in this crate:
//!
//! - Tiles are named `{z}-{x}-{y}.{ext}`, e.g. `10-904-403.webp`.
//! - SRTM rasters are named after their southwest corner,
//!   `{N|S}{lat}{E|W}{lon}.hgt`, e.g. `N35E138.hgt`. The name is the only
//!   georeference an `.hgt` file carries.

use std::path::Path;

use crate::error::{Result, TerrainError};
use crate::tile::TileCoord;

/// File name for a tile, e.g. `10-904-403.webp`.
///
/// # Examples
///
/// ```
/// use terrapack::{filename::tile_filename, TileCoord};
///
/// let coord = TileCoord::new(10, 904, 403).unwrap();
/// assert_eq!(tile_filename(&coord, "webp"), "10-904-403.webp");
/// ```
pub fn tile_filename(coord: &TileCoord, extension: &str) -> String {
    format!("{}-{}-{}.{}", coord.z(), coord.x(), coord.y(), extension)
}

/// Parse a `{z}-{x}-{y}` tile name.
///
/// Any leading directories and the extension are ignored.
///
/// # Errors
///
/// - [`TerrainError::MalformedTileName`] if the stem is not three
///   dash-separated integers
/// - [`TerrainError::InvalidTileCoordinate`] if the integers do not name a
///   tile
///
/// # Examples
///
/// ```
/// use terrapack::filename::parse_tile_name;
///
/// let coord = parse_tile_name("tiles/3-5-2.webp").unwrap();
/// assert_eq!((coord.z(), coord.x(), coord.y()), (3, 5, 2));
/// assert!(parse_tile_name("preview.webp").is_err());
/// ```
pub fn parse_tile_name(name: &str) -> Result<TileCoord> {
    let malformed = || TerrainError::MalformedTileName {
        name: name.to_string(),
    };

    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(malformed)?;

    let mut parts = stem.split('-');
    let (z, x, y) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(z), Some(x), Some(y), None) => (z, x, y),
        _ => return Err(malformed()),
    };

    let z: u8 = z.parse().map_err(|_| malformed())?;
    let x: u32 = x.parse().map_err(|_| malformed())?;
    let y: u32 = y.parse().map_err(|_| malformed())?;
    TileCoord::new(z, x, y)
}

/// Parse an SRTM filename to extract the base coordinates.
///
/// # Arguments
///
/// * `filename` - The filename (with or without path, with or without extension)
///
/// # Returns
///
/// The (latitude, longitude) of the southwest corner, or `None` if parsing fails.
///
/// # Examples
///
/// ```
/// use terrapack::filename::filename_to_lat_lon;
///
/// assert_eq!(filename_to_lat_lon("N35E138.hgt"), Some((35, 138)));
/// assert_eq!(filename_to_lat_lon("S12W077.hgt"), Some((-12, -77)));
/// assert_eq!(filename_to_lat_lon("/path/to/N00E000.hgt"), Some((0, 0)));
/// assert_eq!(filename_to_lat_lon("invalid"), None);
/// ```
pub fn filename_to_lat_lon(filename: &str) -> Option<(i32, i32)> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let name = name
        .strip_suffix(".hgt")
        .or_else(|| name.strip_suffix(".HGT"))
        .unwrap_or(name);

    // N00E000
    if name.len() != 7 || !name.is_ascii() {
        return None;
    }
    let bytes = name.as_bytes();

    let lat_sign = match bytes[0] {
        b'N' | b'n' => 1,
        b'S' | b's' => -1,
        _ => return None,
    };
    let lat: i32 = name[1..3].parse().ok()?;

    let lon_sign = match bytes[3] {
        b'E' | b'e' => 1,
        b'W' | b'w' => -1,
        _ => return None,
    };
    let lon: i32 = name[4..7].parse().ok()?;

    if lat > 90 || lon > 180 {
        return None;
    }
    Some((lat * lat_sign, lon * lon_sign))
}

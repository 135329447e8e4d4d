//! Error types for the terrapack library.

use std::path::PathBuf;
use thiserror::Error;

use crate::tile::TileCoord;

/// Errors that can occur while encoding tiles or assembling an archive.
#[derive(Error, Debug)]
pub enum TerrainError {
    /// IO error when reading or writing files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source raster carries no georeference.
    #[error("No coordinate reference found for {path}")]
    MissingProjection { path: PathBuf },

    /// A reprojected raster corner is NaN or infinite.
    #[error("Number in bounds is not finite for {path}: ({left}, {bottom}, {right}, {top})")]
    NonFiniteBound {
        path: PathBuf,
        left: f64,
        bottom: f64,
        right: f64,
        top: f64,
    },

    /// An elevation sample is NaN or infinite.
    #[error("Non-finite elevation {value} at sample {index}")]
    NonFiniteElevation { index: usize, value: f32 },

    /// Shifted elevation falls outside the Terrarium range [0, 65536).
    #[error("Elevation {value}m at sample {index} is outside the Terrarium range [-32768, 32768)")]
    OutOfRangeElevation { index: usize, value: f64 },

    /// Two inputs map to the same tile.
    #[error("Duplicate tile coordinate {coord}")]
    DuplicateTileCoordinate { coord: TileCoord },

    /// A tile name does not follow `{z}-{x}-{y}.{ext}`.
    #[error("Malformed tile name: {name}")]
    MalformedTileName { name: String },

    /// Column or row outside `[0, 2^z)`, or zoom above the supported maximum.
    #[error("Invalid tile coordinate: z={z}, x={x}, y={y}")]
    InvalidTileCoordinate { z: u8, x: u32, y: u32 },

    /// Tile id beyond the deepest supported zoom level.
    #[error("Tile id {tile_id} is beyond zoom 31")]
    InvalidTileId { tile_id: u64 },

    /// Raster file size doesn't match SRTM1 or SRTM3 format.
    #[error("Invalid file size: {size} bytes (expected 25934402 for SRTM1 or 2884802 for SRTM3)")]
    InvalidFileSize { size: u64 },

    /// Elevation grid does not hold `size * size` samples.
    #[error("Grid has {actual} samples, expected {expected}")]
    GridSize { expected: usize, actual: usize },

    /// A tile payload could not be read while building an archive.
    #[error("Failed to read tile {coord} from {path}: {source}")]
    TileRead {
        coord: TileCoord,
        path: PathBuf,
        source: std::io::Error,
    },

    /// A single tile payload is longer than a directory entry can address.
    #[error("Tile id {tile_id} is {size} bytes; entries hold at most 4294967295")]
    TileTooLarge { tile_id: u64, size: usize },

    /// Tiles were handed to the archive writer out of id order.
    #[error("Tile id {tile_id} written after {previous}; tiles must be ascending")]
    UnorderedTile { tile_id: u64, previous: u64 },

    /// An archive needs at least one tile.
    #[error("No tiles to write")]
    EmptyArchive,

    /// Image encoder or decoder failure.
    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    /// CSV report error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Metadata serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using [`TerrainError`].
pub type Result<T> = std::result::Result<T, TerrainError>;

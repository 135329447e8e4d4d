//! # terrapack - Terrarium terrain tile packaging
//!
//! Packages gridded elevation data into a single PMTiles v3 archive of
//! Terrarium-encoded WebP tiles, ready to be served as terrain.
//!
//! ## Features
//!
//! - **Zoom-aware precision**: elevations are rounded to a lattice that
//!   coarsens with every zoom level, so low zoom tiles compress better
//! - **Lossless**: tiles are lossless WebP; decoding returns the quantized
//!   elevations exactly
//! - **Deterministic archives**: tiles are ordered by PMTiles tile id and the
//!   archive is written atomically
//! - **Parallel**: bulk encoding runs on all cores
//!
//! ## Quick Start
//!
//! ```ignore
//! use terrapack::{encode_tiles, ArchiveBuilder, EncodeJob, ElevationGrid, TerrariumConfig, TileCoord, WebpEncoder};
//!
//! let config = TerrariumConfig::default();
//! let jobs = vec![
//!     EncodeJob::new(TileCoord::new(0, 0, 0)?, ElevationGrid::constant(512, 0.0)),
//!     EncodeJob::new(TileCoord::new(1, 0, 0)?, ElevationGrid::constant(512, 100.0)),
//! ];
//!
//! let report = encode_tiles(&jobs, &config, &WebpEncoder);
//! let summary = ArchiveBuilder::new("terrain.pmtiles").build(report.into_payloads())?;
//! println!("{} tiles, {} bytes", summary.tile_count, summary.file_size);
//! ```
//!
//! ## Terrarium Format
//!
//! Each pixel stores `elevation + 32768` in meters:
//!
//! - **R**: high byte of the integer part
//! - **G**: low byte of the integer part
//! - **B**: fractional part in 1/256 m steps
//!
//! The representable range is `[-32768, 32768)` m.

pub mod archive;
pub mod batch;
pub mod bounds;
pub mod encoder;
pub mod error;
pub mod filename;
pub mod mercator;
pub mod terrarium;
pub mod tile;

// Re-export main types at crate root for convenience
pub use archive::{ArchiveBuilder, ArchiveSummary, ArchiveWriter, TilePayload, TileType};
pub use batch::{encode_grid_dir, encode_tiles, encode_to_dir, BatchReport, EncodeJob};
pub use bounds::{collect_bounds, write_bounds_csv, BoundsProvider, HgtBoundsProvider, RasterBounds};
pub use encoder::{decode_webp, TileEncoder, WebpEncoder};
pub use error::{Result, TerrainError};
pub use mercator::GeoBounds;
pub use terrarium::{decode_pixel, ElevationGrid, EncodedTile, TerrariumConfig};
pub use tile::{tile_id, TileCoord, MAX_ZOOM};

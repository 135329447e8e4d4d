//! PMTiles v3 archive assembly.
//!
//! [`ArchiveBuilder`] is the entry point: it takes encoded tiles keyed by
//! [`TileCoord`](crate::TileCoord), orders them by tile id and writes one
//! archive file atomically. [`ArchiveWriter`] is the lower-level streaming
//! writer it drives, for callers that already produce tiles in id order.

mod builder;
mod directory;
mod header;
mod writer;

pub use builder::{
    scan_tile_dir, ArchiveBuilder, ArchiveSummary, TilePayload, DEFAULT_ATTRIBUTION,
    TERRARIUM_FORMAT,
};
pub use directory::{build_directories, serialize_directory, Directories, Entry, ROOT_DIRECTORY_BUDGET};
pub use header::{Compression, Header, TileType, HEADER_SIZE, MAGIC, VERSION};
pub use writer::{ArchiveWriter, TilesetInfo};

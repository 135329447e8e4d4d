//! Streaming PMTiles writer.
//!
//! Tiles are appended in ascending id order to a scratch file. When all tiles
//! are in, [`ArchiveWriter::finalize`] lays out the final archive:
//!
//! ```text
//! header | root directory | leaf directories | tile data | JSON metadata
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use serde::Serialize;
use sha2::{Digest, Sha256};

use super::directory::{build_directories, gzip, Entry};
use super::header::{Compression, Header, TileType, HEADER_SIZE};
use crate::error::{Result, TerrainError};
use crate::mercator::GeoBounds;

/// Tileset-level values recorded in the header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilesetInfo {
    pub tile_type: TileType,
    pub tile_compression: Compression,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub bounds: GeoBounds,
}

/// Appends tiles in id order and finalizes them into a PMTiles archive.
///
/// # Example
///
/// ```ignore
/// let mut writer = ArchiveWriter::new(false)?;
/// writer.write_tile(tile_id(0, 0, 0), &webp_bytes)?;
/// let header = writer.finalize(&mut file, &info, &metadata)?;
/// ```
pub struct ArchiveWriter {
    /// Scratch file holding tile data in write order.
    tile_data: BufWriter<File>,
    /// Bytes written to `tile_data`.
    offset: u64,
    entries: Vec<Entry>,
    addressed_tiles: u64,
    tile_contents: u64,
    /// Content hash to data offset, when deduplicating.
    seen: Option<HashMap<[u8; 32], u64>>,
}

/// Directory entries store lengths as `u32`.
fn entry_length(tile_id: u64, size: usize) -> Result<u32> {
    u32::try_from(size).map_err(|_| TerrainError::TileTooLarge { tile_id, size })
}

impl ArchiveWriter {
    /// Create a writer backed by an anonymous temporary file.
    ///
    /// With `deduplicate`, identical payloads are stored once and
    /// consecutive identical tiles collapse into a single run-length entry.
    pub fn new(deduplicate: bool) -> Result<Self> {
        Ok(Self {
            tile_data: BufWriter::new(tempfile::tempfile()?),
            offset: 0,
            entries: Vec::new(),
            addressed_tiles: 0,
            tile_contents: 0,
            seen: deduplicate.then(HashMap::new),
        })
    }

    /// Append one tile.
    ///
    /// # Errors
    ///
    /// - [`TerrainError::UnorderedTile`] if `tile_id` is not greater than
    ///   every id written so far
    /// - [`TerrainError::TileTooLarge`] if `data` is 4 GiB or longer
    pub fn write_tile(&mut self, tile_id: u64, data: &[u8]) -> Result<()> {
        if let Some(last) = self.entries.last() {
            let previous = last.tile_id + u64::from(last.run_length) - 1;
            if tile_id <= previous {
                return Err(TerrainError::UnorderedTile { tile_id, previous });
            }
        }
        let length = entry_length(tile_id, data.len())?;

        self.addressed_tiles += 1;

        let digest = self
            .seen
            .as_ref()
            .map(|_| <[u8; 32]>::from(Sha256::digest(data)));
        let known = match (&self.seen, &digest) {
            (Some(seen), Some(digest)) => seen.get(digest).copied(),
            _ => None,
        };

        if let Some(found) = known {
            if let Some(last) = self.entries.last_mut() {
                if last.offset == found && tile_id == last.tile_id + u64::from(last.run_length) {
                    last.run_length += 1;
                    return Ok(());
                }
            }
            self.entries.push(Entry {
                tile_id,
                offset: found,
                length,
                run_length: 1,
            });
            return Ok(());
        }

        self.tile_data.write_all(data)?;
        self.entries.push(Entry {
            tile_id,
            offset: self.offset,
            length,
            run_length: 1,
        });
        if let (Some(seen), Some(digest)) = (self.seen.as_mut(), digest) {
            seen.insert(digest, self.offset);
        }
        self.offset += data.len() as u64;
        self.tile_contents += 1;
        Ok(())
    }

    /// Number of tiles written so far.
    pub fn tile_count(&self) -> u64 {
        self.addressed_tiles
    }

    /// Directory entries recorded so far.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Write the complete archive to `out` and return its header.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::EmptyArchive`] if no tile was written, or any
    /// I/O error from the scratch file or `out`.
    pub fn finalize<W: Write, M: Serialize>(
        self,
        out: &mut W,
        info: &TilesetInfo,
        metadata: &M,
    ) -> Result<Header> {
        if self.entries.is_empty() {
            return Err(TerrainError::EmptyArchive);
        }

        let directories = build_directories(&self.entries)?;
        let metadata = gzip(&serde_json::to_vec(metadata)?)?;

        let root_dir_offset = HEADER_SIZE as u64;
        let root_dir_length = directories.root.len() as u64;
        let leaf_dirs_offset = root_dir_offset + root_dir_length;
        let leaf_dirs_length = directories.leaves.len() as u64;
        let tile_data_offset = leaf_dirs_offset + leaf_dirs_length;
        let tile_data_length = self.offset;
        let metadata_offset = tile_data_offset + tile_data_length;

        let (min_lon_e7, min_lat_e7, max_lon_e7, max_lat_e7) = info.bounds.to_e7();
        let header = Header {
            root_dir_offset,
            root_dir_length,
            metadata_offset,
            metadata_length: metadata.len() as u64,
            leaf_dirs_offset,
            leaf_dirs_length,
            tile_data_offset,
            tile_data_length,
            addressed_tiles_count: self.addressed_tiles,
            tile_entries_count: self.entries.len() as u64,
            tile_contents_count: self.tile_contents,
            clustered: true,
            internal_compression: Compression::Gzip,
            tile_compression: info.tile_compression,
            tile_type: info.tile_type,
            min_zoom: info.min_zoom,
            max_zoom: info.max_zoom,
            min_lon_e7,
            min_lat_e7,
            max_lon_e7,
            max_lat_e7,
            center_zoom: ((u16::from(info.min_zoom) + u16::from(info.max_zoom)) / 2) as u8,
            center_lon_e7: midpoint(min_lon_e7, max_lon_e7),
            center_lat_e7: midpoint(min_lat_e7, max_lat_e7),
        };

        out.write_all(&header.to_bytes())?;
        out.write_all(&directories.root)?;
        out.write_all(&directories.leaves)?;

        let mut tile_data = self.tile_data.into_inner().map_err(|e| e.into_error())?;
        tile_data.seek(SeekFrom::Start(0))?;
        let copied = io::copy(&mut tile_data, out)?;
        debug_assert_eq!(copied, tile_data_length);

        out.write_all(&metadata)?;
        out.flush()?;

        Ok(header)
    }
}

/// Midpoint of two e7 coordinates, truncated toward zero.
fn midpoint(a: i32, b: i32) -> i32 {
    ((i64::from(a) + i64::from(b)) / 2) as i32
}

//! PMTiles v3 header.
//!
//! The header is a fixed 127-byte little-endian record at the start of the
//! archive. It locates every other section and carries the tileset summary
//! (zoom range, bounds, center) so readers can render without the metadata.

/// Size of the serialized header in bytes.
pub const HEADER_SIZE: usize = 127;

/// Leading bytes of every archive.
pub const MAGIC: &[u8; 7] = b"PMTiles";

/// Archive format version written by this crate.
pub const VERSION: u8 = 3;

/// Compression applied to directories, metadata, or tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compression {
    Unknown = 0,
    None = 1,
    Gzip = 2,
    Brotli = 3,
    Zstd = 4,
}

/// Image or vector format of the tile payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TileType {
    Unknown = 0,
    Mvt = 1,
    Png = 2,
    Jpeg = 3,
    Webp = 4,
    Avif = 5,
}

/// All header fields, in on-disk order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub root_dir_offset: u64,
    pub root_dir_length: u64,
    pub metadata_offset: u64,
    pub metadata_length: u64,
    pub leaf_dirs_offset: u64,
    pub leaf_dirs_length: u64,
    pub tile_data_offset: u64,
    pub tile_data_length: u64,
    /// Number of tile ids addressed, counting every tile in a run.
    pub addressed_tiles_count: u64,
    /// Number of directory entries pointing at tile data.
    pub tile_entries_count: u64,
    /// Number of distinct byte ranges in the tile data section.
    pub tile_contents_count: u64,
    /// Tile data is laid out in ascending tile id order.
    pub clustered: bool,
    pub internal_compression: Compression,
    pub tile_compression: Compression,
    pub tile_type: TileType,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub min_lon_e7: i32,
    pub min_lat_e7: i32,
    pub max_lon_e7: i32,
    pub max_lat_e7: i32,
    pub center_zoom: u8,
    pub center_lon_e7: i32,
    pub center_lat_e7: i32,
}

impl Header {
    /// Serialize to the 127-byte on-disk form.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(HEADER_SIZE);
        buf.extend_from_slice(MAGIC);
        buf.push(VERSION);
        for value in [
            self.root_dir_offset,
            self.root_dir_length,
            self.metadata_offset,
            self.metadata_length,
            self.leaf_dirs_offset,
            self.leaf_dirs_length,
            self.tile_data_offset,
            self.tile_data_length,
            self.addressed_tiles_count,
            self.tile_entries_count,
            self.tile_contents_count,
        ] {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf.push(u8::from(self.clustered));
        buf.push(self.internal_compression as u8);
        buf.push(self.tile_compression as u8);
        buf.push(self.tile_type as u8);
        buf.push(self.min_zoom);
        buf.push(self.max_zoom);
        for value in [
            self.min_lon_e7,
            self.min_lat_e7,
            self.max_lon_e7,
            self.max_lat_e7,
        ] {
            buf.extend_from_slice(&value.to_le_bytes());
        }
        buf.push(self.center_zoom);
        buf.extend_from_slice(&self.center_lon_e7.to_le_bytes());
        buf.extend_from_slice(&self.center_lat_e7.to_le_bytes());

        debug_assert_eq!(buf.len(), HEADER_SIZE);
        buf
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn u64_at(bytes: &[u8], offset: usize) -> u64 {
        u64::from_le_bytes(bytes[offset..offset + 8].try_into().unwrap())
    }

    fn i32_at(bytes: &[u8], offset: usize) -> i32 {
        i32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn compression(byte: u8) -> Compression {
        match byte {
            1 => Compression::None,
            2 => Compression::Gzip,
            3 => Compression::Brotli,
            4 => Compression::Zstd,
            _ => Compression::Unknown,
        }
    }

    /// Parse a serialized header; used to check archives written in tests.
    pub(crate) fn parse_header(bytes: &[u8]) -> Header {
        assert_eq!(&bytes[0..7], MAGIC);
        assert_eq!(bytes[7], VERSION);
        Header {
            root_dir_offset: u64_at(bytes, 8),
            root_dir_length: u64_at(bytes, 16),
            metadata_offset: u64_at(bytes, 24),
            metadata_length: u64_at(bytes, 32),
            leaf_dirs_offset: u64_at(bytes, 40),
            leaf_dirs_length: u64_at(bytes, 48),
            tile_data_offset: u64_at(bytes, 56),
            tile_data_length: u64_at(bytes, 64),
            addressed_tiles_count: u64_at(bytes, 72),
            tile_entries_count: u64_at(bytes, 80),
            tile_contents_count: u64_at(bytes, 88),
            clustered: bytes[96] == 1,
            internal_compression: compression(bytes[97]),
            tile_compression: compression(bytes[98]),
            tile_type: match bytes[99] {
                4 => TileType::Webp,
                2 => TileType::Png,
                _ => TileType::Unknown,
            },
            min_zoom: bytes[100],
            max_zoom: bytes[101],
            min_lon_e7: i32_at(bytes, 102),
            min_lat_e7: i32_at(bytes, 106),
            max_lon_e7: i32_at(bytes, 110),
            max_lat_e7: i32_at(bytes, 114),
            center_zoom: bytes[118],
            center_lon_e7: i32_at(bytes, 119),
            center_lat_e7: i32_at(bytes, 123),
        }
    }

    pub(crate) fn sample_header() -> Header {
        Header {
            root_dir_offset: 127,
            root_dir_length: 25,
            metadata_offset: 1000,
            metadata_length: 80,
            leaf_dirs_offset: 152,
            leaf_dirs_length: 0,
            tile_data_offset: 152,
            tile_data_length: 848,
            addressed_tiles_count: 3,
            tile_entries_count: 3,
            tile_contents_count: 3,
            clustered: true,
            internal_compression: Compression::Gzip,
            tile_compression: Compression::None,
            tile_type: TileType::Webp,
            min_zoom: 0,
            max_zoom: 1,
            min_lon_e7: -1_800_000_000,
            min_lat_e7: -850_511_287,
            max_lon_e7: 1_800_000_000,
            max_lat_e7: 850_511_287,
            center_zoom: 0,
            center_lon_e7: 0,
            center_lat_e7: 0,
        }
    }

    #[test]
    fn test_header_layout() {
        let header = sample_header();
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..7], b"PMTiles");
        assert_eq!(bytes[7], 3);
        assert_eq!(bytes[96], 1);
        assert_eq!(bytes[97], 2);
        assert_eq!(bytes[98], 1);
        assert_eq!(bytes[99], 4);
        assert_eq!(parse_header(&bytes), header);
    }

    #[test]
    fn test_negative_coordinates_are_little_endian() {
        let header = sample_header();
        let bytes = header.to_bytes();
        assert_eq!(&bytes[102..106], &(-1_800_000_000i32).to_le_bytes());
        assert_eq!(&bytes[114..118], &850_511_287i32.to_le_bytes());
    }
}

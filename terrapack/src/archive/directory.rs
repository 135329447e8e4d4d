//! PMTiles directories.
//!
//! A directory maps tile ids to byte ranges. It is stored column by column
//! (id deltas, run lengths, lengths, offsets) as unsigned LEB128 varints and
//! then compressed with the archive's internal compression (gzip here).
//!
//! An offset that directly follows the previous entry's range is stored as
//! `0`; any other offset is stored as `offset + 1`.

use std::io::Write;

use flate2::write::GzEncoder;

use super::header::HEADER_SIZE;
use crate::error::Result;

/// Readers fetch the first 16 KiB in one request; header plus root must fit.
pub const ROOT_DIRECTORY_BUDGET: usize = 16_384 - HEADER_SIZE;

/// Initial number of entries per leaf directory.
const LEAF_SIZE: usize = 4096;

/// One directory entry.
///
/// `run_length == 0` marks a pointer to a leaf directory, in which case
/// `offset`/`length` address the leaf directory section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub tile_id: u64,
    pub offset: u64,
    pub length: u32,
    pub run_length: u32,
}

/// Serialized, compressed directories ready to be written.
#[derive(Debug, Clone, Default)]
pub struct Directories {
    pub root: Vec<u8>,
    pub leaves: Vec<u8>,
    pub leaf_count: usize,
}

/// Append `value` as an unsigned LEB128 varint.
pub(crate) fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Columnar encoding of `entries`, uncompressed.
pub(crate) fn encode_entries(entries: &[Entry]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(entries.len() * 4 + 8);
    write_varint(&mut buf, entries.len() as u64);

    let mut last_id = 0u64;
    for entry in entries {
        write_varint(&mut buf, entry.tile_id - last_id);
        last_id = entry.tile_id;
    }
    for entry in entries {
        write_varint(&mut buf, u64::from(entry.run_length));
    }
    for entry in entries {
        write_varint(&mut buf, u64::from(entry.length));
    }
    for (i, entry) in entries.iter().enumerate() {
        let follows_previous =
            i > 0 && entry.offset == entries[i - 1].offset + u64::from(entries[i - 1].length);
        if follows_previous {
            write_varint(&mut buf, 0);
        } else {
            write_varint(&mut buf, entry.offset + 1);
        }
    }
    buf
}

/// Gzip `bytes`.
pub(crate) fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(bytes)?;
    Ok(encoder.finish()?)
}

/// Encode and compress one directory.
pub fn serialize_directory(entries: &[Entry]) -> Result<Vec<u8>> {
    gzip(&encode_entries(entries))
}

/// Split `entries` into leaves of `leaf_size` and a root pointing at them.
fn build_root_and_leaves(entries: &[Entry], leaf_size: usize) -> Result<Directories> {
    let mut root_entries = Vec::with_capacity(entries.len() / leaf_size + 1);
    let mut leaves = Vec::new();

    for chunk in entries.chunks(leaf_size) {
        let leaf = serialize_directory(chunk)?;
        root_entries.push(Entry {
            tile_id: chunk[0].tile_id,
            offset: leaves.len() as u64,
            length: leaf.len() as u32,
            run_length: 0,
        });
        leaves.extend_from_slice(&leaf);
    }

    Ok(Directories {
        root: serialize_directory(&root_entries)?,
        leaves,
        leaf_count: root_entries.len(),
    })
}

/// Whether a serialized root directory of `len` bytes fits after the header
/// in the first 16 KiB of the archive.
fn fits_in_root(len: usize) -> bool {
    len <= ROOT_DIRECTORY_BUDGET
}

/// Lay out `entries` as a root directory, spilling into leaf directories
/// when the root would not fit in [`ROOT_DIRECTORY_BUDGET`].
///
/// Leaf size starts at 4096 entries and doubles until the root fits.
pub fn build_directories(entries: &[Entry]) -> Result<Directories> {
    let root = serialize_directory(entries)?;
    if fits_in_root(root.len()) {
        return Ok(Directories {
            root,
            leaves: Vec::new(),
            leaf_count: 0,
        });
    }

    let mut leaf_size = LEAF_SIZE;
    loop {
        let dirs = build_root_and_leaves(entries, leaf_size)?;
        if fits_in_root(dirs.root.len()) {
            return Ok(dirs);
        }
        leaf_size *= 2;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    fn read_varint(bytes: &[u8], pos: &mut usize) -> u64 {
        let mut value = 0u64;
        let mut shift = 0;
        loop {
            let byte = bytes[*pos];
            *pos += 1;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return value;
            }
            shift += 7;
        }
    }

    /// Decompress and decode a directory; used to check archives written in tests.
    pub(crate) fn parse_directory(compressed: &[u8]) -> Vec<Entry> {
        let mut bytes = Vec::new();
        GzDecoder::new(compressed).read_to_end(&mut bytes).unwrap();

        let mut pos = 0;
        let count = read_varint(&bytes, &mut pos) as usize;
        let mut entries = vec![
            Entry {
                tile_id: 0,
                offset: 0,
                length: 0,
                run_length: 0,
            };
            count
        ];
        let mut last_id = 0;
        for entry in entries.iter_mut() {
            last_id += read_varint(&bytes, &mut pos);
            entry.tile_id = last_id;
        }
        for entry in entries.iter_mut() {
            entry.run_length = read_varint(&bytes, &mut pos) as u32;
        }
        for entry in entries.iter_mut() {
            entry.length = read_varint(&bytes, &mut pos) as u32;
        }
        for i in 0..count {
            let raw = read_varint(&bytes, &mut pos);
            entries[i].offset = if raw == 0 && i > 0 {
                entries[i - 1].offset + u64::from(entries[i - 1].length)
            } else {
                raw - 1
            };
        }
        assert_eq!(pos, bytes.len());
        entries
    }

    fn contiguous(count: u64) -> Vec<Entry> {
        (0..count)
            .map(|i| Entry {
                tile_id: i * 3,
                offset: i * 100,
                length: 100,
                run_length: 1,
            })
            .collect()
    }

    #[test]
    fn test_varint() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 0);
        write_varint(&mut buf, 127);
        write_varint(&mut buf, 128);
        write_varint(&mut buf, 300);
        assert_eq!(buf, vec![0x00, 0x7f, 0x80, 0x01, 0xac, 0x02]);

        let mut buf = Vec::new();
        write_varint(&mut buf, u64::MAX);
        assert_eq!(buf.len(), 10);
        assert_eq!(read_varint(&buf, &mut 0), u64::MAX);
    }

    #[test]
    fn test_contiguous_offsets_are_elided() {
        let bytes = encode_entries(&contiguous(3));
        // count, 3 id deltas, 3 run lengths, 3 lengths, offsets 1, 0, 0
        assert_eq!(
            bytes,
            vec![3, 0, 3, 3, 1, 1, 1, 100, 100, 100, 1, 0, 0]
        );
    }

    #[test]
    fn test_gap_offsets_are_explicit() {
        let entries = vec![
            Entry {
                tile_id: 1,
                offset: 0,
                length: 10,
                run_length: 1,
            },
            Entry {
                tile_id: 2,
                offset: 0,
                length: 10,
                run_length: 2,
            },
        ];
        let bytes = encode_entries(&entries);
        assert_eq!(bytes, vec![2, 1, 1, 1, 2, 10, 10, 1, 1]);
        assert_eq!(parse_directory(&serialize_directory(&entries).unwrap()), entries);
    }

    #[test]
    fn test_small_directory_has_no_leaves() {
        let entries = contiguous(100);
        let dirs = build_directories(&entries).unwrap();
        assert_eq!(dirs.leaf_count, 0);
        assert!(dirs.leaves.is_empty());
        assert_eq!(parse_directory(&dirs.root), entries);
    }

    #[test]
    fn test_large_directory_spills_into_leaves() {
        // Pseudo-random lengths and sparse ids defeat gzip enough to overflow the root
        let mut offset = 0u64;
        let entries: Vec<Entry> = (0..60_000u64)
            .map(|i| {
                let length = (i.wrapping_mul(2_654_435_761) % 50_000) as u32 + 1;
                let entry = Entry {
                    tile_id: i * 7 + (i * i) % 5,
                    offset,
                    length,
                    run_length: 1,
                };
                offset += u64::from(length);
                entry
            })
            .collect();

        let dirs = build_directories(&entries).unwrap();
        assert!(dirs.leaf_count > 0);
        assert!(fits_in_root(dirs.root.len()));

        let root = parse_directory(&dirs.root);
        assert_eq!(root.len(), dirs.leaf_count);
        let mut recovered = Vec::new();
        for pointer in &root {
            assert_eq!(pointer.run_length, 0);
            let start = pointer.offset as usize;
            let leaf = &dirs.leaves[start..start + pointer.length as usize];
            let leaf_entries = parse_directory(leaf);
            assert_eq!(leaf_entries[0].tile_id, pointer.tile_id);
            recovered.extend(leaf_entries);
        }
        assert_eq!(recovered, entries);
    }

    #[test]
    fn test_root_budget_boundary() {
        assert_eq!(ROOT_DIRECTORY_BUDGET, 16_257);
        assert!(fits_in_root(16_257));
        assert!(!fits_in_root(16_258));
        assert_eq!(HEADER_SIZE + ROOT_DIRECTORY_BUDGET, 16_384);
    }
}

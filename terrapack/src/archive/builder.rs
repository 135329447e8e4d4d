//! One-shot archive assembly from a set of encoded tiles.

use std::borrow::Cow;
use std::fs;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::header::{Compression, Header, TileType};
use super::writer::{ArchiveWriter, TilesetInfo};
use crate::error::{Result, TerrainError};
use crate::filename::parse_tile_name;
use crate::mercator::GeoBounds;
use crate::tile::TileCoord;

/// Attribution written into archive metadata unless overridden.
pub const DEFAULT_ATTRIBUTION: &str =
    r#"<a href="https://github.com/optgeo/shin-freetown">© shin-freetown</a>"#;

/// Value of the `format` metadata key for Terrarium tiles.
pub const TERRARIUM_FORMAT: &str = "terrarium";

/// Encoded bytes of one tile, held in memory or in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TilePayload {
    Memory(Vec<u8>),
    File(PathBuf),
}

impl TilePayload {
    /// Load the payload bytes.
    pub fn read(&self) -> io::Result<Cow<'_, [u8]>> {
        match self {
            TilePayload::Memory(bytes) => Ok(Cow::Borrowed(bytes)),
            TilePayload::File(path) => Ok(Cow::Owned(fs::read(path)?)),
        }
    }
}

/// JSON metadata block of the archive.
#[derive(Debug, Clone, Serialize)]
struct ArchiveMetadata<'a> {
    attribution: &'a str,
    format: &'a str,
}

/// Outcome of a successful build.
#[derive(Debug, Clone)]
pub struct ArchiveSummary {
    /// Final archive path.
    pub path: PathBuf,
    /// Number of input tiles.
    pub tile_count: u64,
    /// Union of every tile's extent.
    pub bounds: GeoBounds,
    /// Header as written.
    pub header: Header,
    /// Archive size in bytes.
    pub file_size: u64,
    /// Total elapsed time in milliseconds.
    pub elapsed_ms: u64,
}

/// Builds a PMTiles archive from encoded tiles.
///
/// The archive is written to a temporary file next to `output` and renamed
/// into place only after every tile has been written, so a failed build
/// never leaves a partial archive behind.
///
/// # Example
///
/// ```ignore
/// use terrapack::{ArchiveBuilder, TileCoord, TilePayload};
///
/// let summary = ArchiveBuilder::new("terrain.pmtiles")
///     .attribution("© my terrain")
///     .build(vec![(TileCoord::new(0, 0, 0)?, TilePayload::File("0-0-0.webp".into()))])?;
/// println!("{} tiles, z{}-{}", summary.tile_count, summary.header.min_zoom, summary.header.max_zoom);
/// ```
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    output: PathBuf,
    tile_type: TileType,
    attribution: String,
    format: String,
    deduplicate: bool,
}

impl ArchiveBuilder {
    /// Create a builder writing to `output`.
    pub fn new<P: AsRef<Path>>(output: P) -> Self {
        Self {
            output: output.as_ref().to_path_buf(),
            tile_type: TileType::Webp,
            attribution: DEFAULT_ATTRIBUTION.to_string(),
            format: TERRARIUM_FORMAT.to_string(),
            deduplicate: false,
        }
    }

    /// Set the tile type recorded in the header. Default is WebP.
    pub fn tile_type(mut self, tile_type: TileType) -> Self {
        self.tile_type = tile_type;
        self
    }

    /// Set the `attribution` metadata value.
    pub fn attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = attribution.into();
        self
    }

    /// Set the `format` metadata value. Default is `terrarium`.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Store identical tiles once. Default is off.
    pub fn deduplicate(mut self, deduplicate: bool) -> Self {
        self.deduplicate = deduplicate;
        self
    }

    /// Build the archive.
    ///
    /// # Errors
    ///
    /// Any error aborts the build and removes the temporary file:
    /// - [`TerrainError::EmptyArchive`] if `tiles` is empty
    /// - [`TerrainError::DuplicateTileCoordinate`] if a coordinate repeats
    /// - [`TerrainError::TileRead`] if a payload file cannot be read
    /// - [`TerrainError::Io`] if the archive cannot be written
    pub fn build<I>(&self, tiles: I) -> Result<ArchiveSummary>
    where
        I: IntoIterator<Item = (TileCoord, TilePayload)>,
    {
        let start = Instant::now();

        let mut tiles: Vec<(u64, TileCoord, TilePayload)> = tiles
            .into_iter()
            .map(|(coord, payload)| (coord.id(), coord, payload))
            .collect();
        if tiles.is_empty() {
            return Err(TerrainError::EmptyArchive);
        }

        tiles.sort_by_key(|(id, _, _)| *id);
        if let Some(pair) = tiles.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(TerrainError::DuplicateTileCoordinate { coord: pair[1].1 });
        }

        info!(
            tiles = tiles.len(),
            output = %self.output.display(),
            "Building archive"
        );

        let mut writer = ArchiveWriter::new(self.deduplicate)?;
        let mut min_zoom = u8::MAX;
        let mut max_zoom = 0u8;
        let mut bounds: Option<GeoBounds> = None;

        for (id, coord, payload) in &tiles {
            let data = match payload {
                TilePayload::Memory(bytes) => Cow::Borrowed(bytes.as_slice()),
                TilePayload::File(path) => {
                    Cow::Owned(fs::read(path).map_err(|source| TerrainError::TileRead {
                        coord: *coord,
                        path: path.clone(),
                        source,
                    })?)
                }
            };
            writer.write_tile(*id, &data)?;
            debug!(tile = %coord, tile_id = id, bytes = data.len(), "Wrote tile");

            min_zoom = min_zoom.min(coord.z());
            max_zoom = max_zoom.max(coord.z());
            let extent = coord.bounds();
            bounds = Some(match bounds {
                Some(b) => b.union(&extent),
                None => extent,
            });
        }

        // non-empty input guarantees at least one extent
        let bounds = bounds.ok_or(TerrainError::EmptyArchive)?;
        let info = TilesetInfo {
            tile_type: self.tile_type,
            tile_compression: Compression::None,
            min_zoom,
            max_zoom,
            bounds,
        };
        let metadata = ArchiveMetadata {
            attribution: &self.attribution,
            format: &self.format,
        };

        let dir = match self.output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut temp = NamedTempFile::new_in(dir)?;
        let header = {
            let mut out = BufWriter::new(temp.as_file_mut());
            writer.finalize(&mut out, &info, &metadata)?
        };
        temp.as_file().sync_all()?;
        let file = temp.persist(&self.output).map_err(|e| e.error)?;
        let file_size = file.metadata()?.len();

        let summary = ArchiveSummary {
            path: self.output.clone(),
            tile_count: tiles.len() as u64,
            bounds,
            header,
            file_size,
            elapsed_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            tiles = summary.tile_count,
            min_zoom,
            max_zoom,
            bytes = file_size,
            elapsed_ms = summary.elapsed_ms,
            "Archive complete"
        );

        Ok(summary)
    }
}

/// Collect `{z}-{x}-{y}.{extension}` files from `dir` as build inputs.
///
/// Files with other extensions are ignored. Results are sorted by filename.
///
/// # Errors
///
/// Returns [`TerrainError::MalformedTileName`] for a file with the tile
/// extension whose name is not a tile coordinate.
pub fn scan_tile_dir<P: AsRef<Path>>(
    dir: P,
    extension: &str,
) -> Result<Vec<(TileCoord, TilePayload)>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|e| e == extension)
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let name = path.to_string_lossy();
            let coord = parse_tile_name(&name)?;
            Ok((coord, TilePayload::File(path)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::directory::tests::parse_directory;
    use super::super::header::tests::parse_header;
    use super::*;
    use tempfile::TempDir;

    fn coord(z: u8, x: u32, y: u32) -> TileCoord {
        TileCoord::new(z, x, y).unwrap()
    }

    fn memory(bytes: &[u8]) -> TilePayload {
        TilePayload::Memory(bytes.to_vec())
    }

    #[test]
    fn test_entries_sorted_by_tile_id() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.pmtiles");

        // input deliberately out of order
        let tiles = vec![
            (coord(1, 1, 1), memory(b"three")),
            (coord(0, 0, 0), memory(b"one")),
            (coord(1, 0, 0), memory(b"two")),
        ];
        let summary = ArchiveBuilder::new(&output).build(tiles).unwrap();
        assert_eq!(summary.tile_count, 3);

        let bytes = fs::read(&output).unwrap();
        assert_eq!(bytes.len() as u64, summary.file_size);
        let header = parse_header(&bytes);
        assert_eq!(header, summary.header);
        assert_eq!(header.min_zoom, 0);
        assert_eq!(header.max_zoom, 1);

        let root = &bytes[127..127 + header.root_dir_length as usize];
        let entries = parse_directory(root);
        let ids: Vec<u64> = entries.iter().map(|e| e.tile_id).collect();
        assert_eq!(ids, vec![0, 1, 3]);

        let data = header.tile_data_offset as usize;
        assert_eq!(&bytes[data..data + 11], b"onetwothree");
    }

    #[test]
    fn test_bounds_are_union_of_tiles() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.pmtiles");

        // north-west and south-east quadrants at z2
        let a = coord(2, 0, 0);
        let b = coord(2, 3, 3);
        let summary = ArchiveBuilder::new(&output)
            .build(vec![(a, memory(b"a")), (b, memory(b"b"))])
            .unwrap();

        let expected = a.bounds().union(&b.bounds());
        assert_eq!(summary.bounds, expected);
        assert!((summary.bounds.west + 180.0).abs() < 1e-9);
        assert!((summary.bounds.east - 180.0).abs() < 1e-9);

        let (w, s, e, n) = expected.to_e7();
        let header = &summary.header;
        assert_eq!(
            (header.min_lon_e7, header.min_lat_e7, header.max_lon_e7, header.max_lat_e7),
            (w, s, e, n)
        );
        assert_eq!(header.center_lon_e7, ((i64::from(w) + i64::from(e)) / 2) as i32);
        assert_eq!(header.center_zoom, 2);
    }

    #[test]
    fn test_single_tile_bounds() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("one.pmtiles");
        let tile = coord(10, 904, 403);
        let summary = ArchiveBuilder::new(&output)
            .build(vec![(tile, memory(b"x"))])
            .unwrap();
        assert_eq!(summary.bounds, tile.bounds());
    }

    #[test]
    fn test_duplicate_coordinate_aborts() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("dup.pmtiles");
        let result = ArchiveBuilder::new(&output).build(vec![
            (coord(3, 2, 1), memory(b"a")),
            (coord(0, 0, 0), memory(b"b")),
            (coord(3, 2, 1), memory(b"c")),
        ]);
        match result {
            Err(TerrainError::DuplicateTileCoordinate { coord: c }) => {
                assert_eq!(c, coord(3, 2, 1))
            }
            other => panic!("Expected DuplicateTileCoordinate, got {:?}", other),
        }
        assert!(!output.exists());
    }

    #[test]
    fn test_missing_payload_leaves_no_archive() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("broken.pmtiles");
        let result = ArchiveBuilder::new(&output).build(vec![
            (coord(0, 0, 0), memory(b"ok")),
            (coord(1, 0, 0), TilePayload::File(dir.path().join("missing.webp"))),
        ]);
        assert!(matches!(result, Err(TerrainError::TileRead { .. })));
        assert!(!output.exists());
        // temp file is cleaned up as well
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unreadable_payload_names_the_tile() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("broken.pmtiles");
        let missing = dir.path().join("3-2-1.webp");
        let err = ArchiveBuilder::new(&output)
            .build(vec![
                (coord(0, 0, 0), memory(b"ok")),
                (coord(3, 2, 1), TilePayload::File(missing.clone())),
            ])
            .unwrap_err();

        match &err {
            TerrainError::TileRead { coord: c, path, .. } => {
                assert_eq!(*c, coord(3, 2, 1));
                assert_eq!(path, &missing);
            }
            other => panic!("Expected TileRead, got {:?}", other),
        }
        let message = err.to_string();
        assert!(message.contains("3/2/1"));
        assert!(message.contains("3-2-1.webp"));
    }

    #[test]
    fn test_empty_input() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("empty.pmtiles");
        let result = ArchiveBuilder::new(&output).build(Vec::new());
        assert!(matches!(result, Err(TerrainError::EmptyArchive)));
        assert!(!output.exists());
    }

    #[test]
    fn test_existing_archive_is_replaced_atomically() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("out.pmtiles");
        fs::write(&output, b"old archive").unwrap();

        // failed build keeps the old file untouched
        let result = ArchiveBuilder::new(&output).build(vec![(
            coord(0, 0, 0),
            TilePayload::File(dir.path().join("missing.webp")),
        )]);
        assert!(result.is_err());
        assert_eq!(fs::read(&output).unwrap(), b"old archive");

        ArchiveBuilder::new(&output)
            .build(vec![(coord(0, 0, 0), memory(b"new"))])
            .unwrap();
        assert_eq!(&fs::read(&output).unwrap()[0..7], b"PMTiles");
    }

    #[test]
    fn test_metadata_contents() {
        use flate2::read::GzDecoder;
        use std::io::Read;

        let dir = TempDir::new().unwrap();
        let output = dir.path().join("meta.pmtiles");
        let summary = ArchiveBuilder::new(&output)
            .attribution("© test")
            .build(vec![(coord(0, 0, 0), memory(b"t"))])
            .unwrap();

        let bytes = fs::read(&output).unwrap();
        let start = summary.header.metadata_offset as usize;
        let end = start + summary.header.metadata_length as usize;
        let mut json = String::new();
        GzDecoder::new(&bytes[start..end])
            .read_to_string(&mut json)
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["attribution"], "© test");
        assert_eq!(value["format"], "terrarium");
        assert_eq!(summary.header.tile_type, TileType::Webp);
        assert_eq!(summary.header.tile_compression, Compression::None);
    }

    #[test]
    fn test_scan_tile_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("1-0-1.webp"), b"a").unwrap();
        fs::write(dir.path().join("0-0-0.webp"), b"b").unwrap();
        fs::write(dir.path().join("bounds.csv"), b"ignored").unwrap();

        let tiles = scan_tile_dir(dir.path(), "webp").unwrap();
        let coords: Vec<TileCoord> = tiles.iter().map(|(c, _)| *c).collect();
        assert_eq!(coords, vec![coord(0, 0, 0), coord(1, 0, 1)]);
        assert_eq!(tiles[1].1.read().unwrap().as_ref(), b"a");
    }

    #[test]
    fn test_scan_tile_dir_malformed_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("0-0-0.webp"), b"b").unwrap();
        fs::write(dir.path().join("preview.webp"), b"x").unwrap();

        let result = scan_tile_dir(dir.path(), "webp");
        assert!(matches!(
            result,
            Err(TerrainError::MalformedTileName { .. })
        ));
    }
}

//! Parallel bulk encoding.
//!
//! Tiles are independent, so encoding fans out over rayon's thread pool.
//! Bulk operations never stop at the first bad tile: every item gets its own
//! outcome in a [`BatchReport`], and failures are logged and counted. A tile
//! that fails (e.g. one containing NaN) is simply absent from the archive
//! built afterwards.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, warn};

use crate::archive::TilePayload;
use crate::encoder::TileEncoder;
use crate::error::{Result, TerrainError};
use crate::filename::{parse_tile_name, tile_filename};
use crate::terrarium::{ElevationGrid, TerrariumConfig};
use crate::tile::TileCoord;

/// Extension of raw little-endian `f32` grid files.
pub const GRID_EXTENSION: &str = "f32";

/// One tile to encode.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub coord: TileCoord,
    pub grid: ElevationGrid,
}

impl EncodeJob {
    pub fn new(coord: TileCoord, grid: ElevationGrid) -> Self {
        Self { coord, grid }
    }
}

/// Per-item outcomes of a bulk operation, in input order.
#[derive(Debug)]
pub struct BatchReport<T> {
    /// Items that were encoded.
    pub succeeded: Vec<(TileCoord, T)>,
    /// Items that failed, labelled by tile or file name.
    pub failed: Vec<(String, TerrainError)>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failed.len()
    }

    /// Successful items as archive inputs.
    pub fn into_payloads(self) -> Vec<(TileCoord, TilePayload)>
    where
        T: Into<TilePayload>,
    {
        self.succeeded
            .into_iter()
            .map(|(coord, item)| (coord, item.into()))
            .collect()
    }
}

impl From<Vec<u8>> for TilePayload {
    fn from(bytes: Vec<u8>) -> Self {
        TilePayload::Memory(bytes)
    }
}

impl From<PathBuf> for TilePayload {
    fn from(path: PathBuf) -> Self {
        TilePayload::File(path)
    }
}

/// Run `work` over `items` in parallel and sort outcomes into a report.
fn run_batch<I, T, L, F, P>(items: &[I], label: L, work: F, on_item: P) -> BatchReport<T>
where
    I: Sync,
    T: Send,
    L: Fn(&I) -> String + Sync,
    F: Fn(&I) -> Result<(TileCoord, T)> + Sync,
    P: Fn() + Sync,
{
    let outcomes: Vec<_> = items
        .par_iter()
        .map(|item| {
            let outcome = work(item).map_err(|e| (label(item), e));
            on_item();
            outcome
        })
        .collect();

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(done) => report.succeeded.push(done),
            Err((name, e)) => {
                warn!(tile = %name, error = %e, "Skipping tile");
                report.failed.push((name, e));
            }
        }
    }
    report
}

fn encode_job<E: TileEncoder + ?Sized>(
    job: &EncodeJob,
    config: &TerrariumConfig,
    encoder: &E,
) -> Result<Vec<u8>> {
    let tile = config.encode(&job.grid, job.coord.z())?;
    let bytes = encoder.encode(&tile)?;
    debug!(tile = %job.coord, bytes = bytes.len(), "Encoded tile");
    Ok(bytes)
}

/// Encode every job to image bytes in memory.
pub fn encode_tiles<E: TileEncoder + ?Sized>(
    jobs: &[EncodeJob],
    config: &TerrariumConfig,
    encoder: &E,
) -> BatchReport<Vec<u8>> {
    run_batch(
        jobs,
        |job| job.coord.to_string(),
        |job| Ok((job.coord, encode_job(job, config, encoder)?)),
        || {},
    )
}

/// Encode every job and write `{z}-{x}-{y}.{ext}` files into `out_dir`.
pub fn encode_to_dir<E: TileEncoder + ?Sized>(
    jobs: &[EncodeJob],
    config: &TerrariumConfig,
    encoder: &E,
    out_dir: &Path,
) -> Result<BatchReport<PathBuf>> {
    fs::create_dir_all(out_dir)?;
    Ok(run_batch(
        jobs,
        |job| job.coord.to_string(),
        |job| {
            let bytes = encode_job(job, config, encoder)?;
            let path = out_dir.join(tile_filename(&job.coord, encoder.extension()));
            fs::write(&path, bytes)?;
            Ok((job.coord, path))
        },
        || {},
    ))
}

/// Encode raw `{z}-{x}-{y}.f32` grid files from `grid_dir` into image files
/// in `out_dir`.
///
/// Grids must hold `config.tile_size` squared samples. The zoom used for
/// quantization is the `z` of each file name. `on_item` is called once per
/// grid file, whether it succeeded or not.
///
/// # Errors
///
/// Only directory-level I/O fails the call; per-file errors, including
/// malformed names, land in the report.
pub fn encode_grid_dir<E, P>(
    grid_dir: &Path,
    out_dir: &Path,
    config: &TerrariumConfig,
    encoder: &E,
    on_item: P,
) -> Result<BatchReport<PathBuf>>
where
    E: TileEncoder + ?Sized,
    P: Fn() + Sync,
{
    let grids = grid_files(grid_dir)?;
    fs::create_dir_all(out_dir)?;

    Ok(run_batch(
        &grids,
        |path| path.display().to_string(),
        |path| {
            let coord = parse_tile_name(&path.to_string_lossy())?;
            let grid = ElevationGrid::read(path, config.tile_size)?;
            let job = EncodeJob::new(coord, grid);
            let bytes = encode_job(&job, config, encoder)?;
            let out = out_dir.join(tile_filename(&coord, encoder.extension()));
            fs::write(&out, bytes)?;
            Ok((coord, out))
        },
        on_item,
    ))
}

/// `*.f32` files in `dir`, sorted by name.
pub fn grid_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|e| e == GRID_EXTENSION)
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

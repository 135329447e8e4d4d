//! Source raster bounds report.
//!
//! Before tiling, every source raster is summarized by its footprint in Web
//! Mercator (EPSG:3857) and its pixel dimensions. The result is written as
//! `bounds.csv`:
//!
//! ```text
//! filename,left,bottom,right,top,width,height
//! N35E138.hgt,15249561.44...,4163881.14...,15360946.71...,4300125.43...,3601,3601
//! ```
//!
//! Reading the rasters is delegated to a [`BoundsProvider`]. The built-in
//! [`HgtBoundsProvider`] handles SRTM `.hgt` files, whose georeference is
//! encoded in the filename and whose size is implied by the file length.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, TerrainError};
use crate::filename::filename_to_lat_lon;
use crate::mercator::lon_lat_to_mercator;

/// Column names of the bounds CSV, in order.
pub const BOUNDS_CSV_HEADER: [&str; 7] =
    ["filename", "left", "bottom", "right", "top", "width", "height"];

/// Files between progress log lines.
const PROGRESS_INTERVAL: usize = 100;

/// SRTM1: 3601×3601 samples, 1 arc-second.
const SRTM1_SAMPLES: u32 = 3601;

/// SRTM3: 1201×1201 samples, 3 arc-second.
const SRTM3_SAMPLES: u32 = 1201;

/// One CSV row: a raster's footprint in EPSG:3857 meters and its size.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RasterBounds {
    pub filename: String,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
    pub width: u32,
    pub height: u32,
}

/// Source of raster footprints.
pub trait BoundsProvider: Send + Sync {
    /// Footprint of the raster at `path` in EPSG:3857.
    ///
    /// # Errors
    ///
    /// - [`TerrainError::MissingProjection`] if the raster has no georeference
    /// - [`TerrainError::NonFiniteBound`] if a projected corner is not finite
    fn bounds(&self, path: &Path) -> Result<RasterBounds>;
}

/// Footprints of SRTM `.hgt` rasters.
///
/// `.hgt` samples are points on the integer degree lattice, so the raster
/// covers half a pixel beyond the whole-degree cell on each side.
#[derive(Debug, Clone, Copy, Default)]
pub struct HgtBoundsProvider;

impl HgtBoundsProvider {
    fn samples_for_size(size: u64) -> Result<u32> {
        let srtm1 = u64::from(SRTM1_SAMPLES);
        let srtm3 = u64::from(SRTM3_SAMPLES);
        match size {
            s if s == srtm1 * srtm1 * 2 => Ok(SRTM1_SAMPLES),
            s if s == srtm3 * srtm3 * 2 => Ok(SRTM3_SAMPLES),
            _ => Err(TerrainError::InvalidFileSize { size }),
        }
    }
}

impl BoundsProvider for HgtBoundsProvider {
    fn bounds(&self, path: &Path) -> Result<RasterBounds> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (lat, lon) =
            filename_to_lat_lon(&filename).ok_or_else(|| TerrainError::MissingProjection {
                path: path.to_path_buf(),
            })?;

        let samples = Self::samples_for_size(fs::metadata(path)?.len())?;
        let half_pixel = 0.5 / f64::from(samples - 1);

        let west = f64::from(lon) - half_pixel;
        let south = f64::from(lat) - half_pixel;
        let east = f64::from(lon) + 1.0 + half_pixel;
        let north = f64::from(lat) + 1.0 + half_pixel;

        let (left, bottom) = lon_lat_to_mercator(west, south);
        let (right, top) = lon_lat_to_mercator(east, north);

        if ![left, bottom, right, top].iter().all(|v| v.is_finite()) {
            return Err(TerrainError::NonFiniteBound {
                path: path.to_path_buf(),
                left,
                bottom,
                right,
                top,
            });
        }

        Ok(RasterBounds {
            filename,
            left,
            bottom,
            right,
            top,
            width: samples,
            height: samples,
        })
    }
}

/// Outcome of [`collect_bounds`].
#[derive(Debug, Default)]
pub struct BoundsReport {
    /// Rows for rasters that succeeded, in input order.
    pub rows: Vec<RasterBounds>,
    /// Rasters that were skipped and why.
    pub failures: Vec<(PathBuf, TerrainError)>,
}

/// Compute bounds for every path, skipping rasters that fail.
pub fn collect_bounds<P: BoundsProvider + ?Sized>(provider: &P, paths: &[PathBuf]) -> BoundsReport {
    let mut report = BoundsReport::default();

    for (i, path) in paths.iter().enumerate() {
        match provider.bounds(path) {
            Ok(row) => report.rows.push(row),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping raster");
                report.failures.push((path.clone(), e));
            }
        }
        if i % PROGRESS_INTERVAL == 0 {
            info!("Processed {} / {}", i, paths.len());
        }
    }

    report
}

/// Files in `dir` with the given extension, sorted by name.
pub fn find_rasters<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case(extension))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Write rows as CSV. The header is written even when `rows` is empty.
pub fn write_bounds_csv<W: Write>(writer: W, rows: &[RasterBounds]) -> Result<()> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(BOUNDS_CSV_HEADER)?;
    for row in rows {
        csv.serialize(row)?;
    }
    csv.flush()?;
    Ok(())
}

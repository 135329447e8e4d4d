//! Terrarium elevation encoding.
//!
//! Terrarium packs an elevation in meters into three 8-bit channels:
//!
//! ```text
//! elevation = (R * 256 + G + B / 256) - 32768
//! ```
//!
//! R and G hold the integer part of the shifted value, B holds 1/256 m steps.
//! Before packing, values are rounded to a zoom-dependent lattice: full
//! 1/256 m precision at the full-resolution zoom (19 by default), halving for
//! every zoom level above it (2048 m at zoom 0). Coarse tiles therefore carry
//! fewer significant bits and compress better.

use std::fs;
use std::path::Path;

use crate::error::{Result, TerrainError};

/// Default tile edge in pixels.
pub const DEFAULT_TILE_SIZE: usize = 512;

/// Zoom level at which the full 1/256 m precision is kept.
pub const DEFAULT_FULL_RESOLUTION_ZOOM: u8 = 19;

/// Offset added to elevations to make them non-negative.
const ELEVATION_OFFSET: f64 = 32768.0;

/// Exclusive upper bound of the shifted value.
const SHIFTED_LIMIT: f64 = 65536.0;

/// Codec parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrariumConfig {
    /// Tile edge in pixels; grids must hold `tile_size * tile_size` samples.
    pub tile_size: usize,
    /// Zoom level whose resolution factor is 1/256 m.
    pub full_resolution_zoom: u8,
}

impl Default for TerrariumConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            full_resolution_zoom: DEFAULT_FULL_RESOLUTION_ZOOM,
        }
    }
}

impl TerrariumConfig {
    /// Lattice spacing in meters at `zoom`: `2^(full_resolution_zoom - zoom) / 256`.
    ///
    /// Zooms deeper than `full_resolution_zoom` keep the 1/256 m spacing, the
    /// finest step channel B can hold.
    ///
    /// # Examples
    ///
    /// ```
    /// use terrapack::TerrariumConfig;
    ///
    /// let config = TerrariumConfig::default();
    /// assert_eq!(config.resolution_factor(19), 1.0 / 256.0);
    /// assert_eq!(config.resolution_factor(10), 2.0);
    /// assert_eq!(config.resolution_factor(0), 2048.0);
    /// ```
    pub fn resolution_factor(&self, zoom: u8) -> f64 {
        let steps = (i32::from(self.full_resolution_zoom) - i32::from(zoom)).max(0);
        2f64.powi(steps) / 256.0
    }

    /// Round `value` to the lattice of `zoom`, ties to even.
    pub fn quantize(&self, value: f64, zoom: u8) -> f64 {
        let factor = self.resolution_factor(zoom);
        (value / factor).round_ties_even() * factor
    }

    /// Encode an elevation grid as Terrarium RGB for the given zoom.
    ///
    /// # Errors
    ///
    /// - [`TerrainError::GridSize`] if the grid is not `tile_size` square
    /// - [`TerrainError::NonFiniteElevation`] for NaN or infinite samples
    /// - [`TerrainError::OutOfRangeElevation`] if a quantized sample falls
    ///   outside `[-32768, 32768)`
    pub fn encode(&self, grid: &ElevationGrid, zoom: u8) -> Result<EncodedTile> {
        if grid.size != self.tile_size {
            return Err(TerrainError::GridSize {
                expected: self.tile_size * self.tile_size,
                actual: grid.values.len(),
            });
        }

        let factor = self.resolution_factor(zoom);
        let mut data = Vec::with_capacity(grid.values.len() * 3);
        for (index, &value) in grid.values.iter().enumerate() {
            data.extend_from_slice(&encode_sample(value, factor, index)?);
        }

        Ok(EncodedTile {
            size: grid.size,
            data,
        })
    }
}

/// Quantize, shift and split one sample into `[R, G, B]`.
#[inline]
fn encode_sample(value: f32, factor: f64, index: usize) -> Result<[u8; 3]> {
    if !value.is_finite() {
        return Err(TerrainError::NonFiniteElevation { index, value });
    }

    let quantized = (f64::from(value) / factor).round_ties_even() * factor;
    let shifted = quantized + ELEVATION_OFFSET;
    if !(0.0..SHIFTED_LIMIT).contains(&shifted) {
        return Err(TerrainError::OutOfRangeElevation {
            index,
            value: quantized,
        });
    }

    let whole = shifted.floor();
    let r = (whole / 256.0).floor() as u8;
    let g = (whole % 256.0) as u8;
    let b = ((shifted - whole) * 256.0).floor() as u8;
    Ok([r, g, b])
}

/// A square grid of elevations in meters, row-major, row 0 at the north edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    size: usize,
    values: Vec<f32>,
}

impl ElevationGrid {
    /// Wrap `size * size` samples.
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::GridSize`] if the sample count is wrong.
    pub fn new(size: usize, values: Vec<f32>) -> Result<Self> {
        if values.len() != size * size {
            return Err(TerrainError::GridSize {
                expected: size * size,
                actual: values.len(),
            });
        }
        Ok(Self { size, values })
    }

    /// A grid with every sample set to `value`.
    pub fn constant(size: usize, value: f32) -> Self {
        Self {
            size,
            values: vec![value; size * size],
        }
    }

    /// A grid filled by `f(row, col)`.
    pub fn from_fn(size: usize, f: impl Fn(usize, usize) -> f32) -> Self {
        let values = (0..size)
            .flat_map(|row| (0..size).map(move |col| (row, col)))
            .map(|(row, col)| f(row, col))
            .collect();
        Self { size, values }
    }

    /// Parse a raw grid of little-endian `f32` samples.
    pub fn from_le_bytes(size: usize, bytes: &[u8]) -> Result<Self> {
        if bytes.len() != size * size * 4 {
            return Err(TerrainError::GridSize {
                expected: size * size,
                actual: bytes.len() / 4,
            });
        }
        let values = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self { size, values })
    }

    /// Load a raw little-endian `f32` grid file.
    pub fn read<P: AsRef<Path>>(path: P, size: usize) -> Result<Self> {
        let bytes = fs::read(path)?;
        Self::from_le_bytes(size, &bytes)
    }

    /// Serialize as little-endian `f32` samples.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Grid edge length in samples.
    pub fn size(&self) -> usize {
        self.size
    }

    /// All samples, row-major.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Sample at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.size || col >= self.size {
            return None;
        }
        Some(self.values[row * self.size + col])
    }
}

/// A Terrarium-encoded tile: interleaved RGB bytes, `size * size * 3` long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedTile {
    size: usize,
    data: Vec<u8>,
}

impl EncodedTile {
    /// Wrap interleaved RGB bytes.
    pub fn new(size: usize, data: Vec<u8>) -> Result<Self> {
        if data.len() != size * size * 3 {
            return Err(TerrainError::GridSize {
                expected: size * size,
                actual: data.len() / 3,
            });
        }
        Ok(Self { size, data })
    }

    /// Tile edge length in pixels.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Interleaved RGB bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// `[R, G, B]` at `(row, col)`.
    pub fn pixel(&self, row: usize, col: usize) -> Option<[u8; 3]> {
        if row >= self.size || col >= self.size {
            return None;
        }
        let i = (row * self.size + col) * 3;
        Some([self.data[i], self.data[i + 1], self.data[i + 2]])
    }

    /// Recover the quantized elevations.
    pub fn decode(&self) -> ElevationGrid {
        let values = self
            .data
            .chunks_exact(3)
            .map(|px| decode_pixel([px[0], px[1], px[2]]))
            .collect();
        ElevationGrid {
            size: self.size,
            values,
        }
    }
}

/// `R * 256 + G + B / 256 - 32768`.
#[inline]
pub fn decode_pixel([r, g, b]: [u8; 3]) -> f32 {
    (f64::from(r) * 256.0 + f64::from(g) + f64::from(b) / 256.0 - ELEVATION_OFFSET) as f32
}

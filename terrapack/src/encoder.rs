//! Image encoding of Terrarium tiles.
//!
//! Terrarium values only survive a lossless codec, so the default encoder
//! writes lossless WebP.

use image::codecs::webp::WebPEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};

use crate::archive::TileType;
use crate::error::{Result, TerrainError};
use crate::terrarium::EncodedTile;

/// Turns an RGB tile into image bytes, byte-exact reversible.
pub trait TileEncoder: Send + Sync {
    /// Tile type recorded in the archive header.
    fn tile_type(&self) -> TileType;

    /// File extension for tiles written to disk, without the dot.
    fn extension(&self) -> &'static str;

    /// Encode one tile.
    fn encode(&self, tile: &EncodedTile) -> Result<Vec<u8>>;
}

/// Lossless WebP encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebpEncoder;

impl TileEncoder for WebpEncoder {
    fn tile_type(&self) -> TileType {
        TileType::Webp
    }

    fn extension(&self) -> &'static str {
        "webp"
    }

    fn encode(&self, tile: &EncodedTile) -> Result<Vec<u8>> {
        let size = tile.size() as u32;
        let mut buf = Vec::new();
        WebPEncoder::new_lossless(&mut buf).write_image(
            tile.as_bytes(),
            size,
            size,
            ExtendedColorType::Rgb8,
        )?;
        Ok(buf)
    }
}

/// Decode WebP bytes back into an RGB tile.
///
/// # Errors
///
/// Returns [`TerrainError::Image`] for undecodable input and
/// [`TerrainError::GridSize`] if the image is not square.
pub fn decode_webp(bytes: &[u8]) -> Result<EncodedTile> {
    let rgb = image::load_from_memory_with_format(bytes, ImageFormat::WebP)?.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width != height {
        return Err(TerrainError::GridSize {
            expected: (width as usize) * (width as usize),
            actual: (width as usize) * (height as usize),
        });
    }
    EncodedTile::new(width as usize, rgb.into_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrarium::{ElevationGrid, TerrariumConfig};

    #[test]
    fn test_webp_is_lossless() {
        let config = TerrariumConfig {
            tile_size: 16,
            ..TerrariumConfig::default()
        };
        let grid = ElevationGrid::from_fn(16, |row, col| {
            (row as f32) * 37.25 - (col as f32) * 11.5 + 120.0
        });
        let tile = config.encode(&grid, 19).unwrap();

        let bytes = WebpEncoder.encode(&tile).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WEBP");

        let decoded = decode_webp(&bytes).unwrap();
        assert_eq!(decoded, tile);
        assert_eq!(decoded.decode(), grid);
    }

    #[test]
    fn test_encoder_properties() {
        assert_eq!(WebpEncoder.tile_type(), TileType::Webp);
        assert_eq!(WebpEncoder.extension(), "webp");
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            decode_webp(b"not an image"),
            Err(TerrainError::Image(_))
        ));
    }
}

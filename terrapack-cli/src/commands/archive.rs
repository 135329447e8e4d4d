use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use terrapack::archive::scan_tile_dir;
use terrapack::{ArchiveBuilder, TileEncoder, WebpEncoder};

use super::format_size;

pub fn run(tile_dir: PathBuf, output: PathBuf, attribution: String, deduplicate: bool) -> Result<()> {
    if !tile_dir.is_dir() {
        bail!("Tile directory does not exist: {}", tile_dir.display());
    }

    let encoder = WebpEncoder;
    let tiles = scan_tile_dir(&tile_dir, encoder.extension())
        .with_context(|| format!("Failed to collect tiles from {}", tile_dir.display()))?;

    let summary = ArchiveBuilder::new(&output)
        .tile_type(encoder.tile_type())
        .attribution(attribution)
        .deduplicate(deduplicate)
        .build(tiles)
        .with_context(|| format!("Failed to build archive {}", output.display()))?;

    let header = &summary.header;
    println!("Archive: {}", summary.path.display());
    println!("  Tiles:    {}", summary.tile_count);
    println!(
        "  Entries:  {} ({} distinct)",
        header.tile_entries_count, header.tile_contents_count
    );
    println!("  Zoom:     {}-{}", header.min_zoom, header.max_zoom);
    println!(
        "  Bounds:   {:.6}, {:.6}, {:.6}, {:.6}",
        summary.bounds.west, summary.bounds.south, summary.bounds.east, summary.bounds.north
    );
    println!("  Size:     {}", format_size(summary.file_size));
    println!("  Time:     {} ms", summary.elapsed_ms);
    Ok(())
}

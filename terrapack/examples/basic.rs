//! Basic example demonstrating terrapack library usage.
//!
//! Run with: cargo run --example basic -- /path/to/output.pmtiles

use std::env;
use terrapack::{
    encode_tiles, ArchiveBuilder, ElevationGrid, EncodeJob, TerrainError, TerrariumConfig,
    TileCoord, WebpEncoder,
};

fn main() -> Result<(), TerrainError> {
    let output = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example basic -- /path/to/output.pmtiles");
        std::process::exit(1);
    });

    let config = TerrariumConfig::default();

    // A cone-shaped mountain centred in each tile
    let mountain = |peak: f32| {
        ElevationGrid::from_fn(config.tile_size, move |row, col| {
            let dr = row as f32 - 255.5;
            let dc = col as f32 - 255.5;
            (peak - (dr * dr + dc * dc).sqrt() * 10.0).max(0.0)
        })
    };

    let jobs = vec![
        EncodeJob::new(TileCoord::new(0, 0, 0)?, mountain(3776.0)),
        EncodeJob::new(TileCoord::new(1, 1, 0)?, mountain(8849.0)),
        EncodeJob::new(TileCoord::new(1, 0, 1)?, ElevationGrid::constant(512, f32::NAN)),
    ];

    println!("Encoding {} tiles:", jobs.len());
    let report = encode_tiles(&jobs, &config, &WebpEncoder);
    for (coord, bytes) in &report.succeeded {
        println!("  {}: {} bytes", coord, bytes.len());
    }
    for (name, err) in &report.failed {
        println!("  {}: skipped - {}", name, err);
    }

    let summary = ArchiveBuilder::new(&output).build(report.into_payloads())?;

    println!("\nArchive {}:", summary.path.display());
    println!("  Tiles: {}", summary.tile_count);
    println!(
        "  Zoom: {}-{}",
        summary.header.min_zoom, summary.header.max_zoom
    );
    println!("  Size: {} bytes", summary.file_size);

    Ok(())
}

use anyhow::{bail, Context, Result};
use indicatif::ProgressBar;
use std::path::PathBuf;
use terrapack::batch::grid_files;
use terrapack::{encode_grid_dir, TerrariumConfig, WebpEncoder};

use super::bar_style;

pub fn run(
    grid_dir: PathBuf,
    out_dir: PathBuf,
    tile_size: usize,
    full_resolution_zoom: u8,
) -> Result<()> {
    if !grid_dir.is_dir() {
        bail!("Grid directory does not exist: {}", grid_dir.display());
    }

    let config = TerrariumConfig {
        tile_size,
        full_resolution_zoom,
    };

    let total = grid_files(&grid_dir)
        .with_context(|| format!("Failed to read grid directory {}", grid_dir.display()))?
        .len();
    let pb = ProgressBar::new(total as u64);
    pb.set_style(bar_style()?);

    let report = encode_grid_dir(&grid_dir, &out_dir, &config, &WebpEncoder, || pb.inc(1))
        .with_context(|| format!("Failed to encode grids into {}", out_dir.display()))?;
    pb.finish_with_message("done");

    for (name, err) in &report.failed {
        println!("Skipped {}: {}", name, err);
    }
    println!(
        "Encoded {} tiles into {} ({} skipped)",
        report.success_count(),
        out_dir.display(),
        report.failure_count()
    );
    Ok(())
}

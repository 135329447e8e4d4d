use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use terrapack::bounds::find_rasters;
use terrapack::{collect_bounds, write_bounds_csv, HgtBoundsProvider};

pub fn run(source_dir: PathBuf, output: Option<PathBuf>, extension: &str) -> Result<()> {
    if !source_dir.is_dir() {
        bail!("Source directory does not exist: {}", source_dir.display());
    }

    let paths = find_rasters(&source_dir, extension)
        .with_context(|| format!("Failed to read source directory {}", source_dir.display()))?;
    if paths.is_empty() {
        println!(
            "Warning: No .{} files found in {}; writing empty report",
            extension,
            source_dir.display()
        );
    }

    let report = collect_bounds(&HgtBoundsProvider, &paths);

    let output_path = output.unwrap_or_else(|| default_output(&source_dir));
    let file = File::create(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    write_bounds_csv(BufWriter::new(file), &report.rows)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    for (path, err) in &report.failures {
        println!("Error processing {}: {}", path.display(), err);
    }
    println!("Complete! Created {}", output_path.display());
    println!("Total files processed: {}", report.rows.len());
    Ok(())
}

fn default_output(source_dir: &Path) -> PathBuf {
    source_dir.join("bounds.csv")
}

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Terrarium terrain tile packaging tool
#[derive(Parser)]
#[command(name = "terrapack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a bounds.csv report for the source rasters in a directory
    Bounds {
        /// Directory containing source rasters
        source_dir: PathBuf,

        /// Output CSV (defaults to <SOURCE_DIR>/bounds.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Raster file extension
        #[arg(long, default_value = "hgt")]
        extension: String,
    },

    /// Encode raw {z}-{x}-{y}.f32 elevation grids as Terrarium WebP tiles
    Encode {
        /// Directory containing little-endian f32 grids
        grid_dir: PathBuf,

        /// Directory to write {z}-{x}-{y}.webp tiles into
        out_dir: PathBuf,

        /// Tile edge in pixels
        #[arg(long, env = "TERRAPACK_TILE_SIZE", default_value_t = terrapack::terrarium::DEFAULT_TILE_SIZE)]
        tile_size: usize,

        /// Zoom level that keeps full 1/256 m precision
        #[arg(long, env = "TERRAPACK_FULL_RESOLUTION_ZOOM", default_value_t = terrapack::terrarium::DEFAULT_FULL_RESOLUTION_ZOOM)]
        full_resolution_zoom: u8,
    },

    /// Pack a directory of {z}-{x}-{y}.webp tiles into a PMTiles archive
    Archive {
        /// Directory containing encoded tiles
        tile_dir: PathBuf,

        /// Archive to create
        output: PathBuf,

        /// Attribution stored in the archive metadata
        #[arg(long, env = "TERRAPACK_ATTRIBUTION", default_value = terrapack::archive::DEFAULT_ATTRIBUTION)]
        attribution: String,

        /// Store identical tiles once
        #[arg(long)]
        deduplicate: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "terrapack=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Bounds {
            source_dir,
            output,
            extension,
        } => commands::bounds::run(source_dir, output, &extension),
        Commands::Encode {
            grid_dir,
            out_dir,
            tile_size,
            full_resolution_zoom,
        } => commands::encode::run(grid_dir, out_dir, tile_size, full_resolution_zoom),
        Commands::Archive {
            tile_dir,
            output,
            attribution,
            deduplicate,
        } => commands::archive::run(tile_dir, output, attribution, deduplicate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_encode_defaults() {
        let cli = Cli::try_parse_from(["terrapack", "encode", "grids", "tiles"]).unwrap();
        match cli.command {
            Commands::Encode {
                tile_size,
                full_resolution_zoom,
                ..
            } => {
                assert_eq!(tile_size, 512);
                assert_eq!(full_resolution_zoom, 19);
            }
            _ => panic!("Expected encode command"),
        }
    }

    #[test]
    fn test_archive_flags() {
        let cli = Cli::try_parse_from([
            "terrapack",
            "archive",
            "tiles",
            "out.pmtiles",
            "--attribution",
            "© me",
            "--deduplicate",
        ])
        .unwrap();
        match cli.command {
            Commands::Archive {
                output,
                attribution,
                deduplicate,
                ..
            } => {
                assert_eq!(output, PathBuf::from("out.pmtiles"));
                assert_eq!(attribution, "© me");
                assert!(deduplicate);
            }
            _ => panic!("Expected archive command"),
        }
    }
}

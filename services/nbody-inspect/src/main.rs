//! Inspect gbpCode simulation output from the command line.
//!
//! - `grid`: read one grid and print its shape and value statistics
//! - `grids`: list the grids stored in a file
//! - `catalog`: read a sharded halo catalog and summarize it
//! - `flags`: decode a gbpTrees flag word

mod summary;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use nbody_io::{
    list_grids, read_grid, CatalogSource, HaloCatalogReader, HaloCountCheck, ReaderConfig,
    TreeFlags,
};
use summary::{CatalogSummary, GridListing, GridSummary};

#[derive(Parser, Debug)]
#[command(name = "nbody-inspect")]
#[command(about = "Inspect gbpCode grid files and halo catalogs")]
struct Args {
    /// Log level
    #[arg(long, env = "NBODY_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read one grid and print summary statistics
    Grid {
        /// Grid file
        path: PathBuf,

        /// Grid to read: density, vx, vy or vz
        #[arg(short, long, default_value = "density")]
        name: String,
    },

    /// List the grids stored in a file
    Grids {
        /// Grid file
        path: PathBuf,
    },

    /// Read a halo catalog (one shard, several shards or a directory of shards)
    Catalog {
        /// Shard files or a single directory
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Count check: strict or lenient [env: NBODY_HALO_COUNT_CHECK]
        #[arg(long)]
        count_check: Option<String>,

        /// Halo records decoded per read block [env: NBODY_READ_BLOCK_RECORDS]
        #[arg(long)]
        block_records: Option<usize>,
    },

    /// Decode a tree flag value using a tree_flags.h header
    Flags {
        /// Path to tree_flags.h
        header: PathBuf,

        /// Flag word to decode
        value: u64,
    },
}

#[derive(Debug, Serialize)]
struct FlagsOutput {
    value: u64,
    flags: Vec<String>,
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // Results go to stdout; logs stay on stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Grid { path, name } => {
            let grid = read_grid(&path, &name)
                .with_context(|| format!("reading grid '{name}' from {}", path.display()))?;
            emit(&GridSummary::from_grid(&grid), args.json)?;
        }
        Command::Grids { path } => {
            let grids =
                list_grids(&path).with_context(|| format!("listing {}", path.display()))?;
            emit(&GridListing { path, grids }, args.json)?;
        }
        Command::Catalog {
            paths,
            count_check,
            block_records,
        } => {
            // Flags override the environment
            let mut config = ReaderConfig::from_env();
            if let Some(check) = count_check {
                config.halo_count_check = HaloCountCheck::from_str(&check);
            }
            if let Some(records) = block_records {
                config.read_block_records = records;
            }

            let source = match <[PathBuf; 1]>::try_from(paths) {
                Ok([path]) => CatalogSource::Path(path),
                Err(paths) => CatalogSource::Files(paths),
            };
            info!(?source, "Reading catalog");

            let catalog = HaloCatalogReader::new(config)?
                .read(source)
                .context("reading halo catalog")?;
            emit(&CatalogSummary::from_catalog(&catalog), args.json)?;
        }
        Command::Flags { header, value } => {
            let flags = TreeFlags::from_header_file(&header)
                .with_context(|| format!("parsing {}", header.display()))?;
            if args.json {
                let output = FlagsOutput {
                    value,
                    flags: flags.matching(value).into_iter().map(String::from).collect(),
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", flags.describe(value));
            }
        }
    }

    Ok(())
}

fn emit<T: Serialize + std::fmt::Display>(value: &T, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{value}");
    }
    Ok(())
}

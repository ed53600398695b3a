//! `topoline` command line: contour a region described by a YAML config.

use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use topoline_dem::metrics::describe_metrics;
use topoline_dem::CancelToken;
use topoline_runner::{write_paths, write_paths_to_file, RegionPipeline, RunConfig};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "topoline", version, about = "Contour lines from terrarium elevation tiles")]
struct Args {
    /// Run configuration (YAML).
    config: PathBuf,

    /// Output file for paths; overrides the config. Use `-` for stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tile zoom level; overrides the config.
    #[arg(short, long)]
    zoom: Option<u8>,

    /// Tile cache directory; overrides the config.
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Processing threads; overrides the config.
    #[arg(long)]
    threads: Option<usize>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();
    describe_metrics();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => {
            warn!("cancelled");
            ExitCode::from(130)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> topoline_runner::Result<()> {
    let mut config = RunConfig::load(&args.config)?;
    if let Some(zoom) = args.zoom {
        config.zoom = zoom;
    }
    if let Some(dir) = args.cache_dir {
        config.cache.directory = dir;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.output.is_some() {
        config.output = args.output;
    }

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        warn!("failed to install interrupt handler: {e}");
    }

    let pipeline = RegionPipeline::new(&config, cancel)?;
    let output = pipeline.run()?;

    match config.output.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            write_paths_to_file(path, &output.paths)?;
            info!(path = %path.display(), paths = output.paths.len(), "paths written");
        }
        _ => write_paths(io::stdout().lock(), &output.paths)?,
    }

    let stats = pipeline.cache().download_stats();
    info!(
        tiles = output.tiles,
        skipped = output.skipped_tiles.len(),
        downloaded = stats.tiles_downloaded,
        bytes = stats.bytes_downloaded,
        "run complete"
    );
    for (key, min, max) in &output.tile_ranges {
        debug!(%key, min, max, "tile elevation range (m)");
    }
    if let Some((min, max)) = output.elevation_range {
        info!(min, max, "elevation range (m)");
    }
    for (lower, count) in output.histogram.buckets() {
        info!(
            lower,
            upper = lower + output.histogram.bucket_size(),
            count,
            "elevation bucket"
        );
    }
    Ok(())
}

//! # topoline-runner
//!
//! Contours a geographic region from terrarium elevation tiles.
//!
//! A [`RunConfig`] names the region, zoom, contour levels and an optional
//! clip boundary. [`RegionPipeline`] fetches every tile the region needs
//! (plus the right/bottom neighbours used for stitching) into the on-disk
//! cache, then contours the stitched tiles in parallel.
//!
//! ```no_run
//! use topoline_dem::CancelToken;
//! use topoline_runner::{RegionPipeline, RunConfig};
//!
//! let config = RunConfig::from_yaml_str(
//!     "region: { west: -122.45, south: 47.55, east: -122.25, north: 47.70 }",
//! )?;
//! let output = RegionPipeline::new(&config, CancelToken::new())?.run()?;
//! println!("{} paths", output.paths.len());
//! # Ok::<(), topoline_runner::RunnerError>(())
//! ```

pub mod config;
mod error;
mod histogram;
pub mod output;
pub mod pipeline;

pub use config::{CacheSettings, FailurePolicySetting, LevelSettings, RegionConfig, RunConfig};
pub use error::RunnerError;
pub use histogram::ElevationHistogram;
pub use output::{write_paths, write_paths_to_file};
pub use pipeline::{levels, RegionPipeline, TileOutput};

/// Result type for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;

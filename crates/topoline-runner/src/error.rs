//! Error types for the runner.

use std::path::PathBuf;
use thiserror::Error;
use topoline_contour::ContourError;
use topoline_dem::DemError;

/// Errors that can occur while running a region.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// Reading the configuration file failed.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid YAML for [`crate::RunConfig`].
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The configuration parsed but is unusable.
    #[error("Configuration error: {0}")]
    InvalidConfig(String),

    /// Tile acquisition failed.
    #[error("DEM error: {0}")]
    Dem(#[from] DemError),

    /// Grid construction failed.
    #[error("contour error: {0}")]
    Contour(#[from] ContourError),

    /// The processing pool could not be built.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Writing output failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunnerError {
    /// Whether the run stopped because it was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunnerError::Dem(DemError::Cancelled(_)))
    }
}

//! Error types for the contour crate.

use thiserror::Error;

/// Errors raised while building grids and masks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContourError {
    /// The sample buffer does not hold exactly `width * height` values.
    #[error("Grid data has {actual} samples, expected {width}x{height}")]
    DimensionMismatch {
        /// Grid width in samples.
        width: usize,
        /// Grid height in samples.
        height: usize,
        /// Number of samples supplied.
        actual: usize,
    },

    /// A grid or mask with no samples.
    #[error("Raster must be at least 1x1, got {width}x{height}")]
    Empty {
        /// Requested width.
        width: usize,
        /// Requested height.
        height: usize,
    },

    /// Rows passed to [`crate::ElevationGrid::from_rows`] differ in length.
    #[error("Row {row} has {actual} samples, expected {expected}")]
    RaggedRows {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        actual: usize,
    },
}

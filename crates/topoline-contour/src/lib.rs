//! # topoline-contour
//!
//! Contour (isoline) extraction for elevation grids.
//!
//! This crate is the pure, CPU-bound half of topoline. Nothing in here touches
//! the network or the filesystem, so every function can run on any worker
//! thread against a shared read-only [`ElevationGrid`].
//!
//! ## Pipeline
//!
//! 1. [`contour::segments`] runs marching squares over a grid for one level and
//!    returns an unordered list of oriented [`Segment`]s.
//! 2. [`Mask::retain_segments`] optionally drops segments that leave a
//!    rasterized boundary.
//! 3. [`join::join_segments`] stitches the segments into open or closed
//!    [`Path`]s.
//!
//! ## Example
//!
//! ```
//! use topoline_contour::{contour, join, ElevationGrid};
//!
//! let grid = ElevationGrid::from_rows(&[
//!     vec![0.0, 0.0, 0.0],
//!     vec![0.0, 10.0, 0.0],
//!     vec![0.0, 0.0, 0.0],
//! ])?;
//!
//! let segments = contour::segments(&grid, 5.0);
//! let paths = join::join_segments(&segments);
//! assert_eq!(paths.len(), 1);
//! assert!(paths[0].is_closed());
//! # Ok::<(), topoline_contour::ContourError>(())
//! ```

pub mod contour;
mod error;
mod geom;
mod grid;
pub mod join;
mod mask;

pub use contour::CONTOUR_EPSILON;
pub use error::ContourError;
pub use geom::{Path, Point, PointKey, Segment, POINT_KEY_SCALE};
pub use grid::ElevationGrid;
pub use mask::Mask;

/// Result type for contour operations.
pub type Result<T> = std::result::Result<T, ContourError>;

//! Seamless grids from neighbouring tiles.
//!
//! Contouring a lone `T x T` tile leaves a one-pixel gap between it and its
//! east and south neighbours, since the last cell column and row need samples
//! from the next tile. Stitching borrows them:
//!
//! ```text
//!  ┌──────────── T ───────────┬─┐
//!  │                          │r│  r: column 0 of the right tile
//!  │          base            │ │
//!  │                          │ │
//!  ├──────────────────────────┼─┤
//!  │ b: row 0 of bottom tile  │d│  d: pixel (0, 0) of the diagonal tile
//!  └──────────────────────────┴─┘
//! ```

use crate::{DemError, Result};
use topoline_contour::ElevationGrid;

/// Build the `(T + 1) x (T + 1)` grid for a base tile and its east, south and
/// south-east neighbours.
///
/// All four grids must be `T x T`.
pub fn stitch(
    base: &ElevationGrid,
    right: &ElevationGrid,
    bottom: &ElevationGrid,
    diagonal: &ElevationGrid,
) -> Result<ElevationGrid> {
    let size = base.width();
    for (name, grid) in [("base", base), ("right", right), ("bottom", bottom), ("diagonal", diagonal)] {
        if grid.width() != size || grid.height() != size {
            return Err(DemError::Format {
                key: None,
                reason: format!(
                    "{name} grid is {}x{}, expected {size}x{size}",
                    grid.width(),
                    grid.height()
                ),
            });
        }
    }

    let stitched = size + 1;
    let mut data = Vec::with_capacity(stitched * stitched);
    for y in 0..size {
        data.extend_from_slice(base.row(y));
        data.push(right.get(0, y));
    }
    data.extend_from_slice(bottom.row(0));
    data.push(diagonal.get(0, 0));

    Ok(ElevationGrid::new(stitched, stitched, data)?)
}

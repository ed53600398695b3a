//! Row-major elevation grid.

use crate::{ContourError, Result};

/// A `width x height` raster of elevations in meters, stored row-major.
///
/// Grids are immutable once built; derived grids (stitched, masked) are new
/// values.
#[derive(Debug, Clone, PartialEq)]
pub struct ElevationGrid {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl ElevationGrid {
    /// Build a grid from row-major samples.
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ContourError::Empty { width, height });
        }
        if data.len() != width * height {
            return Err(ContourError::DimensionMismatch {
                width,
                height,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Build a grid from a slice of equally long rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(width * height);
        for (row, values) in rows.iter().enumerate() {
            if values.len() != width {
                return Err(ContourError::RaggedRows {
                    row,
                    expected: width,
                    actual: values.len(),
                });
            }
            data.extend_from_slice(values);
        }
        Self::new(width, height, data)
    }

    /// Build a grid by evaluating `f(x, y)` for every sample.
    pub fn from_fn<F: FnMut(usize, usize) -> f64>(
        width: usize,
        height: usize,
        mut f: F,
    ) -> Result<Self> {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    /// Width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in samples.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Elevation at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinate is outside the grid.
    pub fn get(&self, x: usize, y: usize) -> f64 {
        assert!(x < self.width && y < self.height, "({x}, {y}) outside {}x{} grid", self.width, self.height);
        self.data[y * self.width + x]
    }

    /// One row of samples.
    pub fn row(&self, y: usize) -> &[f64] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    /// All samples, row-major.
    pub fn values(&self) -> &[f64] {
        &self.data
    }

    /// Minimum and maximum elevation.
    pub fn min_max(&self) -> (f64, f64) {
        self.data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = ElevationGrid::new(3, 2, vec![0.0; 5]).unwrap_err();
        assert_eq!(
            err,
            ContourError::DimensionMismatch {
                width: 3,
                height: 2,
                actual: 5
            }
        );
        assert!(ElevationGrid::new(0, 4, Vec::new()).is_err());
    }

    #[test]
    fn test_from_rows_and_accessors() {
        let grid = ElevationGrid::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, -6.0]]).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.get(2, 0), 3.0);
        assert_eq!(grid.row(1), &[4.0, 5.0, -6.0]);
        assert_eq!(grid.min_max(), (-6.0, 5.0));
    }

    #[test]
    fn test_from_rows_ragged() {
        let err = ElevationGrid::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, ContourError::RaggedRows { row: 1, .. }));
    }

    #[test]
    fn test_from_fn() {
        let grid = ElevationGrid::from_fn(4, 3, |x, y| (x + 10 * y) as f64).unwrap();
        assert_eq!(grid.get(3, 2), 23.0);
    }
}

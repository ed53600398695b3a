//! Geographic boundary polygons.

use crate::GeoBounds;
use topoline_contour::Point;

/// A polygon in geographic coordinates, as (lng, lat) rings.
///
/// The first ring is the outer boundary; holes are further rings wound the
/// opposite way. Rings are closed implicitly.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Shape {
    rings: Vec<Vec<Point>>,
}

impl Shape {
    /// A shape from its rings.
    pub fn new(rings: Vec<Vec<Point>>) -> Self {
        Self { rings }
    }

    /// A shape with a single outer ring.
    pub fn from_ring(ring: Vec<Point>) -> Self {
        Self { rings: vec![ring] }
    }

    /// A rectangle covering `bounds`.
    pub fn from_bounds(bounds: &GeoBounds) -> Self {
        Self::from_ring(vec![
            Point::new(bounds.west, bounds.north),
            Point::new(bounds.east, bounds.north),
            Point::new(bounds.east, bounds.south),
            Point::new(bounds.west, bounds.south),
        ])
    }

    /// The rings.
    pub fn rings(&self) -> &[Vec<Point>] {
        &self.rings
    }

    /// Bounding box of every ring, or `None` for an empty shape.
    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_points(self.rings.iter().flatten())
    }
}

//! Planar points, oriented segments and polylines.
//!
//! The same [`Point`] type is used for grid (pixel) space and geographic
//! space; which one a value lives in depends on the pipeline stage.

/// Fixed-point scale used to quantize coordinates for equality and hashing.
///
/// Two points are considered equal when both coordinates round to the same
/// multiple of `1 / POINT_KEY_SCALE`. At the default scale that is one
/// micro-unit: sub-micropixel noise from interpolation collapses onto one key,
/// while distinct crossings of neighbouring cells stay apart. Geographic
/// coordinates (degrees) are never used as keys.
pub const POINT_KEY_SCALE: f64 = 1e6;

/// A planar coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// Horizontal coordinate (pixel column, or longitude).
    pub x: f64,
    /// Vertical coordinate (pixel row, or latitude).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Quantized key of this point.
    pub fn key(&self) -> PointKey {
        PointKey::from_point(*self)
    }

    /// Tolerance-based equality (same quantized key).
    pub fn approx_eq(&self, other: &Point) -> bool {
        self.key() == other.key()
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Hashable, quantized form of a [`Point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey {
    x: i64,
    y: i64,
}

impl PointKey {
    /// Quantize a point with [`POINT_KEY_SCALE`].
    pub fn from_point(point: Point) -> Self {
        Self {
            x: (point.x * POINT_KEY_SCALE).round() as i64,
            y: (point.y * POINT_KEY_SCALE).round() as i64,
        }
    }
}

/// One oriented isoline crossing inside a grid cell.
///
/// In raster coordinates (y grows downward) the higher ground lies on the
/// left-hand side when walking from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// Where the crossing enters the cell.
    pub start: Point,
    /// Where the crossing leaves the cell.
    pub end: Point,
}

impl Segment {
    /// Create a new segment.
    pub const fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Apply a coordinate transform to both endpoints.
    pub fn map<F: Fn(Point) -> Point>(&self, f: F) -> Self {
        Self {
            start: f(self.start),
            end: f(self.end),
        }
    }
}

/// An ordered polyline produced by joining segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Path {
    points: Vec<Point>,
}

impl Path {
    /// Wrap a list of points.
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Points of the path in walk order.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Consume the path, returning its points.
    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Number of points (a closed path repeats its first point at the end).
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the path has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// A path is closed when its first and last points coincide.
    pub fn is_closed(&self) -> bool {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) if self.points.len() > 1 => first.approx_eq(last),
            _ => false,
        }
    }

    /// Apply a coordinate transform to every point.
    pub fn map<F: Fn(Point) -> Point>(&self, f: F) -> Self {
        Self {
            points: self.points.iter().copied().map(f).collect(),
        }
    }
}

impl From<Vec<Point>> for Path {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}

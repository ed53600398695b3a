//! Per-pixel boundary masks.
//!
//! A [`Mask`] is an alpha raster at tile resolution. Boundary polygons are
//! filled by tiny-skia with the nonzero winding rule and no anti-aliasing,
//! so a pixel is opaque exactly when its centre lies inside the boundary.

use crate::{ContourError, Point, Result, Segment};
use tiny_skia::{FillRule, PathBuilder, Transform};

/// Opacity raster used to clip contours to a boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    alpha: Vec<u8>,
}

impl Mask {
    /// Alpha value of a pixel inside the boundary.
    pub const OPAQUE: u8 = 255;

    /// Alpha value of a pixel outside the boundary.
    pub const TRANSPARENT: u8 = 0;

    /// A mask with every pixel set to `alpha`.
    pub fn filled(width: usize, height: usize, alpha: u8) -> Self {
        Self {
            width,
            height,
            alpha: vec![alpha; width * height],
        }
    }

    /// Wrap an existing row-major alpha buffer.
    pub fn from_alpha(width: usize, height: usize, alpha: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ContourError::Empty { width, height });
        }
        if alpha.len() != width * height {
            return Err(ContourError::DimensionMismatch {
                width,
                height,
                actual: alpha.len(),
            });
        }
        Ok(Self {
            width,
            height,
            alpha,
        })
    }

    /// Fill polygon rings (in pixel coordinates) into a new mask.
    ///
    /// Rings are closed implicitly and filled together with the nonzero
    /// winding rule, without anti-aliasing, so holes wound opposite to their
    /// outer ring stay transparent and every pixel is either opaque or
    /// transparent.
    pub fn rasterize(width: usize, height: usize, rings: &[Vec<Point>]) -> Self {
        let empty = || Self::filled(width, height, Self::TRANSPARENT);
        let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
            return empty();
        };
        let Some(mut raster) = tiny_skia::Mask::new(w, h) else {
            return empty();
        };

        let mut pb = PathBuilder::new();
        for ring in rings.iter().filter(|ring| ring.len() >= 3) {
            pb.move_to(ring[0].x as f32, ring[0].y as f32);
            for p in &ring[1..] {
                pb.line_to(p.x as f32, p.y as f32);
            }
            pb.close();
        }
        let Some(path) = pb.finish() else {
            return empty();
        };
        raster.fill_path(&path, FillRule::Winding, false, Transform::identity());

        Self {
            width,
            height,
            alpha: raster.data().to_vec(),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Alpha at a pixel; pixels outside the mask are transparent.
    pub fn alpha_at(&self, x: usize, y: usize) -> u8 {
        if x < self.width && y < self.height {
            self.alpha[y * self.width + x]
        } else {
            Self::TRANSPARENT
        }
    }

    /// Set the alpha of one pixel. Out-of-range writes are ignored.
    pub fn set_alpha(&mut self, x: usize, y: usize, alpha: u8) {
        if x < self.width && y < self.height {
            self.alpha[y * self.width + x] = alpha;
        }
    }

    /// Whether a pixel is fully opaque.
    pub fn is_opaque(&self, x: usize, y: usize) -> bool {
        self.alpha_at(x, y) == Self::OPAQUE
    }

    /// Whether the pixel containing `point` is opaque.
    pub fn contains(&self, point: Point) -> bool {
        if point.x < 0.0 || point.y < 0.0 || !point.x.is_finite() || !point.y.is_finite() {
            return false;
        }
        self.is_opaque(point.x as usize, point.y as usize)
    }

    /// Keep only segments with both endpoints on opaque pixels.
    pub fn retain_segments(&self, segments: &mut Vec<Segment>) {
        segments.retain(|s| self.contains(s.start) && self.contains(s.end));
    }

    /// Number of opaque pixels.
    pub fn opaque_count(&self) -> usize {
        self.alpha.iter().filter(|&&a| a == Self::OPAQUE).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn test_rasterize_rectangle() {
        let mask = Mask::rasterize(8, 8, &[rect(2.0, 1.0, 6.0, 4.0)]);
        assert_eq!(mask.opaque_count(), 4 * 3);
        assert!(mask.is_opaque(2, 1));
        assert!(mask.is_opaque(5, 3));
        assert!(!mask.is_opaque(6, 3));
        assert!(!mask.is_opaque(2, 4));
    }

    #[test]
    fn test_rasterize_clips_to_raster() {
        let mask = Mask::rasterize(4, 4, &[rect(-10.0, -10.0, 10.0, 10.0)]);
        assert_eq!(mask.opaque_count(), 16);
    }

    #[test]
    fn test_rasterize_hole() {
        let mut hole = rect(2.0, 2.0, 4.0, 4.0);
        hole.reverse();
        let mask = Mask::rasterize(6, 6, &[rect(0.0, 0.0, 6.0, 6.0), hole]);
        assert_eq!(mask.opaque_count(), 36 - 4);
        assert!(!mask.is_opaque(3, 3));
    }

    #[test]
    fn test_rasterize_degenerate_rings() {
        let line = vec![Point::new(0.0, 0.0), Point::new(4.0, 4.0)];
        assert_eq!(Mask::rasterize(4, 4, &[line]).opaque_count(), 0);
        assert_eq!(Mask::rasterize(4, 4, &[]).opaque_count(), 0);
        assert_eq!(Mask::rasterize(0, 4, &[rect(0.0, 0.0, 4.0, 4.0)]).opaque_count(), 0);
    }

    #[test]
    fn test_rasterize_is_binary() {
        let triangle = vec![Point::new(0.3, 0.2), Point::new(7.7, 1.1), Point::new(3.4, 6.9)];
        let mask = Mask::rasterize(8, 8, &[triangle]);
        assert!(mask.opaque_count() > 0);
        assert!(mask.alpha.iter().all(|&a| a == Mask::OPAQUE || a == Mask::TRANSPARENT));
    }

    #[test]
    fn test_contains_truncates() {
        let mut mask = Mask::filled(2, 2, Mask::TRANSPARENT);
        mask.set_alpha(1, 0, Mask::OPAQUE);
        assert!(mask.contains(Point::new(1.99, 0.5)));
        assert!(!mask.contains(Point::new(0.99, 0.5)));
        assert!(!mask.contains(Point::new(2.0, 0.5)));
        assert!(!mask.contains(Point::new(-0.1, 0.5)));
    }

    #[test]
    fn test_from_alpha_checks_length() {
        assert!(Mask::from_alpha(2, 2, vec![255; 3]).is_err());
        assert!(Mask::from_alpha(2, 2, vec![255; 4]).is_ok());
    }
}

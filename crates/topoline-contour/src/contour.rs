//! Marching-squares extraction of level crossings.
//!
//! Every grid cell whose corners straddle the level is split into four
//! triangles that share a synthetic centre vertex (the mean of the four
//! corners). Contouring each triangle separately resolves the saddle case
//! without having to pick a diagonal, and every triangle crossing yields at
//! most one segment.
//!
//! ```text
//!  v0 ─────── v1
//!  │ ╲       ╱ │
//!  │   ╲   ╱   │
//!  │    v4     │
//!  │   ╱   ╲   │
//!  │ ╱       ╲ │
//!  v2 ─────── v3
//! ```

use crate::{ElevationGrid, Point, Segment};

/// Offset added to every level before comparing.
///
/// Tile elevations are quantized, so integer levels would otherwise land
/// exactly on samples and produce zero-length or duplicated crossings.
pub const CONTOUR_EPSILON: f64 = 1e-7;

#[derive(Debug, Clone, Copy)]
struct Vertex {
    x: f64,
    y: f64,
    z: f64,
}

impl Vertex {
    fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    fn sub(self, other: Vertex) -> Vertex {
        Vertex::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    fn cross(self, other: Vertex) -> Vertex {
        Vertex::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }
}

/// Extract all level crossings of `grid` at `level`.
///
/// The result is unordered. Each segment is oriented so the higher side is on
/// its left in raster coordinates; see [`Segment`].
pub fn segments(grid: &ElevationGrid, level: f64) -> Vec<Segment> {
    let z = level + CONTOUR_EPSILON;
    let (w, h) = (grid.width(), grid.height());
    let mut result = Vec::new();

    for y in 0..h.saturating_sub(1) {
        let top = grid.row(y);
        let bottom = grid.row(y + 1);
        let fy = y as f64;
        for x in 0..w - 1 {
            let (z0, z1, z2, z3) = (top[x], top[x + 1], bottom[x], bottom[x + 1]);
            if z0 < z && z1 < z && z2 < z && z3 < z {
                continue;
            }
            if z0 > z && z1 > z && z2 > z && z3 > z {
                continue;
            }

            let fx = x as f64;
            let v0 = Vertex::new(fx, fy, z0);
            let v1 = Vertex::new(fx + 1.0, fy, z1);
            let v2 = Vertex::new(fx, fy + 1.0, z2);
            let v3 = Vertex::new(fx + 1.0, fy + 1.0, z3);
            let v4 = Vertex::new(fx + 0.5, fy + 0.5, (z0 + z1 + z2 + z3) / 4.0);

            let triangles = [(v0, v2, v4), (v0, v4, v1), (v1, v4, v3), (v2, v3, v4)];
            result.extend(
                triangles
                    .into_iter()
                    .filter_map(|(a, b, c)| triangle_segment(z, a, b, c)),
            );
        }
    }

    result
}

/// Crossing of edge `a -> b`, if the level lies within it.
fn crossing(z: f64, a: Vertex, b: Vertex) -> Option<Point> {
    if a.z == b.z {
        return None;
    }
    let t = (z - a.z) / (b.z - a.z);
    if !(0.0..=1.0).contains(&t) {
        return None;
    }
    Some(Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t))
}

fn triangle_segment(z: f64, a: Vertex, b: Vertex, c: Vertex) -> Option<Segment> {
    let (p1, p2) = match (crossing(z, a, b), crossing(z, b, c), crossing(z, c, a)) {
        (Some(p), Some(q), _) => (p, q),
        (Some(p), None, Some(q)) => (p, q),
        (None, Some(p), Some(q)) => (p, q),
        _ => return None,
    };

    // The triangle normal's xy part points uphill for every triangle above,
    // since all four share the same winding.
    let normal = b.sub(a).cross(c.sub(a));
    let perp_x = p1.y - p2.y;
    let perp_y = p2.x - p1.x;
    if perp_x * normal.x + perp_y * normal.y < 0.0 {
        Some(Segment::new(p1, p2))
    } else {
        Some(Segment::new(p2, p1))
    }
}

//! Property tests for contour extraction, joining and masking.
//!
//! Path order and starting points are unspecified, so every comparison here
//! canonicalizes paths first (closed rings are compared up to rotation).

use std::collections::BTreeSet;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use topoline_contour::{contour, join, ElevationGrid, Mask, Path, Point, PointKey, Segment};

// ============================================================================
// Helpers
// ============================================================================

/// Canonical form of a path: closed rings drop the repeated point and rotate
/// to start at their smallest key.
fn canonical(path: &Path) -> Vec<PointKey> {
    let mut keys: Vec<PointKey> = path.points().iter().map(Point::key).collect();
    if path.is_closed() {
        keys.pop();
        if let Some(min_index) = keys.iter().enumerate().min_by_key(|(_, k)| **k).map(|(i, _)| i) {
            keys.rotate_left(min_index);
        }
    }
    keys
}

fn canonical_set(paths: &[Path]) -> BTreeSet<Vec<PointKey>> {
    paths.iter().map(canonical).collect()
}

/// Shoelace area in raster coordinates.
fn signed_area(path: &Path) -> f64 {
    path.points()
        .windows(2)
        .map(|w| w[0].x * w[1].y - w[1].x * w[0].y)
        .sum::<f64>()
        / 2.0
}

fn peak() -> ElevationGrid {
    ElevationGrid::from_rows(&[
        vec![0.0, 0.0, 0.0],
        vec![0.0, 10.0, 0.0],
        vec![0.0, 0.0, 0.0],
    ])
    .unwrap()
}

fn random_grid(rng: &mut ChaCha8Rng, width: usize, height: usize) -> ElevationGrid {
    ElevationGrid::from_fn(width, height, |_, _| rng.gen_range(0..20) as f64).unwrap()
}

// ============================================================================
// Contour extraction
// ============================================================================

#[test]
fn test_straddled_cell_always_emits() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..25 {
        let grid = random_grid(&mut rng, 6, 5);
        for y in 0..grid.height() - 1 {
            for x in 0..grid.width() - 1 {
                let corners = [grid.get(x, y), grid.get(x + 1, y), grid.get(x, y + 1), grid.get(x + 1, y + 1)];
                let lo = corners.iter().cloned().fold(f64::INFINITY, f64::min);
                let hi = corners.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                if lo == hi {
                    continue;
                }
                let level = lo + (hi - lo) * 0.37;
                let in_cell = |p: Point| {
                    p.x >= x as f64 && p.x <= x as f64 + 1.0 && p.y >= y as f64 && p.y <= y as f64 + 1.0
                };
                let count = contour::segments(&grid, level)
                    .into_iter()
                    .filter(|s| in_cell(s.start) && in_cell(s.end))
                    .count();
                assert!(count >= 1, "cell ({x}, {y}) corners {corners:?} level {level}");
            }
        }
    }
}

#[test]
fn test_level_outside_range_emits_nothing() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    for _ in 0..10 {
        let grid = random_grid(&mut rng, 8, 8);
        let (lo, hi) = grid.min_max();
        assert!(contour::segments(&grid, hi + 0.5).is_empty());
        assert!(contour::segments(&grid, lo - 0.5).is_empty());
    }
}

#[test]
fn test_contours_join_into_consistent_rings() {
    let rings = join::join_segments(&contour::segments(&peak(), 5.0));
    assert_eq!(rings.len(), 1);
    let ring = &rings[0];
    assert!(ring.is_closed());
    assert_eq!(ring.len(), 9);
    assert!(signed_area(ring) < 0.0, "peak ring should wind with the summit on its left");

    let pit = ElevationGrid::from_rows(&[
        vec![10.0, 10.0, 10.0],
        vec![10.0, 0.0, 10.0],
        vec![10.0, 10.0, 10.0],
    ])
    .unwrap();
    let rings = join::join_segments(&contour::segments(&pit, 5.0));
    assert_eq!(rings.len(), 1);
    assert!(signed_area(&rings[0]) > 0.0);
}

#[test]
fn test_saddle_components() {
    let grid = ElevationGrid::from_rows(&[vec![10.0, 0.0], vec![0.0, 10.0]]).unwrap();
    let paths = join::join_segments(&contour::segments(&grid, 4.0));

    // Arcs around the two low corners never connect across the diagonal
    // joining the high corners.
    let edges: usize = paths.iter().map(|p| p.len() - 1).sum();
    assert_eq!(edges, 4);
    for path in &paths {
        assert!(!path.is_closed());
        let sides: BTreeSet<i8> = path
            .points()
            .iter()
            .map(|p| if p.x > p.y { 1 } else { -1 })
            .collect();
        assert_eq!(sides.len(), 1, "{path:?}");
    }
}

// ============================================================================
// Joining
// ============================================================================

#[test]
fn test_simple_polygon_joins_into_one_closed_path() {
    let n = 12;
    let vertices: Vec<Point> = (0..n)
        .map(|i| {
            let angle = i as f64 / n as f64 * std::f64::consts::TAU;
            Point::new(5.0 + 3.0 * angle.cos(), 5.0 + 3.0 * angle.sin())
        })
        .collect();
    let mut segments: Vec<Segment> = (0..n)
        .map(|i| Segment::new(vertices[i], vertices[(i + 1) % n]))
        .collect();

    let mut rng = ChaCha8Rng::seed_from_u64(3);
    for _ in 0..5 {
        segments.shuffle(&mut rng);
        let paths = join::join_segments(&segments);
        assert_eq!(paths.len(), 1);
        assert!(paths[0].is_closed());
        assert_eq!(paths[0].len(), n + 1);

        let visited: BTreeSet<PointKey> = paths[0].points().iter().map(Point::key).collect();
        let expected: BTreeSet<PointKey> = vertices.iter().map(Point::key).collect();
        assert_eq!(visited, expected);
    }
}

#[test]
fn test_partition_is_order_independent() {
    let mut rng = ChaCha8Rng::seed_from_u64(19);
    let grid = random_grid(&mut rng, 12, 12);
    let mut segments = contour::segments(&grid, 9.3);

    // Only closed rings have an order-independent canonical form; open
    // paths can be split differently depending on the entry point.
    let closed_rings = |paths: Vec<Path>| -> BTreeSet<Vec<PointKey>> {
        canonical_set(&paths.into_iter().filter(Path::is_closed).collect::<Vec<_>>())
    };

    let reference = closed_rings(join::join_segments(&segments));
    for _ in 0..4 {
        segments.shuffle(&mut rng);
        assert_eq!(closed_rings(join::join_segments(&segments)), reference);
    }
}

// ============================================================================
// Masking
// ============================================================================

#[test]
fn test_mask_removes_segments_touching_excluded_quadrant() {
    let segments = contour::segments(&peak(), 5.0);
    assert_eq!(segments.len(), 8);

    // Everything but the top-left pixel.
    let l_shape = vec![
        Point::new(1.0, 0.0),
        Point::new(3.0, 0.0),
        Point::new(3.0, 3.0),
        Point::new(0.0, 3.0),
        Point::new(0.0, 1.0),
        Point::new(1.0, 1.0),
    ];
    let mask = Mask::rasterize(3, 3, &[l_shape]);
    assert_eq!(mask.opaque_count(), 8);
    assert!(!mask.is_opaque(0, 0));

    let touches_quadrant = |p: Point| p.x < 1.0 && p.y < 1.0;
    let expected_removed: Vec<Segment> = segments
        .iter()
        .copied()
        .filter(|s| touches_quadrant(s.start) || touches_quadrant(s.end))
        .collect();
    // The two segments of the top-left cell that meet around the centre.
    assert_eq!(expected_removed.len(), 2);

    let mut kept = segments.clone();
    mask.retain_segments(&mut kept);
    assert_eq!(kept.len(), 6);
    assert_eq!(kept.len() + expected_removed.len(), segments.len());
    for removed in &expected_removed {
        assert!(!kept.contains(removed));
    }

    // The ring is cut open where the quadrant was removed.
    let paths = join::join_segments(&kept);
    assert!(paths.iter().all(|p| !p.is_closed()));
}

//! Assembly of unordered segments into polylines.
//!
//! Segments are directed, so joining only ever follows `start -> end`. The
//! walk starts at an arbitrary remaining point; which point a path starts at
//! and the order paths come out in are unspecified. The partition of segments
//! into paths is not: a closed ring always comes back as one closed path,
//! whatever point it was entered from.

use std::collections::{HashMap, VecDeque};

use crate::{Path, Point, PointKey, Segment};

/// Outgoing edges of one start point.
#[derive(Debug)]
struct Outgoing {
    origin: Point,
    targets: VecDeque<Point>,
}

/// Join directed segments into paths.
///
/// Points are matched through [`PointKey`], so endpoints that differ only by
/// interpolation noise connect. Coincident crossings keep every outgoing
/// edge; each edge is consumed exactly once.
pub fn join_segments(segments: &[Segment]) -> Vec<Path> {
    let mut lookup: HashMap<PointKey, Outgoing> = HashMap::with_capacity(segments.len());
    for segment in segments {
        lookup
            .entry(segment.start.key())
            .or_insert_with(|| Outgoing {
                origin: segment.start,
                targets: VecDeque::new(),
            })
            .targets
            .push_back(segment.end);
    }

    let mut paths = Vec::new();
    loop {
        let Some((&key, entry)) = lookup.iter().next() else {
            break;
        };
        let mut current_key = key;
        let mut current = entry.origin;
        let mut points = Vec::new();

        loop {
            points.push(current);
            let Some(entry) = lookup.get_mut(&current_key) else {
                break;
            };
            let Some(next) = entry.targets.pop_front() else {
                lookup.remove(&current_key);
                break;
            };
            if entry.targets.is_empty() {
                lookup.remove(&current_key);
            }
            current = next;
            current_key = next.key();
        }

        paths.push(Path::new(points));
    }

    paths
}

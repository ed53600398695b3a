//! Region contouring: fetch every tile a region needs, then contour the
//! stitched tiles in parallel and merge the results.
//!
//! Per-tile work is pure, so tiles are distributed over a rayon pool and
//! combined with [`TileOutput::merge`], which is associative and commutative.
//! Cancellation is checked before each tile and each level.

use crate::{ElevationHistogram, Result, RunConfig, RunnerError};
use rayon::prelude::*;
use std::sync::Arc;
use topoline_contour::Path;
use topoline_dem::metrics::metric_defs;
use topoline_dem::{
    BatchReport, CancelToken, DemError, FailurePolicy, HttpTransport, Shape, TileCache, TileKey,
    TileRange, TileTransport,
};
use tracing::{debug, info, warn};

/// Levels from `start` to `stop` (inclusive when hit) every `step` meters.
///
/// Levels are computed as `start + i * step` so rounding does not accumulate.
/// A non-positive step yields no levels.
pub fn levels(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if !(step > 0.0) || stop < start {
        return Vec::new();
    }
    let count = ((stop - start) / step + 1e-9).floor() as usize + 1;
    (0..count).map(|i| start + i as f64 * step).collect()
}

/// Contours and statistics for a set of tiles.
#[derive(Debug, Clone, Default)]
pub struct TileOutput {
    /// Contour paths in (lng, lat).
    pub paths: Vec<Path>,
    /// Masked elevation samples.
    pub histogram: ElevationHistogram,
    /// Lowest and highest elevation seen, in meters.
    pub elevation_range: Option<(f64, f64)>,
    /// Minimum and maximum elevation of each contoured tile, in meters.
    pub tile_ranges: Vec<(TileKey, f64, f64)>,
    /// Tiles contoured.
    pub tiles: usize,
    /// Tiles left out because their data could not be fetched.
    pub skipped_tiles: Vec<TileKey>,
}

impl TileOutput {
    /// Combine two outputs. Path order is unspecified.
    pub fn merge(mut self, other: TileOutput) -> TileOutput {
        self.paths.extend(other.paths);
        self.histogram.merge(other.histogram);
        self.elevation_range = match (self.elevation_range, other.elevation_range) {
            (Some((a_min, a_max)), Some((b_min, b_max))) => Some((a_min.min(b_min), a_max.max(b_max))),
            (a, b) => a.or(b),
        };
        self.tiles += other.tiles;
        self.tile_ranges.extend(other.tile_ranges);
        self.skipped_tiles.extend(other.skipped_tiles);
        self
    }
}

/// Runs one region end to end.
#[derive(Debug)]
pub struct RegionPipeline {
    cache: TileCache,
    range: TileRange,
    levels: Vec<f64>,
    boundary: Option<Shape>,
    histogram_bucket: f64,
    threads: Option<usize>,
    failure_policy: FailurePolicy,
    cancel: CancelToken,
}

impl RegionPipeline {
    /// Build a pipeline fetching over HTTP.
    pub fn new(config: &RunConfig, cancel: CancelToken) -> Result<Self> {
        let transport = HttpTransport::new(config.cache.url_template.clone(), config.timeout())?;
        Self::with_transport(config, Arc::new(transport), cancel)
    }

    /// Build a pipeline over any tile transport.
    pub fn with_transport(
        config: &RunConfig,
        transport: Arc<dyn TileTransport>,
        cancel: CancelToken,
    ) -> Result<Self> {
        config.validate()?;
        let bounds = config
            .bounds()
            .ok_or_else(|| RunnerError::InvalidConfig("region has no extent".into()))?;
        let range = TileRange::covering(&bounds, config.zoom)?;
        let cache_config = config.cache_config();
        let failure_policy = cache_config.failure_policy;
        let cache = TileCache::with_cancel(cache_config, transport, cancel.clone())?;

        let levels = levels(config.levels.start, config.levels.stop, config.levels.step);
        info!(
            zoom = config.zoom,
            tiles = range.len(),
            levels = levels.len(),
            "region pipeline ready"
        );

        Ok(Self {
            cache,
            range,
            levels,
            boundary: config.boundary_shape(),
            histogram_bucket: config.histogram_bucket,
            threads: config.threads,
            failure_policy,
            cancel,
        })
    }

    /// Tiles that will be contoured.
    pub fn range(&self) -> &TileRange {
        &self.range
    }

    /// Levels that will be contoured.
    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// The underlying tile cache.
    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Ensure every tile and stitch neighbour is cached.
    pub fn fetch(&self) -> Result<BatchReport> {
        for key in self.range.with_stitch_neighbors() {
            self.cache.ensure(key)?;
        }
        Ok(self.cache.wait()?)
    }

    /// Contour every tile in the range from the cache.
    pub fn process(&self) -> Result<TileOutput> {
        let keys: Vec<TileKey> = self.range.iter().collect();

        let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("contour-{i}"));
        if let Some(threads) = self.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build()?;

        let output = pool.install(|| {
            keys.par_iter()
                .map(|&key| self.process_tile(key))
                .try_reduce(TileOutput::default, |a, b| Ok(a.merge(b)))
        })?;

        info!(
            tiles = output.tiles,
            skipped = output.skipped_tiles.len(),
            paths = output.paths.len(),
            "region contoured"
        );
        Ok(output)
    }

    /// Fetch, then contour.
    pub fn run(&self) -> Result<TileOutput> {
        let report = self.fetch()?;
        if !report.failures.is_empty() {
            warn!(failed = report.failures.len(), "some tiles could not be fetched");
        }
        self.process()
    }

    fn process_tile(&self, key: TileKey) -> Result<TileOutput> {
        self.cancel.check(key)?;

        let mut tile = match self.cache.get_stitched(key) {
            Ok(tile) => tile,
            Err(DemError::NotFound(missing)) if self.failure_policy == FailurePolicy::Skip => {
                warn!(%key, %missing, "skipping tile with missing data");
                return Ok(TileOutput {
                    skipped_tiles: vec![key],
                    ..TileOutput::default()
                });
            }
            Err(err) => return Err(err.into()),
        };
        if let Some(boundary) = &self.boundary {
            tile.mask_shapes(std::slice::from_ref(boundary));
        }

        let mut histogram = ElevationHistogram::new(self.histogram_bucket);
        histogram.extend(tile.masked_samples());

        let mut paths = Vec::new();
        for &level in &self.levels {
            self.cancel.check(key)?;
            if tile.spans_level(level) {
                paths.extend(tile.masked_contour_lines(level));
            }
        }

        debug!(%key, paths = paths.len(), "tile contoured");
        metrics::counter!(metric_defs::TILES_PROCESSED.name).increment(1);
        metrics::counter!(metric_defs::CONTOUR_PATHS.name).increment(paths.len() as u64);

        let (min, max) = (tile.min_elevation(), tile.max_elevation());
        Ok(TileOutput {
            paths,
            histogram,
            elevation_range: Some((min, max)),
            tile_ranges: vec![(key, min, max)],
            tiles: 1,
            skipped_tiles: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use topoline_contour::Point;

    #[test]
    fn test_levels() {
        assert_eq!(levels(0.0, 300.0, 100.0), vec![0.0, 100.0, 200.0, 300.0]);
        assert_eq!(levels(0.0, 350.0, 100.0), vec![0.0, 100.0, 200.0, 300.0]);
        assert_eq!(levels(5.0, 5.0, 1.0), vec![5.0]);
        assert!(levels(10.0, 0.0, 1.0).is_empty());
        assert!(levels(0.0, 10.0, 0.0).is_empty());

        let fine = levels(0.0, 1.0, 0.1);
        assert_eq!(fine.len(), 11);
        assert_abs_diff_eq!(fine[10], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_merge_combines_everything() {
        let path = Path::new(vec![Point::new(0.0, 0.0), Point::new(1.0, 1.0)]);
        let mut hist = ElevationHistogram::new(10.0);
        hist.add(5.0);
        let a = TileOutput {
            paths: vec![path.clone()],
            histogram: hist.clone(),
            elevation_range: Some((0.0, 50.0)),
            tile_ranges: vec![(TileKey::new(1, 1, 0), 0.0, 50.0)],
            tiles: 1,
            skipped_tiles: Vec::new(),
        };
        let b = TileOutput {
            paths: vec![path.clone(), path],
            histogram: hist,
            elevation_range: Some((-20.0, 30.0)),
            tile_ranges: vec![(TileKey::new(1, 0, 1), -20.0, 30.0)],
            tiles: 1,
            skipped_tiles: vec![TileKey::new(1, 0, 0)],
        };

        let merged = TileOutput::default().merge(a).merge(b);
        assert_eq!(merged.paths.len(), 3);
        assert_eq!(merged.histogram.total(), 2);
        assert_eq!(merged.elevation_range, Some((-20.0, 50.0)));
        assert_eq!(merged.tiles, 2);
        assert_eq!(
            merged.tile_ranges,
            vec![(TileKey::new(1, 1, 0), 0.0, 50.0), (TileKey::new(1, 0, 1), -20.0, 30.0)]
        );
        assert_eq!(merged.skipped_tiles.len(), 1);
    }
}

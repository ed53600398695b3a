//! Metric declarations for tile acquisition and contouring.
//!
//! Metrics are declared once here as [`Metric`] constants so that names stay
//! consistent between the cache, the pipeline and whatever recorder the
//! binary installs.
//!
//! ```rust
//! use topoline_dem::metrics::{metric_defs, MetricKind};
//!
//! assert_eq!(metric_defs::TILES_FETCHED.kind, MetricKind::Counter);
//! metrics::counter!(metric_defs::TILES_FETCHED.name).increment(1);
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// How a metric is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Only ever incremented.
    Counter,
    /// Set to the latest value.
    Gauge,
    /// Sampled into a distribution.
    Histogram,
}

/// Name, kind and description of one metric.
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name.
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit of measurement, if any.
    pub unit: Option<Unit>,
}

impl Metric {
    /// A counter named `name`.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// A gauge named `name`.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// A histogram named `name`.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
        }
    }

    /// Attach a description.
    pub const fn with_description(self, description: &'static str) -> Self {
        Self { description, ..self }
    }

    /// Attach a unit.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Describe this metric to the global recorder.
    pub fn describe(&self) {
        let (name, text) = (self.name, self.description);
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => describe_counter!(name, unit, text),
            (MetricKind::Counter, None) => describe_counter!(name, text),
            (MetricKind::Gauge, Some(unit)) => describe_gauge!(name, unit, text),
            (MetricKind::Gauge, None) => describe_gauge!(name, text),
            (MetricKind::Histogram, Some(unit)) => describe_histogram!(name, unit, text),
            (MetricKind::Histogram, None) => describe_histogram!(name, text),
        }
    }
}

/// All metric definitions.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Tile cache
    // ========================================================================

    /// Tiles downloaded and persisted.
    pub const TILES_FETCHED: Metric = Metric::counter("topoline.cache.tiles_fetched")
        .with_description("Tiles downloaded and written to the cache")
        .with_unit(Unit::Count);

    /// Bytes downloaded.
    pub const TILE_BYTES: Metric = Metric::counter("topoline.cache.bytes_fetched")
        .with_description("Encoded tile bytes downloaded")
        .with_unit(Unit::Bytes);

    /// `ensure` calls satisfied by an existing cache entry or in-flight fetch.
    pub const CACHE_HITS: Metric = Metric::counter("topoline.cache.hits")
        .with_description("Ensure requests that needed no new fetch")
        .with_unit(Unit::Count);

    /// Fetch attempts that were retried.
    pub const FETCH_RETRIES: Metric = Metric::counter("topoline.cache.fetch_retries")
        .with_description("Failed fetch attempts that were retried")
        .with_unit(Unit::Count);

    /// Fetches that failed after all attempts.
    pub const FETCH_FAILURES: Metric = Metric::counter("topoline.cache.fetch_failures")
        .with_description("Tile fetches that failed permanently")
        .with_unit(Unit::Count);

    /// Wall time of one successful fetch including retries.
    pub const FETCH_DURATION: Metric = Metric::histogram("topoline.cache.fetch_duration_s")
        .with_description("Time to fetch and persist one tile")
        .with_unit(Unit::Seconds);

    /// Fetches queued or running.
    pub const FETCHES_IN_FLIGHT: Metric = Metric::gauge("topoline.cache.in_flight")
        .with_description("Tile fetches queued or running")
        .with_unit(Unit::Count);

    // ========================================================================
    // Contouring
    // ========================================================================

    /// Tiles contoured by the pipeline.
    pub const TILES_PROCESSED: Metric = Metric::counter("topoline.pipeline.tiles_processed")
        .with_description("Stitched tiles contoured")
        .with_unit(Unit::Count);

    /// Paths produced by the pipeline.
    pub const CONTOUR_PATHS: Metric = Metric::counter("topoline.pipeline.paths")
        .with_description("Contour paths produced")
        .with_unit(Unit::Count);

    /// All defined metrics.
    pub const ALL: &[&Metric] = &[
        &TILES_FETCHED,
        &TILE_BYTES,
        &CACHE_HITS,
        &FETCH_RETRIES,
        &FETCH_FAILURES,
        &FETCH_DURATION,
        &FETCHES_IN_FLIGHT,
        &TILES_PROCESSED,
        &CONTOUR_PATHS,
    ];
}

/// Describe every metric to the installed recorder. Call once at startup.
pub fn describe_metrics() {
    metric_defs::ALL.iter().for_each(|metric| metric.describe());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_names_are_unique() {
        let names: HashSet<_> = metric_defs::ALL.iter().map(|m| m.name).collect();
        assert_eq!(names.len(), metric_defs::ALL.len());
        assert!(metric_defs::ALL.iter().all(|m| m.name.starts_with("topoline.")));
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}

//! YAML run configuration.
//!
//! ```yaml
//! region: { west: -122.45, south: 47.55, east: -122.25, north: 47.70 }
//! zoom: 12
//! cache:
//!   directory: ./elevation_cache
//!   max_downloads: 8
//!   failure_policy: skip
//! levels: { start: 0, stop: 4500, step: 100 }
//! boundary:
//!   - [-122.44, 47.56]
//!   - [-122.26, 47.56]
//!   - [-122.35, 47.69]
//! histogram_bucket: 50
//! output: contours.txt
//! ```
//!
//! Everything except `region` (or `boundary`) has a default.

use crate::{Result, RunnerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use topoline_contour::Point;
use topoline_dem::transport::{validate_template, DEFAULT_TIMEOUT};
use topoline_dem::{
    CacheConfig, FailurePolicy, GeoBounds, RetryPolicy, Shape, DEFAULT_URL_TEMPLATE,
    DEFAULT_ZOOM, MAX_ZOOM,
};

/// Geographic box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    /// Western longitude.
    pub west: f64,
    /// Southern latitude.
    pub south: f64,
    /// Eastern longitude.
    pub east: f64,
    /// Northern latitude.
    pub north: f64,
}

/// How a failed tile download affects the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicySetting {
    /// Stop at the first failure.
    #[default]
    Abort,
    /// Contour what could be fetched.
    Skip,
}

impl From<FailurePolicySetting> for FailurePolicy {
    fn from(setting: FailurePolicySetting) -> Self {
        match setting {
            FailurePolicySetting::Abort => FailurePolicy::Abort,
            FailurePolicySetting::Skip => FailurePolicy::Skip,
        }
    }
}

/// Tile source and cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    /// Cache root directory.
    pub directory: PathBuf,
    /// `{z}`/`{x}`/`{y}` tile URL template.
    pub url_template: String,
    /// Tile edge length in pixels.
    pub tile_size: usize,
    /// Concurrent downloads.
    pub max_downloads: usize,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
    /// Download failure handling.
    pub failure_policy: FailurePolicySetting,
    /// Attempts per tile, including the first.
    pub retry_attempts: u32,
    /// Delay before the first retry in milliseconds; doubles per retry.
    pub retry_backoff_ms: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            directory: PathBuf::from("elevation_cache"),
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            tile_size: topoline_dem::cache::DEFAULT_TILE_SIZE,
            max_downloads: topoline_dem::cache::DEFAULT_MAX_DOWNLOADS,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            failure_policy: FailurePolicySetting::default(),
            retry_attempts: retry.max_attempts,
            retry_backoff_ms: retry.initial_backoff.as_millis() as u64,
        }
    }
}

/// Contour level sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LevelSettings {
    /// First level in meters.
    pub start: f64,
    /// Last level in meters (inclusive when hit exactly).
    pub stop: f64,
    /// Spacing in meters.
    pub step: f64,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            start: -10_000.0,
            stop: 10_000.0,
            step: 250.0,
        }
    }
}

fn default_zoom() -> u8 {
    DEFAULT_ZOOM
}

fn default_histogram_bucket() -> f64 {
    100.0
}

/// A complete run description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Area to contour. Defaults to the boundary's bounding box.
    #[serde(default)]
    pub region: Option<RegionConfig>,
    /// Tile zoom level.
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    /// Tile source and cache.
    #[serde(default)]
    pub cache: CacheSettings,
    /// Levels to contour.
    #[serde(default)]
    pub levels: LevelSettings,
    /// Optional clip polygon as `[lng, lat]` pairs.
    #[serde(default)]
    pub boundary: Option<Vec<[f64; 2]>>,
    /// Elevation histogram bucket size in meters.
    #[serde(default = "default_histogram_bucket")]
    pub histogram_bucket: f64,
    /// Processing threads; defaults to one per core.
    #[serde(default)]
    pub threads: Option<usize>,
    /// Where to write paths; stdout when absent.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl RunConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RunnerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a config from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot run.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RunnerError::InvalidConfig(msg));

        if self.zoom > MAX_ZOOM {
            return invalid(format!("zoom {} exceeds maximum {}", self.zoom, MAX_ZOOM));
        }
        if self.region.is_none() && self.boundary.is_none() {
            return invalid("either region or boundary is required".into());
        }
        if let Some(ring) = &self.boundary {
            if ring.len() < 3 {
                return invalid(format!("boundary needs at least 3 points, got {}", ring.len()));
            }
        }
        let levels = &self.levels;
        if !(levels.step > 0.0 && levels.step.is_finite()) {
            return invalid(format!("level step must be positive, got {}", levels.step));
        }
        if levels.stop < levels.start {
            return invalid(format!(
                "level stop {} is below start {}",
                levels.stop, levels.start
            ));
        }
        if !(self.histogram_bucket > 0.0 && self.histogram_bucket.is_finite()) {
            return invalid(format!(
                "histogram_bucket must be positive, got {}",
                self.histogram_bucket
            ));
        }
        if self.threads == Some(0) {
            return invalid("threads must be positive".into());
        }
        validate_template(&self.cache.url_template)?;
        self.cache_config().validate()?;
        Ok(())
    }

    /// Geographic area to cover.
    pub fn bounds(&self) -> Option<GeoBounds> {
        match (&self.region, self.boundary_shape()) {
            (Some(r), _) => Some(GeoBounds::new(r.west, r.south, r.east, r.north)),
            (None, Some(shape)) => shape.bounds(),
            (None, None) => None,
        }
    }

    /// The clip polygon, if any.
    pub fn boundary_shape(&self) -> Option<Shape> {
        self.boundary.as_ref().map(|ring| {
            Shape::from_ring(ring.iter().map(|&[lng, lat]| Point::new(lng, lat)).collect())
        })
    }

    /// Tile cache settings.
    pub fn cache_config(&self) -> CacheConfig {
        let settings = &self.cache;
        CacheConfig {
            directory: settings.directory.clone(),
            tile_size: settings.tile_size,
            max_downloads: settings.max_downloads,
            failure_policy: settings.failure_policy.into(),
            retry: RetryPolicy {
                max_attempts: settings.retry_attempts,
                initial_backoff: Duration::from_millis(settings.retry_backoff_ms),
            },
        }
    }

    /// HTTP request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.cache.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = RunConfig::from_yaml_str(
            "region: { west: 10.0, south: 45.0, east: 10.5, north: 45.5 }\n",
        )
        .unwrap();
        assert_eq!(config.zoom, DEFAULT_ZOOM);
        assert_eq!(config.cache, CacheSettings::default());
        assert_eq!(config.levels, LevelSettings::default());
        assert_eq!(config.histogram_bucket, 100.0);
        assert_eq!(config.bounds(), Some(GeoBounds::new(10.0, 45.0, 10.5, 45.5)));
        assert_eq!(config.cache_config().failure_policy, FailurePolicy::Abort);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
zoom: 9
cache:
  directory: /tmp/tiles
  max_downloads: 2
  failure_policy: skip
  retry_attempts: 5
levels: { start: 0, stop: 1000, step: 100 }
boundary:
  - [1.0, 1.0]
  - [2.0, 1.0]
  - [1.5, 2.0]
threads: 3
output: out.txt
"#;
        let config = RunConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.zoom, 9);
        let cache = config.cache_config();
        assert_eq!(cache.failure_policy, FailurePolicy::Skip);
        assert_eq!(cache.max_downloads, 2);
        assert_eq!(cache.retry.max_attempts, 5);
        assert_eq!(cache.tile_size, 256);
        // Without a region the boundary's box is used.
        assert_eq!(config.bounds(), Some(GeoBounds::new(1.0, 1.0, 2.0, 2.0)));
        assert_eq!(config.output, Some(PathBuf::from("out.txt")));
    }

    #[test]
    fn test_rejects_invalid_configs() {
        let region = "region: { west: 0, south: 0, east: 1, north: 1 }\n";
        for extra in [
            "zoom: 22\n",
            "levels: { step: 0 }\n",
            "levels: { start: 10, stop: 0 }\n",
            "histogram_bucket: -5\n",
            "threads: 0\n",
            "cache: { max_downloads: 0 }\n",
            "cache: { url_template: \"https://example.com/tile.png\" }\n",
            "boundary: [[0, 0], [1, 1]]\n",
        ] {
            let yaml = format!("{region}{extra}");
            assert!(RunConfig::from_yaml_str(&yaml).is_err(), "accepted {extra:?}");
        }
        assert!(RunConfig::from_yaml_str("zoom: 3\n").is_err());
        assert!(RunConfig::from_yaml_str("{region: {west: 0, south: 0, east: 1, north: 1}, colour: red}").is_err());
    }
}

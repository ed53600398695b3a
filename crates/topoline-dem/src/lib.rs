//! # topoline-dem
//!
//! Terrarium elevation tiles: fetching, caching, decoding and stitching.
//!
//! ## Overview
//!
//! Terrarium tiles are 256x256 PNGs on the OpenStreetMap Slippy Map grid whose
//! RGB channels pack elevation with 1/256 m resolution (see [`codec`]). The
//! public tileset lives at
//! `https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png`.
//!
//! A [`TileCache`] keeps downloaded tiles under `{dir}/{z}/{x}/{y}.png`.
//! Callers `ensure` every tile they need, `wait` for the batch, then read
//! tiles back with `get` or `get_stitched`. Stitched tiles carry one extra
//! column and row from their neighbours so contours meet across tile edges.
//!
//! ## Example
//!
//! ```no_run
//! use topoline_dem::{terrarium_cache, CacheConfig, GeoBounds, TileRange};
//!
//! let cache = terrarium_cache(CacheConfig::new("./elevation_cache"))?;
//!
//! let bounds = GeoBounds::new(-122.45, 47.55, -122.25, 47.70);
//! let range = TileRange::covering(&bounds, 12)?;
//! for key in range.with_stitch_neighbors() {
//!     cache.ensure(key)?;
//! }
//! let report = cache.wait()?;
//! println!("downloaded {} tiles", report.fetched);
//!
//! for key in range.iter() {
//!     let tile = cache.get_stitched(key)?;
//!     for line in tile.contour_lines(100.0) {
//!         println!("{} points", line.len());
//!     }
//! }
//! # Ok::<(), topoline_dem::DemError>(())
//! ```

pub mod cache;
mod cancel;
pub mod codec;
pub mod coord;
mod error;
pub mod metrics;
mod shape;
pub mod stitch;
mod tile;
pub mod transport;

pub use cache::{
    terrarium_cache, BatchReport, CacheConfig, DownloadStats, FailurePolicy, RetryPolicy,
    TileCache,
};
pub use cancel::CancelToken;
pub use codec::PixelLayout;
pub use coord::{GeoBounds, GeoMapper, TileKey, TileRange, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM};
pub use error::DemError;
pub use shape::Shape;
pub use tile::Tile;
pub use transport::{HttpTransport, TileTransport, DEFAULT_URL_TEMPLATE};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;

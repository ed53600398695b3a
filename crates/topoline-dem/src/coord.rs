//! Slippy-map tile addressing and pixel/geographic mapping.
//!
//! Tiles follow the OpenStreetMap Slippy Map naming convention:
//! - `z` is the zoom level (0-15 for terrarium tiles)
//! - `x` is the column (0 to 2^z - 1, from west to east)
//! - `y` is the row (0 to 2^z - 1, from north to south)
//!
//! Geographic points are carried as [`Point`]s with `x = longitude` and
//! `y = latitude`, both in degrees.

use crate::{DemError, Result};
use std::f64::consts::PI;
use std::fmt;
use std::path::{Path, PathBuf};
use topoline_contour::Point;

/// Minimum valid zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum zoom level served by the terrarium tileset.
pub const MAX_ZOOM: u8 = 15;

/// Default zoom level.
pub const DEFAULT_ZOOM: u8 = 12;

/// Largest latitude representable in Web Mercator (arctan(sinh(π))).
const MAX_LATITUDE: f64 = 85.051_128_779_806_6;

/// OSM-style tile address (z, x, y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    /// Zoom level.
    pub z: u8,
    /// Column, 0 at 180°W, increasing eastward.
    pub x: u32,
    /// Row, 0 at ~85.05°N, increasing southward.
    pub y: u32,
}

impl TileKey {
    /// Create a tile key, wrapping `x` and `y` modulo 2^z.
    ///
    /// # Panics
    /// Panics if the zoom level is above [`MAX_ZOOM`].
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        assert!(z <= MAX_ZOOM, "zoom {} above maximum {}", z, MAX_ZOOM);
        Self::wrapped(z, i64::from(x), i64::from(y))
    }

    /// Create a tile key, wrapping `x` and `y` modulo 2^z.
    pub fn wrapped(z: u8, x: i64, y: i64) -> Self {
        let n = i64::from(Self::tiles_per_axis(z));
        Self {
            z,
            x: x.rem_euclid(n) as u32,
            y: y.rem_euclid(n) as u32,
        }
    }

    /// The same tile with `x` and `y` wrapped into `0..2^z`.
    ///
    /// Keys built as struct literals may hold any column or row; the cache
    /// and URL expansion always work on the canonical key. Keys with an
    /// unsupported zoom are returned unchanged.
    pub fn canonical(&self) -> Self {
        if self.z > MAX_ZOOM {
            *self
        } else {
            Self::wrapped(self.z, i64::from(self.x), i64::from(self.y))
        }
    }

    /// Number of tiles along each axis at zoom `z`.
    pub fn tiles_per_axis(z: u8) -> u32 {
        1u32 << z
    }

    /// The tile `dx` columns east and `dy` rows south of this one, wrapped.
    pub fn neighbor(&self, dx: i64, dy: i64) -> Self {
        Self::wrapped(self.z, i64::from(self.x) + dx, i64::from(self.y) + dy)
    }

    /// Tile containing a geographic coordinate.
    ///
    /// Uses the OpenStreetMap Slippy Map tiling formula:
    /// - x = floor((lng + 180) / 360 * 2^z)
    /// - y = floor((1 - ln(tan(lat) + sec(lat)) / π) / 2 * 2^z)
    ///
    /// Latitudes beyond the Web Mercator limit are clamped, and coordinates on
    /// the far edge map to the last tile.
    pub fn from_lng_lat(lng: f64, lat: f64, z: u8) -> Result<Self> {
        let (fx, fy) = fractional_tile(lng, lat, z)?;
        let max_coord = Self::tiles_per_axis(z) - 1;
        let x = (fx.floor().max(0.0) as u32).min(max_coord);
        let y = (fy.floor().max(0.0) as u32).min(max_coord);
        Ok(Self { z, x, y })
    }

    /// North-west corner as (lng, lat).
    pub fn nw_corner(&self) -> Point {
        corner(self.z, f64::from(self.x), f64::from(self.y))
    }

    /// South-east corner as (lng, lat).
    pub fn se_corner(&self) -> Point {
        corner(self.z, f64::from(self.x) + 1.0, f64::from(self.y) + 1.0)
    }

    /// Cache file path for this tile: `{dir}/{z}/{x}/{y}.png`.
    pub fn cache_path(&self, cache_dir: &Path) -> PathBuf {
        let key = self.canonical();
        cache_dir
            .join(key.z.to_string())
            .join(key.x.to_string())
            .join(format!("{}.png", key.y))
    }

    /// Expand a `{z}`/`{x}`/`{y}` URL template for this tile.
    pub fn url(&self, template: &str) -> String {
        let key = self.canonical();
        template
            .replace("{z}", &key.z.to_string())
            .replace("{x}", &key.x.to_string())
            .replace("{y}", &key.y.to_string())
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Check a zoom level against the supported range.
pub fn check_zoom(z: u8) -> Result<()> {
    if z > MAX_ZOOM {
        return Err(DemError::InvalidZoomLevel(z));
    }
    Ok(())
}

/// Fractional tile position of a geographic coordinate at zoom `z`.
pub fn fractional_tile(lng: f64, lat: f64, z: u8) -> Result<(f64, f64)> {
    check_zoom(z)?;
    let n = f64::from(TileKey::tiles_per_axis(z));
    let lat_rad = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (lng + 180.0) / 360.0 * n;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n;
    Ok((x, y))
}

fn corner(z: u8, x: f64, y: f64) -> Point {
    let n = f64::from(TileKey::tiles_per_axis(z));
    let lng = x / n * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * y / n)).sinh().atan().to_degrees();
    Point::new(lng, lat)
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Western longitude.
    pub west: f64,
    /// Southern latitude.
    pub south: f64,
    /// Eastern longitude.
    pub east: f64,
    /// Northern latitude.
    pub north: f64,
}

impl GeoBounds {
    /// Create a bounding box, normalising the corner order.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west: west.min(east),
            south: south.min(north),
            east: west.max(east),
            north: south.max(north),
        }
    }

    /// Smallest box containing all `points`, or `None` when there are none.
    pub fn from_points<'a, I: IntoIterator<Item = &'a Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first.x, first.y, first.x, first.y);
        for p in iter {
            bounds.west = bounds.west.min(p.x);
            bounds.east = bounds.east.max(p.x);
            bounds.south = bounds.south.min(p.y);
            bounds.north = bounds.north.max(p.y);
        }
        Some(bounds)
    }
}

/// Inclusive rectangle of tiles at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    /// Zoom level.
    pub z: u8,
    /// Westernmost column.
    pub min_x: u32,
    /// Northernmost row.
    pub min_y: u32,
    /// Easternmost column.
    pub max_x: u32,
    /// Southernmost row.
    pub max_y: u32,
}

impl TileRange {
    /// Tiles covering `bounds`, including the tiles holding the far corners.
    pub fn covering(bounds: &GeoBounds, z: u8) -> Result<Self> {
        let nw = TileKey::from_lng_lat(bounds.west, bounds.north, z)?;
        let se = TileKey::from_lng_lat(bounds.east, bounds.south, z)?;
        Ok(Self {
            z,
            min_x: nw.x,
            min_y: nw.y,
            max_x: se.x,
            max_y: se.y,
        })
    }

    /// Number of tiles in the range.
    pub fn len(&self) -> usize {
        (self.max_x - self.min_x + 1) as usize * (self.max_y - self.min_y + 1) as usize
    }

    /// Whether the range holds no tiles. Always false for a valid range.
    pub fn is_empty(&self) -> bool {
        self.max_x < self.min_x || self.max_y < self.min_y
    }

    /// Tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = TileKey> + '_ {
        (self.min_y..=self.max_y)
            .flat_map(move |y| (self.min_x..=self.max_x).map(move |x| TileKey { z: self.z, x, y }))
    }

    /// Tiles in the range plus the east, south and south-east neighbours a
    /// stitched tile needs, wrapped and deduplicated.
    pub fn with_stitch_neighbors(&self) -> Vec<TileKey> {
        let mut keys: Vec<TileKey> = self
            .iter()
            .flat_map(|key| [key, key.neighbor(1, 0), key.neighbor(0, 1), key.neighbor(1, 1)])
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys
    }
}

/// Linear mapping between a tile's pixel space and geographic space.
///
/// Pixel `(0, 0)` is the tile's north-west corner and `(tile_size, tile_size)`
/// its south-east corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoMapper {
    nw: Point,
    se: Point,
    tile_size: f64,
}

impl GeoMapper {
    /// Mapper for `key` rendered at `tile_size` pixels per side.
    pub fn for_tile(key: TileKey, tile_size: usize) -> Self {
        Self {
            nw: key.nw_corner(),
            se: key.se_corner(),
            tile_size: tile_size as f64,
        }
    }

    /// Pixel coordinate to (lng, lat).
    pub fn to_geo(&self, pixel: Point) -> Point {
        Point::new(
            self.nw.x + pixel.x / self.tile_size * (self.se.x - self.nw.x),
            self.nw.y + pixel.y / self.tile_size * (self.se.y - self.nw.y),
        )
    }

    /// (lng, lat) to pixel coordinate.
    pub fn to_pixel(&self, geo: Point) -> Point {
        Point::new(
            (geo.x - self.nw.x) / (self.se.x - self.nw.x) * self.tile_size,
            (geo.y - self.nw.y) / (self.se.y - self.nw.y) * self.tile_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn contains(key: &TileKey, lng: f64, lat: f64) -> bool {
        let (nw, se) = (key.nw_corner(), key.se_corner());
        lng >= nw.x && lng <= se.x && lat <= nw.y && lat >= se.y
    }

    #[test]
    fn test_tile_key_equator() {
        let key = TileKey::from_lng_lat(0.0, 0.0, 12).unwrap();
        // x=2048 is the tile just east of the prime meridian, y=2048 just
        // south of the equator.
        assert_eq!(key, TileKey::new(12, 2048, 2048));
    }

    #[test]
    fn test_tile_key_roundtrip() {
        let test_points = [
            (-122.3321, 47.6062), // Seattle
            (-74.0060, 40.7128),  // New York
            (-0.1278, 51.5074),   // London
            (151.2093, -33.8688), // Sydney
            (0.0, 0.0),           // Null Island
        ];

        for (lng, lat) in test_points {
            let key = TileKey::from_lng_lat(lng, lat, 12).unwrap();
            assert!(contains(&key, lng, lat), "({lng}, {lat}) not in {key}");
        }
    }

    #[test]
    fn test_far_edge_maps_to_last_tile() {
        let key = TileKey::from_lng_lat(180.0, -90.0, 3).unwrap();
        assert_eq!(key, TileKey::new(3, 7, 7));
    }

    #[test]
    fn test_invalid_zoom() {
        assert!(matches!(
            TileKey::from_lng_lat(0.0, 0.0, 16),
            Err(DemError::InvalidZoomLevel(16))
        ));
        assert!(TileKey::from_lng_lat(0.0, 0.0, 0).is_ok());
    }

    #[test]
    fn test_wrapped() {
        assert_eq!(TileKey::wrapped(2, 4, -1), TileKey::new(2, 0, 3));
        assert_eq!(TileKey::new(1, 1, 1).neighbor(1, 1), TileKey::new(1, 0, 0));
    }

    #[test]
    fn test_out_of_range_keys_wrap() {
        assert_eq!(TileKey::new(1, 2, 0), TileKey::new(1, 0, 0));
        assert_eq!(TileKey::new(2, 9, 4), TileKey::new(2, 1, 0));

        let literal = TileKey { z: 1, x: 5, y: 0 };
        assert_eq!(literal.canonical(), TileKey::new(1, 1, 0));
        assert_eq!(
            literal.cache_path(Path::new("cache")),
            PathBuf::from("cache/1/1/0.png")
        );
        assert_eq!(literal.url("t/{z}/{x}/{y}.png"), "t/1/1/0.png");

        let bad_zoom = TileKey { z: 20, x: 5, y: 0 };
        assert_eq!(bad_zoom.canonical(), bad_zoom);
    }

    #[test]
    fn test_corners() {
        let key = TileKey::new(1, 0, 0);
        assert_abs_diff_eq!(key.nw_corner().x, -180.0);
        assert_abs_diff_eq!(key.nw_corner().y, MAX_LATITUDE, epsilon = 1e-9);
        assert_abs_diff_eq!(key.se_corner().x, 0.0);
        assert_abs_diff_eq!(key.se_corner().y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tile_url() {
        let key = TileKey::new(12, 655, 1407);
        assert_eq!(
            key.url("https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png"),
            "https://s3.amazonaws.com/elevation-tiles-prod/terrarium/12/655/1407.png"
        );
    }

    #[test]
    fn test_cache_path() {
        let key = TileKey::new(12, 655, 1407);
        let path = key.cache_path(Path::new("./elevation_cache"));
        assert_eq!(path, PathBuf::from("./elevation_cache/12/655/1407.png"));
    }

    #[test]
    fn test_range_covering_is_inclusive() {
        let a = TileKey::new(10, 300, 400);
        let b = TileKey::new(10, 302, 401);
        // Points strictly inside the corner tiles.
        let nw = a.nw_corner();
        let se = b.se_corner();
        let bounds = GeoBounds::new(nw.x + 1e-3, se.y + 1e-3, se.x - 1e-3, nw.y - 1e-3);

        let range = TileRange::covering(&bounds, 10).unwrap();
        assert_eq!((range.min_x, range.min_y, range.max_x, range.max_y), (300, 400, 302, 401));
        assert_eq!(range.len(), 6);
        assert_eq!(range.iter().count(), 6);
        assert_eq!(range.iter().next(), Some(a));
    }

    #[test]
    fn test_stitch_neighbors() {
        let range = TileRange { z: 4, min_x: 2, min_y: 3, max_x: 3, max_y: 4 };
        let keys = range.with_stitch_neighbors();
        // 2x2 range grows to 3x3.
        assert_eq!(keys.len(), 9);
        assert!(keys.contains(&TileKey::new(4, 4, 5)));
    }

    #[test]
    fn test_geo_mapper_roundtrip() {
        let key = TileKey::new(8, 41, 89);
        let mapper = GeoMapper::for_tile(key, 256);

        let nw = mapper.to_geo(Point::new(0.0, 0.0));
        assert_abs_diff_eq!(nw.x, key.nw_corner().x, epsilon = 1e-12);
        assert_abs_diff_eq!(nw.y, key.nw_corner().y, epsilon = 1e-12);
        let se = mapper.to_geo(Point::new(256.0, 256.0));
        assert_abs_diff_eq!(se.x, key.se_corner().x, epsilon = 1e-12);
        assert_abs_diff_eq!(se.y, key.se_corner().y, epsilon = 1e-12);

        let pixel = Point::new(17.25, 200.5);
        let back = mapper.to_pixel(mapper.to_geo(pixel));
        assert_abs_diff_eq!(back.x, pixel.x, epsilon = 1e-9);
        assert_abs_diff_eq!(back.y, pixel.y, epsilon = 1e-9);
    }
}

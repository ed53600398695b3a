//! Decoded elevation tiles and their contour products.

use crate::{DemError, GeoMapper, Result, Shape, TileKey};
use topoline_contour::{contour, join, ElevationGrid, Mask, Path, Point, Segment};

/// An elevation grid for one tile, with its value range and optional
/// boundary mask.
///
/// The grid is either the bare `T x T` tile or the stitched `(T + 1) x (T + 1)`
/// grid; pixel `(T, T)` then lies on the south-east corner of the tile.
#[derive(Debug, Clone)]
pub struct Tile {
    key: TileKey,
    tile_size: usize,
    grid: ElevationGrid,
    min_elevation: f64,
    max_elevation: f64,
    mask: Option<Mask>,
}

impl Tile {
    /// Wrap a grid for `key`, where the tile itself spans `tile_size` pixels.
    pub fn new(key: TileKey, tile_size: usize, grid: ElevationGrid) -> Self {
        let (min_elevation, max_elevation) = grid.min_max();
        Self {
            key,
            tile_size,
            grid,
            min_elevation,
            max_elevation,
            mask: None,
        }
    }

    /// Tile address.
    pub fn key(&self) -> TileKey {
        self.key
    }

    /// Pixels per tile side.
    pub fn tile_size(&self) -> usize {
        self.tile_size
    }

    /// Elevation samples.
    pub fn grid(&self) -> &ElevationGrid {
        &self.grid
    }

    /// Lowest sample in meters.
    pub fn min_elevation(&self) -> f64 {
        self.min_elevation
    }

    /// Highest sample in meters.
    pub fn max_elevation(&self) -> f64 {
        self.max_elevation
    }

    /// Boundary mask, if one was applied.
    pub fn mask(&self) -> Option<&Mask> {
        self.mask.as_ref()
    }

    /// Pixel/geographic mapping for this tile.
    pub fn mapper(&self) -> GeoMapper {
        GeoMapper::for_tile(self.key, self.tile_size)
    }

    /// Use `mask` for the masked operations. It must match the grid size.
    pub fn set_mask(&mut self, mask: Mask) -> Result<()> {
        if (mask.width(), mask.height()) != (self.grid.width(), self.grid.height()) {
            return Err(DemError::Format {
                key: Some(self.key),
                reason: format!(
                    "mask is {}x{}, grid is {}x{}",
                    mask.width(),
                    mask.height(),
                    self.grid.width(),
                    self.grid.height()
                ),
            });
        }
        self.mask = Some(mask);
        Ok(())
    }

    /// Rasterize geographic boundary shapes into this tile's mask.
    ///
    /// The mask has the grid's dimensions, so stitched samples borrowed from
    /// neighbours are masked by the same boundary.
    pub fn mask_shapes(&mut self, shapes: &[Shape]) {
        let mapper = self.mapper();
        let rings: Vec<Vec<Point>> = shapes
            .iter()
            .flat_map(Shape::rings)
            .map(|ring| ring.iter().map(|&p| mapper.to_pixel(p)).collect())
            .collect();
        self.mask = Some(Mask::rasterize(self.grid.width(), self.grid.height(), &rings));
    }

    /// Whether `level` lies within the tile's elevation range.
    pub fn spans_level(&self, level: f64) -> bool {
        level >= self.min_elevation && level <= self.max_elevation
    }

    /// Contour segments at `level` in pixel coordinates, clipped to the mask
    /// when there is one.
    pub fn masked_segments(&self, level: f64) -> Vec<Segment> {
        if !self.spans_level(level) {
            return Vec::new();
        }
        let mut segments = contour::segments(&self.grid, level);
        if let Some(mask) = &self.mask {
            mask.retain_segments(&mut segments);
        }
        segments
    }

    /// Contour paths at `level` in (lng, lat), ignoring the mask.
    pub fn contour_lines(&self, level: f64) -> Vec<Path> {
        if !self.spans_level(level) {
            return Vec::new();
        }
        self.to_geo_paths(&contour::segments(&self.grid, level))
    }

    /// Contour paths at `level` in (lng, lat), clipped to the mask.
    pub fn masked_contour_lines(&self, level: f64) -> Vec<Path> {
        self.to_geo_paths(&self.masked_segments(level))
    }

    /// Copy of the grid with out-of-mask samples set to `min_elevation - 1`.
    ///
    /// Without a mask the copy equals the grid.
    pub fn masked_elevation(&self) -> Result<ElevationGrid> {
        let sentinel = self.min_elevation - 1.0;
        let grid = ElevationGrid::from_fn(self.grid.width(), self.grid.height(), |x, y| {
            match &self.mask {
                Some(mask) if !mask.is_opaque(x, y) => sentinel,
                _ => self.grid.get(x, y),
            }
        })?;
        Ok(grid)
    }

    /// Samples inside the mask, limited to the tile's own `T x T` area so
    /// stitched borders are not counted twice across a region.
    pub fn masked_samples(&self) -> impl Iterator<Item = f64> + '_ {
        let width = self.grid.width().min(self.tile_size);
        let height = self.grid.height().min(self.tile_size);
        (0..height)
            .flat_map(move |y| (0..width).map(move |x| (x, y)))
            .filter(move |&(x, y)| self.mask.as_ref().map_or(true, |m| m.is_opaque(x, y)))
            .map(move |(x, y)| self.grid.get(x, y))
    }

    fn to_geo_paths(&self, segments: &[Segment]) -> Vec<Path> {
        let mapper = self.mapper();
        join::join_segments(segments)
            .iter()
            .map(|path| path.map(|p| mapper.to_geo(p)))
            .collect()
    }
}

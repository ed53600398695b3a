//! Terrarium elevation encoding.
//!
//! Each pixel packs an elevation into 24 bits with 1/256 m resolution:
//!
//! ```text
//! elevation = r * 256 + g + b / 256 - 32768
//! ```

use crate::{DemError, Result, TileKey};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::fmt;
use std::io::Cursor;
use topoline_contour::ElevationGrid;

/// Offset subtracted from the packed value so that sea level sits mid-range.
pub const TERRARIUM_OFFSET: f64 = 32768.0;

/// Lowest encodable elevation in meters.
pub const MIN_ELEVATION: f64 = -TERRARIUM_OFFSET;

/// Highest encodable elevation in meters.
pub const MAX_ELEVATION: f64 = 65536.0 - TERRARIUM_OFFSET - 1.0 / 256.0;

/// Channel layout of a raw pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelLayout {
    /// Three bytes per pixel.
    Rgb,
    /// Four bytes per pixel; alpha is ignored.
    Rgba,
}

impl PixelLayout {
    /// Bytes per pixel.
    pub const fn channels(self) -> usize {
        match self {
            PixelLayout::Rgb => 3,
            PixelLayout::Rgba => 4,
        }
    }
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PixelLayout::Rgb => "RGB",
            PixelLayout::Rgba => "RGBA",
        })
    }
}

/// Decode one pixel to meters.
#[inline]
pub fn decode_pixel(r: u8, g: u8, b: u8) -> f64 {
    f64::from(r) * 256.0 + f64::from(g) + f64::from(b) / 256.0 - TERRARIUM_OFFSET
}

/// Encode meters as the nearest representable pixel, clamping to the
/// encodable range.
pub fn encode_elevation(meters: f64) -> [u8; 3] {
    let packed = ((meters + TERRARIUM_OFFSET) * 256.0)
        .round()
        .clamp(0.0, f64::from((1u32 << 24) - 1)) as u32;
    [(packed >> 16) as u8, (packed >> 8) as u8, packed as u8]
}

/// Decode a row-major pixel buffer into an elevation grid.
///
/// Fails with [`DemError::Format`] if the buffer length does not match the
/// dimensions.
pub fn decode(layout: PixelLayout, width: usize, height: usize, bytes: &[u8]) -> Result<ElevationGrid> {
    let channels = layout.channels();
    let expected = width * height * channels;
    if bytes.len() != expected {
        return Err(DemError::Format {
            key: None,
            reason: format!(
                "{width}x{height} {layout} needs {expected} bytes, got {}",
                bytes.len()
            ),
        });
    }

    let data = bytes
        .chunks_exact(channels)
        .map(|px| decode_pixel(px[0], px[1], px[2]))
        .collect();
    Ok(ElevationGrid::new(width, height, data)?)
}

/// Decode a terrarium PNG.
///
/// RGB and RGBA images are read directly; any other color type is converted
/// to 8-bit RGB first.
pub fn decode_png(key: TileKey, bytes: &[u8]) -> Result<ElevationGrid> {
    let image = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|source| DemError::Decode { key, source })?;

    let (width, height) = (image.width() as usize, image.height() as usize);
    let grid = match image {
        DynamicImage::ImageRgb8(rgb) => decode(PixelLayout::Rgb, width, height, rgb.as_raw()),
        DynamicImage::ImageRgba8(rgba) => decode(PixelLayout::Rgba, width, height, rgba.as_raw()),
        other => decode(PixelLayout::Rgb, width, height, other.to_rgb8().as_raw()),
    };

    grid.map_err(|err| match err {
        DemError::Format { reason, .. } => DemError::Format {
            key: Some(key),
            reason,
        },
        other => other,
    })
}

/// Encode a grid as a terrarium RGB PNG.
pub fn encode_png(grid: &ElevationGrid) -> Result<Vec<u8>> {
    let image = RgbImage::from_fn(grid.width() as u32, grid.height() as u32, |x, y| {
        image::Rgb(encode_elevation(grid.get(x as usize, y as usize)))
    });

    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .map_err(DemError::Encode)?;
    Ok(bytes.into_inner())
}

//! Error types for the DEM crate.

use crate::TileKey;
use thiserror::Error;

/// Errors that can occur while acquiring and decoding elevation tiles.
#[derive(Debug, Error)]
pub enum DemError {
    /// Pixel data does not match its declared dimensions.
    #[error("malformed tile data{}: {reason}", key_suffix(.key))]
    Format {
        /// Tile the data belongs to, when known.
        key: Option<TileKey>,
        /// What was wrong with it.
        reason: String,
    },

    /// Failed to download tile from the remote server.
    #[error("failed to fetch tile {key}: {reason}")]
    Fetch {
        /// Tile being fetched.
        key: TileKey,
        /// Reason for failure.
        reason: String,
    },

    /// Reading or writing a cache entry failed.
    #[error("cache I/O error for tile {key}: {source}")]
    CacheIo {
        /// Tile whose entry was being accessed.
        key: TileKey,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Tile is not present in the cache.
    #[error("tile {0} is not cached")]
    NotFound(TileKey),

    /// Cached file is not a readable PNG.
    #[error("tile {key} could not be decoded: {source}")]
    Decode {
        /// Tile being decoded.
        key: TileKey,
        /// Underlying image error.
        #[source]
        source: image::ImageError,
    },

    /// Work for the tile was cancelled before it completed.
    #[error("tile {0} was cancelled")]
    Cancelled(TileKey),

    /// Cache or transport configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid zoom level.
    #[error("invalid zoom level {0} (must be 0-15)")]
    InvalidZoomLevel(u8),

    /// Grid construction failed.
    #[error(transparent)]
    Contour(#[from] topoline_contour::ContourError),

    /// Encoding an image failed.
    #[error("image encode error: {0}")]
    Encode(#[source] image::ImageError),

    /// HTTP client setup failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// I/O error outside a specific cache entry.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DemError {
    /// The tile this error refers to, if any.
    pub fn key(&self) -> Option<TileKey> {
        match self {
            DemError::Format { key, .. } => *key,
            DemError::Fetch { key, .. }
            | DemError::CacheIo { key, .. }
            | DemError::Decode { key, .. } => Some(*key),
            DemError::NotFound(key) | DemError::Cancelled(key) => Some(*key),
            _ => None,
        }
    }

    /// Whether another attempt at the same fetch could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DemError::Fetch { .. })
    }
}

fn key_suffix(key: &Option<TileKey>) -> String {
    key.map(|k| format!(" for tile {k}")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message_includes_key() {
        let err = DemError::Format {
            key: Some(TileKey::new(3, 1, 2)),
            reason: "bad".into(),
        };
        assert_eq!(err.to_string(), "malformed tile data for tile 3/1/2: bad");

        let err = DemError::Format {
            key: None,
            reason: "bad".into(),
        };
        assert_eq!(err.to_string(), "malformed tile data: bad");
    }

    #[test]
    fn test_error_key() {
        let key = TileKey::new(2, 1, 1);
        assert_eq!(DemError::NotFound(key).key(), Some(key));
        assert_eq!(DemError::InvalidZoomLevel(40).key(), None);
        assert!(DemError::Fetch { key, reason: "HTTP 500".into() }.is_retryable());
        assert!(!DemError::Cancelled(key).is_retryable());
    }
}

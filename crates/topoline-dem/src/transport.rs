//! Fetching raw tile bytes from a tile source.

use crate::{DemError, Result, TileKey};
use std::time::Duration;
use tracing::debug;

/// AWS Open Data terrarium tiles.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://s3.amazonaws.com/elevation-tiles-prod/terrarium/{z}/{x}/{y}.png";

/// Default HTTP request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Source of encoded tile images.
///
/// Implementations must be callable from several download workers at once.
pub trait TileTransport: Send + Sync {
    /// Fetch the encoded image for `key`.
    ///
    /// Failures should be reported as [`DemError::Fetch`] so the cache can
    /// retry them.
    fn fetch(&self, key: TileKey) -> Result<Vec<u8>>;
}

/// Check that a URL template names all three tile placeholders.
pub fn validate_template(template: &str) -> Result<()> {
    if template.trim().is_empty() {
        return Err(DemError::InvalidConfig("tile URL template is empty".into()));
    }
    for placeholder in ["{z}", "{x}", "{y}"] {
        if !template.contains(placeholder) {
            return Err(DemError::InvalidConfig(format!(
                "tile URL template {template:?} is missing {placeholder}"
            )));
        }
    }
    Ok(())
}

/// Blocking HTTP transport over a `{z}/{x}/{y}` URL template.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    template: String,
}

impl HttpTransport {
    /// Create a transport for `template` with the given request timeout.
    pub fn new(template: impl Into<String>, timeout: Duration) -> Result<Self> {
        let template = template.into();
        validate_template(&template)?;

        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self { client, template })
    }

    /// Transport for the public terrarium tileset.
    pub fn terrarium() -> Result<Self> {
        Self::new(DEFAULT_URL_TEMPLATE, DEFAULT_TIMEOUT)
    }

    /// The URL template.
    pub fn template(&self) -> &str {
        &self.template
    }
}

impl TileTransport for HttpTransport {
    fn fetch(&self, key: TileKey) -> Result<Vec<u8>> {
        let url = key.url(&self.template);
        debug!(%key, %url, "requesting tile");

        let fetch_err = |reason: String| DemError::Fetch { key, reason };

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| fetch_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(fetch_err(format!("HTTP {}", response.status())));
        }

        let bytes = response.bytes().map_err(|e| fetch_err(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

//! Static map rendering.
//!
//! The renderer fetches a map image centred on the aircraft with a marker on
//! the exact coordinate, and the image is written to a local file for the
//! publisher to attach. There is no fallback image: any failure is fatal.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::{Credentials, MapConfig};
use crate::error::{Error, Result};
use crate::http::{check_status, HttpClient};
use crate::position::Position;

const SERVICE: &str = "Google Static Maps";

/// Produces a map image for a position.
#[async_trait]
pub trait MapRenderer: Send + Sync {
    /// Render a map centred on `position` and return the encoded image.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is missing or the renderer fails.
    async fn render(&self, position: Position) -> Result<Vec<u8>>;
}

/// The fixed framing of every rendered map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapStyle {
    /// Zoom level.
    pub zoom: u8,
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Region bias.
    pub region: String,
    /// Marker colour.
    pub marker_color: String,
}

impl From<&MapConfig> for MapStyle {
    fn from(config: &MapConfig) -> Self {
        Self {
            zoom: config.zoom,
            width: config.width,
            height: config.height,
            region: config.region.clone(),
            marker_color: config.marker_color.clone(),
        }
    }
}

impl MapStyle {
    /// Query parameters for a map of `position`, without the API key.
    ///
    /// The coordinate appears twice: once as the centre and once in the marker.
    #[must_use]
    pub fn query(&self, position: Position) -> Vec<(&'static str, String)> {
        let point = position.to_query_value();
        vec![
            ("center", point.clone()),
            ("zoom", self.zoom.to_string()),
            ("size", format!("{}x{}", self.width, self.height)),
            ("region", self.region.clone()),
            ("markers", format!("color:{}|{point}", self.marker_color)),
        ]
    }
}

/// Google Static Maps client.
#[derive(Debug, Clone)]
pub struct StaticMapClient {
    http: HttpClient,
    endpoint: String,
    style: MapStyle,
    credentials: Credentials,
}

impl StaticMapClient {
    /// Create a client. The API key is only looked up when rendering.
    #[must_use]
    pub fn new(
        http: HttpClient,
        endpoint: impl Into<String>,
        style: MapStyle,
        credentials: Credentials,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            style,
            credentials,
        }
    }
}

#[async_trait]
impl MapRenderer for StaticMapClient {
    async fn render(&self, position: Position) -> Result<Vec<u8>> {
        let key = self.credentials.maps_api_key()?;
        let mut query = self.style.query(position);
        debug!(endpoint = %self.endpoint, ?query, "requesting static map");
        query.push(("key", key.to_string()));

        let response = self
            .http
            .inner()
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await?;
        let bytes = check_status(SERVICE, response).await?.bytes().await?;
        if bytes.is_empty() {
            return Err(Error::unexpected(SERVICE, "empty image body"));
        }
        Ok(bytes.to_vec())
    }
}

/// A map image persisted to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapImage {
    /// Where the image was written.
    pub path: PathBuf,
    /// Size of the image in bytes.
    pub size: usize,
}

/// Render a map of `position` and write it to `path`, replacing any old image.
///
/// # Errors
///
/// Returns an error if rendering fails or the file cannot be written.
pub async fn render_to_file(
    renderer: &dyn MapRenderer,
    position: Position,
    path: &Path,
) -> Result<MapImage> {
    let image = renderer.render(position).await?;
    write_image(path, &image).await?;

    info!(path = %path.display(), bytes = image.len(), "map image saved");
    Ok(MapImage {
        path: path.to_path_buf(),
        size: image.len(),
    })
}

async fn write_image(path: &Path, image: &[u8]) -> Result<()> {
    let map_write = |source| Error::MapWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(map_write)?;
        }
    }
    tokio::fs::write(path, image).await.map_err(map_write)
}

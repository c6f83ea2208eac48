//! Background tile layer: tile addressing, loading and caching.
//!
//! Tiles are addressed by `(z, x, y)` in the usual slippy-map scheme. Loading is asynchronous
//! and driven by the host's executor. A tile that fails to load is reported and skipped; the
//! rest of the layer is not affected.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use quick_cache::sync::Cache;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::ContainerSize;
use crate::view::{MapViewState, MercatorPoint, TILE_SIZE};

const DEFAULT_CACHE_CAPACITY: usize = 512;

/// Index of a tile in the slippy-map scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    /// Zoom level.
    pub z: u8,
    /// Column, counted eastwards from the antimeridian.
    pub x: u32,
    /// Row, counted southwards from the north edge.
    pub y: u32,
}

impl TileIndex {
    /// Creates a new index.
    pub const fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Where the background imagery comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileSource {
    /// URL template with `{z}`, `{x}`, `{y}` and optionally `{s}` placeholders.
    pub url_template: String,
    /// Values substituted for `{s}`, chosen per tile.
    #[serde(default)]
    pub subdomains: Vec<String>,
    /// Attribution text shown with the map.
    #[serde(default)]
    pub attribution: String,
    /// Highest zoom level the source serves.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
}

fn default_max_zoom() -> u8 {
    19
}

impl TileSource {
    /// OpenStreetMap standard tiles.
    pub fn osm() -> Self {
        Self {
            url_template: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".into(),
            subdomains: vec![],
            attribution: "© OpenStreetMap contributors".into(),
            max_zoom: default_max_zoom(),
        }
    }

    /// Builds the URL of the tile.
    pub fn url_for(&self, index: TileIndex) -> Result<String, TileLoadError> {
        let mut vars = HashMap::new();
        vars.insert("z".to_string(), index.z.to_string());
        vars.insert("x".to_string(), index.x.to_string());
        vars.insert("y".to_string(), index.y.to_string());
        if !self.subdomains.is_empty() {
            let pick = (index.x as usize + index.y as usize) % self.subdomains.len();
            vars.insert("s".to_string(), self.subdomains[pick].clone());
        }

        strfmt::strfmt(&self.url_template, &vars)
            .map_err(|err| TileLoadError::InvalidUrl(err.to_string()))
    }
}

impl Default for TileSource {
    fn default() -> Self {
        Self::osm()
    }
}

/// Returns the indices of all tiles visible in a container showing the given view.
///
/// Columns wrap around the antimeridian; rows outside the world are skipped.
pub fn tiles_for_view(view: &MapViewState, size: ContainerSize) -> Vec<TileIndex> {
    if size.is_empty() {
        return vec![];
    }

    let z = view.zoom.min(30);
    let tiles_per_side = 1i64 << z;
    let world = view.world_size();
    let center = MercatorPoint::project(view.center);
    let (cx, cy) = (center.x * world, center.y * world);
    let half_w = f64::from(size.width) / 2.0;
    let half_h = f64::from(size.height) / 2.0;

    let x_min = ((cx - half_w) / TILE_SIZE).floor() as i64;
    let x_max = ((cx + half_w) / TILE_SIZE).ceil() as i64 - 1;
    let y_min = (((cy - half_h) / TILE_SIZE).floor() as i64).max(0);
    let y_max = ((((cy + half_h) / TILE_SIZE).ceil() as i64) - 1).min(tiles_per_side - 1);

    let columns = (x_max - x_min + 1).clamp(0, tiles_per_side);
    let mut out = Vec::new();
    for y in y_min..=y_max {
        for x in x_min..x_min + columns {
            out.push(TileIndex::new(
                z,
                x.rem_euclid(tiles_per_side) as u32,
                y as u32,
            ));
        }
    }

    out
}

/// Error that can occur when loading a tile.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TileLoadError {
    /// Could not get a response from the tile server.
    #[error("network error: {0}")]
    Network(String),
    /// Tile with the given index does not exist.
    #[error("tile does not exist")]
    DoesNotExist,
    /// Response body is not usable tile imagery.
    #[error("failed to decode tile")]
    Decoding,
    /// URL template could not be formatted.
    #[error("invalid tile url: {0}")]
    InvalidUrl(String),
}

/// Loads raw tile imagery.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait TileLoader: Send + Sync {
    /// Load the tile with the given index.
    async fn load(&self, index: TileIndex) -> Result<Bytes, TileLoadError>;
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl<T: TileLoader + ?Sized> TileLoader for Arc<T> {
    async fn load(&self, index: TileIndex) -> Result<Bytes, TileLoadError> {
        (**self).load(index).await
    }
}

/// Loads tiles over HTTP from a [`TileSource`].
#[cfg(all(feature = "web-tiles", not(target_arch = "wasm32")))]
pub struct WebTileLoader {
    client: reqwest::Client,
    source: TileSource,
}

#[cfg(all(feature = "web-tiles", not(target_arch = "wasm32")))]
impl WebTileLoader {
    /// Creates a loader for the source using the given HTTP client.
    pub fn new(client: reqwest::Client, source: TileSource) -> Self {
        Self { client, source }
    }
}

#[cfg(all(feature = "web-tiles", not(target_arch = "wasm32")))]
#[async_trait::async_trait]
impl TileLoader for WebTileLoader {
    async fn load(&self, index: TileIndex) -> Result<Bytes, TileLoadError> {
        let url = self.source.url_for(index)?;
        log::trace!("Loading tile {index} from url {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| TileLoadError::Network(err.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(TileLoadError::DoesNotExist);
        }

        let response = response
            .error_for_status()
            .map_err(|err| TileLoadError::Network(err.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| TileLoadError::Network(err.to_string()))?;

        if bytes.is_empty() {
            return Err(TileLoadError::Decoding);
        }

        log::trace!("Tile {index} loaded. Byte size: {}", bytes.len());
        Ok(bytes)
    }
}

/// Outcome of one [`TileLayer::load`] call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TileLoadReport {
    /// Tiles fetched from the loader.
    pub loaded: Vec<TileIndex>,
    /// Tiles served from the cache.
    pub cached: Vec<TileIndex>,
    /// Tiles that failed, with the reason.
    pub failed: Vec<(TileIndex, TileLoadError)>,
}

impl TileLoadReport {
    /// Returns true if every requested tile is available.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Background layer of the map. Holds the tile loader and a cache of loaded tiles.
pub struct TileLayer {
    source: TileSource,
    loader: Box<dyn TileLoader>,
    tiles: Cache<TileIndex, Bytes>,
}

impl TileLayer {
    /// Creates a layer loading tiles with the given loader.
    pub fn new(source: TileSource, loader: impl TileLoader + 'static) -> Self {
        Self {
            source,
            loader: Box::new(loader),
            tiles: Cache::new(DEFAULT_CACHE_CAPACITY),
        }
    }

    /// Source of the layer imagery.
    pub fn source(&self) -> &TileSource {
        &self.source
    }

    /// Returns the tile if it was loaded before.
    pub fn get(&self, index: TileIndex) -> Option<Bytes> {
        self.tiles.get(&index)
    }

    /// Loads all given tiles that are not in the cache yet.
    ///
    /// Loads run concurrently. A failed tile is logged and reported, it does not prevent the
    /// others from loading.
    pub async fn load(&self, indices: impl IntoIterator<Item = TileIndex>) -> TileLoadReport {
        let mut report = TileLoadReport::default();
        let mut to_load = vec![];
        for index in indices {
            if index.z > self.source.max_zoom {
                report.failed.push((index, TileLoadError::DoesNotExist));
            } else if self.tiles.get(&index).is_some() {
                report.cached.push(index);
            } else if !to_load.contains(&index) {
                to_load.push(index);
            }
        }

        let results = futures::future::join_all(to_load.into_iter().map(|index| async move {
            (index, self.loader.load(index).await)
        }))
        .await;

        for (index, result) in results {
            match result {
                Ok(bytes) => {
                    self.tiles.insert(index, bytes);
                    report.loaded.push(index);
                }
                Err(err) => {
                    log::warn!("Failed to load tile {index}: {err}");
                    report.failed.push((index, err));
                }
            }
        }

        log::debug!(
            "Tile load finished: {} loaded, {} cached, {} failed",
            report.loaded.len(),
            report.cached.len(),
            report.failed.len()
        );
        report
    }
}

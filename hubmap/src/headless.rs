//! In-memory map backend.
//!
//! [`HeadlessBackend`] keeps the layer stack and camera of each instance in memory and loads the
//! background tiles through a [`TileLayer`]. It is used for rendering without a windowing system
//! and for inspecting what the controller asked the widget to draw.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::backend::{LayerId, LayerSpec, MapBackend, MapInstance, MarkerOverlay, RouteOverlay};
use crate::container::{ContainerHost, ContainerSize};
use crate::controller::InstanceId;
use crate::error::MapError;
use crate::tiles::{tiles_for_view, TileLayer, TileLoadReport, TileLoader};
use crate::view::MapViewState;

/// Backend creating [`HeadlessMap`] instances.
#[derive(Default, Clone)]
pub struct HeadlessBackend {
    loader: Option<Arc<dyn TileLoader>>,
    created: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl HeadlessBackend {
    /// Creates a backend whose instances do not load tiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend whose instances load tiles with the given loader.
    pub fn with_loader(loader: impl TileLoader + 'static) -> Self {
        let loader: Arc<dyn TileLoader> = Arc::new(loader);
        Self {
            loader: Some(loader),
            ..Self::default()
        }
    }

    /// Number of instances created so far.
    pub fn created_instances(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of instances created and not yet destroyed.
    pub fn live_instances(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl MapBackend for HeadlessBackend {
    type Instance = HeadlessMap;

    fn create_instance(
        &mut self,
        id: InstanceId,
        container: &dyn ContainerHost,
        view: &MapViewState,
    ) -> Result<HeadlessMap, MapError> {
        let size = container.size();
        if size.is_empty() {
            return Err(MapError::ContainerNotReady(container.id()));
        }

        self.created.fetch_add(1, Ordering::SeqCst);
        self.live.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "Created headless map {id} in container {} ({}x{})",
            container.id(),
            size.width,
            size.height
        );

        Ok(HeadlessMap {
            id,
            layers: vec![],
            next_layer_id: 0,
            view: *view,
            size,
            loader: self.loader.clone(),
            tiles: None,
            live: self.live.clone(),
        })
    }
}

/// Map instance that records its layers and camera.
pub struct HeadlessMap {
    id: InstanceId,
    layers: Vec<(LayerId, LayerSpec)>,
    next_layer_id: u64,
    view: MapViewState,
    size: ContainerSize,
    loader: Option<Arc<dyn TileLoader>>,
    tiles: Option<TileLayer>,
    live: Arc<AtomicUsize>,
}

impl HeadlessMap {
    /// Layers from bottom to top.
    pub fn layers(&self) -> &[(LayerId, LayerSpec)] {
        &self.layers
    }

    /// Number of background tile layers.
    pub fn tile_layer_count(&self) -> usize {
        self.layers.iter().filter(|(_, l)| !l.is_overlay()).count()
    }

    /// Number of markers and route lines.
    pub fn overlay_count(&self) -> usize {
        self.layers.iter().filter(|(_, l)| l.is_overlay()).count()
    }

    /// Markers from bottom to top.
    pub fn markers(&self) -> impl Iterator<Item = &MarkerOverlay> {
        self.layers.iter().filter_map(|(_, layer)| match layer {
            LayerSpec::Marker(marker) => Some(marker),
            _ => None,
        })
    }

    /// Route lines from bottom to top.
    pub fn routes(&self) -> impl Iterator<Item = &RouteOverlay> {
        self.layers.iter().filter_map(|(_, layer)| match layer {
            LayerSpec::Route(route) => Some(route),
            _ => None,
        })
    }

    /// Current camera.
    pub fn view(&self) -> MapViewState {
        self.view
    }

    /// Size of the container the map renders into.
    pub fn size(&self) -> ContainerSize {
        self.size
    }

    /// Background layer, if one was added and the backend has a tile loader.
    pub fn tile_layer(&self) -> Option<&TileLayer> {
        self.tiles.as_ref()
    }

    /// Loads the background tiles visible with the current camera.
    pub async fn load_visible_tiles(&self) -> TileLoadReport {
        match &self.tiles {
            Some(tiles) => tiles.load(tiles_for_view(&self.view, self.size)).await,
            None => TileLoadReport::default(),
        }
    }
}

impl MapInstance for HeadlessMap {
    fn id(&self) -> InstanceId {
        self.id
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<LayerId, MapError> {
        if let (LayerSpec::Tiles(source), Some(loader)) = (&layer, &self.loader) {
            self.tiles = Some(TileLayer::new(source.clone(), loader.clone()));
        }

        self.next_layer_id += 1;
        let id = LayerId(self.next_layer_id);
        log::trace!("Map {}: added {id}", self.id);
        self.layers.push((id, layer));
        Ok(id)
    }

    fn remove_layer(&mut self, layer: LayerId) {
        let Some(position) = self.layers.iter().position(|(id, _)| *id == layer) else {
            log::trace!("Map {}: {layer} is not present", self.id);
            return;
        };

        let (_, removed) = self.layers.remove(position);
        if !removed.is_overlay() && self.tile_layer_count() == 0 {
            self.tiles = None;
        }
        log::trace!("Map {}: removed {layer}", self.id);
    }

    fn set_view(&mut self, view: &MapViewState, size: ContainerSize) {
        self.view = *view;
        self.size = size;
    }

    fn destroy(self) {
        log::debug!("Destroying headless map {}", self.id);
    }
}

impl Drop for HeadlessMap {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

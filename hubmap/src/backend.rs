//! Seam between the controller and the widget library that actually draws the map.

use std::fmt;

use crate::container::{ContainerHost, ContainerSize};
use crate::controller::InstanceId;
use crate::entity::EntityRole;
use crate::error::MapError;
use crate::geo::GeoPoint;
use crate::style::{MarkerStyle, RouteStyle};
use crate::tiles::TileSource;
use crate::view::MapViewState;

/// Identifier a [`MapInstance`] assigns to each layer it holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub u64);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer {}", self.0)
    }
}

/// Marker drawn for a located entity.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOverlay {
    /// Id of the entity the marker represents.
    pub entity_id: String,
    /// Tooltip text.
    pub label: String,
    /// Marker position.
    pub position: GeoPoint,
    /// Role of the entity.
    pub role: EntityRole,
    /// Appearance resolved from the role.
    pub style: MarkerStyle,
}

/// Line drawn for a route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOverlay {
    /// Valid points of the route, at least two.
    pub points: Vec<GeoPoint>,
    /// Line appearance.
    pub style: RouteStyle,
}

/// Layer to add to a map instance.
#[derive(Debug, Clone, PartialEq)]
pub enum LayerSpec {
    /// Background imagery.
    Tiles(TileSource),
    /// Entity marker.
    Marker(MarkerOverlay),
    /// Route polyline.
    Route(RouteOverlay),
}

impl LayerSpec {
    /// Returns true for overlay layers, i.e. everything except the background.
    pub fn is_overlay(&self) -> bool {
        !matches!(self, LayerSpec::Tiles(_))
    }
}

/// A live map widget bound to one container.
pub trait MapInstance {
    /// Id the instance was created with.
    fn id(&self) -> InstanceId;

    /// Adds a layer on top of the existing ones.
    fn add_layer(&mut self, layer: LayerSpec) -> Result<LayerId, MapError>;

    /// Removes a layer. Unknown ids are ignored.
    fn remove_layer(&mut self, layer: LayerId);

    /// Moves the camera.
    fn set_view(&mut self, view: &MapViewState, size: ContainerSize);

    /// Releases the widget and everything it holds.
    fn destroy(self)
    where
        Self: Sized;
}

/// Widget library that creates map instances.
pub trait MapBackend {
    /// Instance type produced by the backend.
    type Instance: MapInstance;

    /// Creates a widget inside the container.
    ///
    /// The controller only calls this for renderable containers.
    fn create_instance(
        &mut self,
        id: InstanceId,
        container: &dyn ContainerHost,
        view: &MapViewState,
    ) -> Result<Self::Instance, MapError>;
}

//! Hubmap draws a logistics network on an interactive map: hubs and shipments as role-styled
//! markers, routes as lines, over a raster tile background.
//!
//! The central type is [`MapLifecycleController`]. It owns exactly one map widget per container
//! and keeps the widget in sync with the data the application supplies:
//!
//! * [`MapLifecycleController::initialize`] creates the widget once. If the container is not laid
//!   out yet, creation waits for the container's ready signal.
//! * [`MapLifecycleController::reconcile`] replaces the drawn overlays with new input and moves
//!   the camera so that all valid points are visible.
//! * [`MapLifecycleController::teardown`] destroys the widget and releases the container.
//!
//! The widget library is abstracted by [`MapBackend`]. The crate ships [`HeadlessBackend`],
//! which keeps everything in memory and loads background tiles through a [`TileLoader`].
//!
//! ```ignore
//! use std::sync::Arc;
//! use hubmap::*;
//!
//! let mount = Arc::new(MountPoint::attached(ContainerSize::new(800, 600)));
//! let mut controller = MapLifecycleController::new(HeadlessBackend::new(), ControllerConfig::default());
//! controller.initialize(mount.clone(), MapViewState::default())?;
//! controller.reconcile(&[LocatedEntity::hub("ber", 52.52, 13.40)], &[], MapViewState::default())?;
//! controller.teardown(mount.as_ref());
//! ```

pub mod backend;
pub mod config;
pub mod container;
pub mod controller;
pub mod entity;
pub mod error;
pub mod geo;
pub mod headless;
pub mod style;
pub mod tiles;
pub mod view;

pub use backend::{LayerId, LayerSpec, MapBackend, MapInstance, MarkerOverlay, RouteOverlay};
pub use config::ControllerConfig;
pub use container::{ContainerHost, ContainerId, ContainerSize, MountPoint, ReadySignal};
pub use controller::{
    CameraDecision, ControllerState, InitOutcome, InstanceId, MapLifecycleController,
    ReconcileOutcome, ReconcileSummary, SharedContainer,
};
pub use entity::{EntityRole, LocatedEntity, RouteSegment};
pub use error::MapError;
pub use geo::{GeoBounds, GeoPoint};
pub use headless::{HeadlessBackend, HeadlessMap};
pub use style::{Color, MarkerStyle, MarkerTheme, RouteStyle};
#[cfg(all(feature = "web-tiles", not(target_arch = "wasm32")))]
pub use tiles::WebTileLoader;
pub use tiles::{TileIndex, TileLayer, TileLoadError, TileLoadReport, TileLoader, TileSource};
pub use view::{fit_bounds, BoundsError, MapViewState};

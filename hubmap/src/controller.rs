//! Lifecycle of the map widget: create once, reconcile overlays, destroy.
//!
//! The controller is a small state machine:
//!
//! ```text
//! Unbound --initialize--> Ready --reconcile*--> Ready --teardown--> Unbound
//!    \                      ^
//!     +--initialize--> Pending (container not renderable yet)
//! ```
//!
//! It keeps its own record of the layers it created (the tile layer and one entry per overlay)
//! and never inspects the widget's layer stack to find out what is drawn.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::backend::{LayerId, LayerSpec, MapBackend, MapInstance, MarkerOverlay, RouteOverlay};
use crate::config::ControllerConfig;
use crate::container::{ContainerHost, ContainerId, ContainerSize, ReadySignal, ReadyState};
use crate::entity::{LocatedEntity, RouteSegment};
use crate::error::MapError;
use crate::geo::{GeoBounds, GeoPoint};
use crate::view::{fit_bounds, BoundsError, MapViewState};

static INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Container handle shared between the hosting page and the controller.
pub type SharedContainer = Arc<dyn ContainerHost>;

/// Process-unique id of a map instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

impl InstanceId {
    /// Returns a new id.
    pub fn next() -> Self {
        Self(INSTANCE_COUNTER.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map-{}", self.0)
    }
}

/// Externally visible state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// No widget exists.
    Unbound,
    /// Waiting for the container to become renderable.
    Pending,
    /// Widget exists and accepts overlays.
    Ready,
}

/// Result of [`MapLifecycleController::initialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// A new instance was created.
    Ready(InstanceId),
    /// The container already had an instance from this controller; nothing was created.
    AlreadyReady(InstanceId),
    /// The container is not renderable yet. Creation happens in
    /// [`MapLifecycleController::poll_pending`] once the container reports readiness.
    Deferred,
}

/// How the camera was positioned by a reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CameraDecision {
    /// Fitted to the bounds of all valid points.
    FitBounds,
    /// Centered on the only point, keeping the zoom.
    SinglePoint,
    /// Set to the fallback view.
    #[default]
    Fallback,
}

/// What a reconcile pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Markers drawn after the pass.
    pub markers: usize,
    /// Route lines drawn after the pass.
    pub routes: usize,
    /// Overlays added by the pass.
    pub added: usize,
    /// Overlays removed by the pass.
    pub removed: usize,
    /// Overlays left in place because their input did not change.
    pub kept: usize,
    /// Points excluded for being out of range or not finite.
    pub rejected_points: usize,
    /// Entities dropped because an earlier entity had the same id.
    pub duplicate_ids: usize,
    /// Routes not drawn for having fewer than two valid points.
    pub skipped_routes: usize,
    /// Overlays the backend failed to add.
    pub failed: usize,
    /// Camera positioning applied.
    pub camera: CameraDecision,
}

/// Result of [`MapLifecycleController::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Overlays and camera were updated.
    Applied(ReconcileSummary),
    /// Initialization is still pending; the pass replaces any earlier queued pass and is
    /// applied as soon as the widget exists.
    Queued,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum OverlayKey {
    Marker(String),
    Route(usize),
}

struct DrawnOverlay {
    layer: LayerId,
    spec: LayerSpec,
}

#[derive(Default)]
struct OwnedLayers {
    tile_layer: Option<LayerId>,
    overlays: HashMap<OverlayKey, DrawnOverlay>,
}

struct QueuedPass {
    entities: Vec<LocatedEntity>,
    routes: Vec<RouteSegment>,
    fallback: MapViewState,
}

struct Pending {
    container: SharedContainer,
    view: MapViewState,
    signal: ReadySignal,
    queued: Option<QueuedPass>,
}

struct Bound<I> {
    container: SharedContainer,
    instance: I,
    layers: OwnedLayers,
    view: MapViewState,
}

enum State<I> {
    Unbound,
    Pending(Pending),
    Ready(Bound<I>),
}

/// Owns one map widget bound to one container and keeps its overlays in sync with input data.
pub struct MapLifecycleController<B: MapBackend> {
    backend: B,
    config: ControllerConfig,
    state: State<B::Instance>,
}

impl<B: MapBackend> MapLifecycleController<B> {
    /// Creates an unbound controller.
    pub fn new(backend: B, config: ControllerConfig) -> Self {
        Self {
            backend,
            config,
            state: State::Unbound,
        }
    }

    /// Creates the widget in the container, or returns the existing one.
    ///
    /// If the container is not renderable yet the controller waits for its ready signal; call
    /// [`Self::poll_pending`] on every tick of the host's event loop to complete the creation.
    pub fn initialize(
        &mut self,
        container: SharedContainer,
        initial_view: MapViewState,
    ) -> Result<InitOutcome, MapError> {
        match &self.state {
            State::Ready(bound) if bound.container.id() == container.id() => {
                log::debug!(
                    "Container {} already has map {}, initialization skipped",
                    container.id(),
                    bound.instance.id()
                );
                return Ok(InitOutcome::AlreadyReady(bound.instance.id()));
            }
            State::Pending(pending) if pending.container.id() == container.id() => {
                log::debug!("Initialization of container {} is already pending", container.id());
                return Ok(InitOutcome::Deferred);
            }
            State::Ready(Bound {
                container: current,
                ..
            })
            | State::Pending(Pending {
                container: current,
                ..
            }) => {
                return Err(usage_error(format!(
                    "controller is attached to container {}, cannot initialize container {}",
                    current.id(),
                    container.id()
                )));
            }
            State::Unbound => {}
        }

        if let Some(other) = container.bound_instance() {
            return Err(usage_error(format!(
                "container {} is already bound to map {other}",
                container.id()
            )));
        }

        let initial_view = if initial_view.center.is_valid() {
            initial_view
        } else {
            log::warn!(
                "Initial view center {:?} is invalid, using the default view",
                initial_view.center
            );
            MapViewState::default()
        };

        if !container.is_renderable() {
            self.defer(container, initial_view, None);
            return Ok(InitOutcome::Deferred);
        }

        match self.bind(container, initial_view, None)? {
            Some(id) => Ok(InitOutcome::Ready(id)),
            None => Ok(InitOutcome::Deferred),
        }
    }

    /// Completes a deferred initialization once the container has reported readiness.
    ///
    /// Returns true if the controller is ready after the call. A pending initialization whose
    /// container was discarded is dropped.
    pub fn poll_pending(&mut self) -> Result<bool, MapError> {
        let mut pending = match std::mem::replace(&mut self.state, State::Unbound) {
            State::Pending(pending) => pending,
            other => {
                let ready = matches!(other, State::Ready(_));
                self.state = other;
                return Ok(ready);
            }
        };

        match pending.signal.poll() {
            ReadyState::Waiting => {
                self.state = State::Pending(pending);
                Ok(false)
            }
            ReadyState::Discarded => {
                log::warn!(
                    "Container {} was discarded before it became ready, initialization dropped",
                    pending.container.id()
                );
                Ok(false)
            }
            ReadyState::Ready if !pending.container.is_renderable() => {
                log::debug!(
                    "Container {} signalled readiness but is not renderable, waiting again",
                    pending.container.id()
                );
                pending.signal = pending.container.ready_signal();
                self.state = State::Pending(pending);
                Ok(false)
            }
            ReadyState::Ready => {
                let Pending {
                    container,
                    view,
                    queued,
                    ..
                } = pending;
                Ok(self.bind(container, view, queued)?.is_some())
            }
        }
    }

    /// Replaces the drawn overlays with the given input and positions the camera.
    ///
    /// Invalid points are excluded, never fatal. Calling this before [`Self::initialize`] is a
    /// usage error.
    pub fn reconcile(
        &mut self,
        entities: &[LocatedEntity],
        routes: &[RouteSegment],
        fallback_view: MapViewState,
    ) -> Result<ReconcileOutcome, MapError> {
        match &mut self.state {
            State::Unbound => Err(usage_error(
                "reconcile called on a controller without a map; call initialize first",
            )),
            State::Pending(pending) => {
                log::debug!(
                    "Map for container {} is not created yet, queueing reconcile pass",
                    pending.container.id()
                );
                pending.queued = Some(QueuedPass {
                    entities: entities.to_vec(),
                    routes: routes.to_vec(),
                    fallback: fallback_view,
                });
                Ok(ReconcileOutcome::Queued)
            }
            State::Ready(bound) => Ok(ReconcileOutcome::Applied(apply_pass(
                bound,
                &self.config,
                entities,
                routes,
                fallback_view,
            ))),
        }
    }

    /// Destroys the widget bound to the container, or cancels its pending initialization.
    ///
    /// Does nothing if no widget is bound.
    pub fn teardown(&mut self, container: &dyn ContainerHost) {
        match std::mem::replace(&mut self.state, State::Unbound) {
            State::Unbound => {
                log::debug!("Teardown of container {}: no map bound", container.id());
            }
            State::Pending(pending) if pending.container.id() == container.id() => {
                log::info!(
                    "Cancelled pending map initialization for container {}",
                    container.id()
                );
            }
            State::Ready(bound) if bound.container.id() == container.id() => {
                destroy_bound(bound);
            }
            other => {
                log::warn!(
                    "Teardown of container {} ignored, the controller is attached to another one",
                    container.id()
                );
                self.state = other;
            }
        }
    }

    /// Current state of the lifecycle.
    pub fn state(&self) -> ControllerState {
        match self.state {
            State::Unbound => ControllerState::Unbound,
            State::Pending(_) => ControllerState::Pending,
            State::Ready(_) => ControllerState::Ready,
        }
    }

    /// Container the controller is attached to, ready or pending.
    pub fn container_id(&self) -> Option<ContainerId> {
        match &self.state {
            State::Unbound => None,
            State::Pending(pending) => Some(pending.container.id()),
            State::Ready(bound) => Some(bound.container.id()),
        }
    }

    /// Camera of the live widget.
    pub fn view(&self) -> Option<MapViewState> {
        match &self.state {
            State::Ready(bound) => Some(bound.view),
            _ => None,
        }
    }

    /// The live widget.
    pub fn instance(&self) -> Option<&B::Instance> {
        match &self.state {
            State::Ready(bound) => Some(&bound.instance),
            _ => None,
        }
    }

    /// Number of overlays the controller has drawn.
    pub fn overlay_count(&self) -> usize {
        match &self.state {
            State::Ready(bound) => bound.layers.overlays.len(),
            _ => 0,
        }
    }

    /// Returns true if the background layer is present.
    pub fn has_tile_layer(&self) -> bool {
        match &self.state {
            State::Ready(bound) => bound.layers.tile_layer.is_some(),
            _ => false,
        }
    }

    /// Configuration of the controller.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Widget library used to create instances.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn defer(&mut self, container: SharedContainer, view: MapViewState, queued: Option<QueuedPass>) {
        log::info!(
            "{}, deferring map initialization",
            MapError::ContainerNotReady(container.id())
        );
        let signal = container.ready_signal();
        self.state = State::Pending(Pending {
            container,
            view,
            signal,
            queued,
        });
    }

    /// Creates the widget with its background layer. Returns `None` if the backend found the
    /// container not ready, in which case the controller is pending again.
    fn bind(
        &mut self,
        container: SharedContainer,
        view: MapViewState,
        queued: Option<QueuedPass>,
    ) -> Result<Option<InstanceId>, MapError> {
        if let Some(other) = container.bound_instance() {
            return Err(usage_error(format!(
                "container {} was bound to map {other} while initialization was pending",
                container.id()
            )));
        }

        let id = InstanceId::next();
        let mut instance = match self.backend.create_instance(id, container.as_ref(), &view) {
            Ok(instance) => instance,
            Err(MapError::ContainerNotReady(_)) => {
                self.defer(container, view, queued);
                return Ok(None);
            }
            Err(err) => {
                log::error!("Failed to create map in container {}: {err}", container.id());
                return Err(err);
            }
        };

        let tile_layer = match instance.add_layer(LayerSpec::Tiles(self.config.tile_source.clone()))
        {
            Ok(layer) => layer,
            Err(err) => {
                log::error!("Failed to add tile layer to map {id}: {err}");
                instance.destroy();
                return Err(err);
            }
        };

        instance.set_view(&view, container.size());
        container.set_bound_instance(Some(id));
        log::info!("Map {id} bound to container {}", container.id());

        let mut bound = Bound {
            container,
            instance,
            layers: OwnedLayers {
                tile_layer: Some(tile_layer),
                overlays: HashMap::new(),
            },
            view,
        };

        if let Some(pass) = queued {
            log::debug!("Applying reconcile pass queued during initialization of map {id}");
            apply_pass(
                &mut bound,
                &self.config,
                &pass.entities,
                &pass.routes,
                pass.fallback,
            );
        }

        self.state = State::Ready(bound);
        Ok(Some(id))
    }
}

impl<B: MapBackend> Drop for MapLifecycleController<B> {
    fn drop(&mut self) {
        if let State::Ready(bound) = std::mem::replace(&mut self.state, State::Unbound) {
            destroy_bound(bound);
        }
    }
}

fn usage_error(message: impl Into<String>) -> MapError {
    let err = MapError::UsageOrder(message.into());
    log::warn!("{err}");
    err
}

fn apply_pass<I: MapInstance>(
    bound: &mut Bound<I>,
    config: &ControllerConfig,
    entities: &[LocatedEntity],
    routes: &[RouteSegment],
    fallback: MapViewState,
) -> ReconcileSummary {
    let mut summary = ReconcileSummary::default();
    let mut desired: Vec<(OverlayKey, LayerSpec)> = Vec::with_capacity(entities.len() + routes.len());
    let mut seen_ids = HashSet::new();
    let mut points = vec![];

    for entity in entities {
        if let Err(err) = entity.position.validate() {
            log::debug!("Entity '{}' excluded: {err}", entity.id);
            summary.rejected_points += 1;
            continue;
        }

        if !seen_ids.insert(entity.id.as_str()) {
            log::warn!("Duplicate entity id '{}', keeping the first occurrence", entity.id);
            summary.duplicate_ids += 1;
            continue;
        }

        points.push(entity.position);
        desired.push((
            OverlayKey::Marker(entity.id.clone()),
            LayerSpec::Marker(MarkerOverlay {
                entity_id: entity.id.clone(),
                label: entity.label.clone(),
                position: entity.position,
                role: entity.role,
                style: config.marker_theme.style_for(entity.role),
            }),
        ));
    }

    for (index, route) in routes.iter().enumerate() {
        let rejected = route.points.iter().filter(|p| !p.is_valid()).count();
        if rejected > 0 {
            log::debug!("Route {index}: {rejected} invalid points excluded");
            summary.rejected_points += rejected;
        }

        let valid = route.points.iter().copied().filter(GeoPoint::is_valid);
        points.extend(valid);

        match route.valid_points() {
            Some(valid) => desired.push((
                OverlayKey::Route(index),
                LayerSpec::Route(RouteOverlay {
                    points: valid,
                    style: config.route_style,
                }),
            )),
            None => {
                log::debug!("Route {index} has fewer than two valid points and is not drawn");
                summary.skipped_routes += 1;
            }
        }
    }

    let overlays = &mut bound.layers.overlays;
    let wanted: HashMap<&OverlayKey, &LayerSpec> = desired.iter().map(|(k, v)| (k, v)).collect();
    let stale: Vec<OverlayKey> = overlays
        .iter()
        .filter(|(key, drawn)| wanted.get(key) != Some(&&drawn.spec))
        .map(|(key, _)| key.clone())
        .collect();

    for key in stale {
        if let Some(drawn) = overlays.remove(&key) {
            bound.instance.remove_layer(drawn.layer);
            summary.removed += 1;
        }
    }

    for (key, spec) in desired {
        if overlays.contains_key(&key) {
            summary.kept += 1;
            continue;
        }

        match bound.instance.add_layer(spec.clone()) {
            Ok(layer) => {
                overlays.insert(key, DrawnOverlay { layer, spec });
                summary.added += 1;
            }
            Err(err) => {
                log::warn!("Map {}: failed to draw overlay {key:?}: {err}", bound.instance.id());
                summary.failed += 1;
            }
        }
    }

    summary.markers = overlays
        .keys()
        .filter(|key| matches!(key, OverlayKey::Marker(_)))
        .count();
    summary.routes = overlays.len() - summary.markers;

    let size = bound.container.size();
    let (view, camera) = choose_camera(&points, bound.view, fallback, size, config);
    bound.view = view;
    bound.instance.set_view(&view, size);
    summary.camera = camera;

    log::debug!("Map {} reconciled: {summary:?}", bound.instance.id());
    summary
}

/// Picks the camera for a set of valid points: bounds fit, then single point, then fallback.
fn choose_camera(
    points: &[GeoPoint],
    current: MapViewState,
    fallback: MapViewState,
    size: ContainerSize,
    config: &ControllerConfig,
) -> (MapViewState, CameraDecision) {
    let bounds = match points {
        [] => return (fallback, CameraDecision::Fallback),
        [single] => return (current.with_center(*single), CameraDecision::SinglePoint),
        _ => GeoBounds::from_points(points.iter().copied()),
    };

    let Some(bounds) = bounds else {
        return (fallback, CameraDecision::Fallback);
    };

    match fit_bounds(&bounds, size, config.fit_padding, config.zoom_range()) {
        Ok(view) => (view, CameraDecision::FitBounds),
        Err(BoundsError::Degenerate) => {
            log::debug!(
                "All {} points coincide, centering on them instead of fitting bounds",
                points.len()
            );
            (current.with_center(points[0]), CameraDecision::SinglePoint)
        }
        Err(err) => {
            log::warn!(
                "{}, falling back to the default view",
                MapError::BoundsComputation(err)
            );
            (fallback, CameraDecision::Fallback)
        }
    }
}

fn destroy_bound<I: MapInstance>(bound: Bound<I>) {
    let Bound {
        container,
        mut instance,
        layers,
        ..
    } = bound;
    let id = instance.id();

    for (_, drawn) in layers.overlays {
        instance.remove_layer(drawn.layer);
    }
    if let Some(tile_layer) = layers.tile_layer {
        instance.remove_layer(tile_layer);
    }
    instance.destroy();

    if container.bound_instance() == Some(id) {
        container.set_bound_instance(None);
    }
    log::info!("Map {id} destroyed, container {} unbound", container.id());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MountPoint;
    use crate::entity::EntityRole;
    use crate::headless::{HeadlessBackend, HeadlessMap};

    const SIZE: ContainerSize = ContainerSize::new(800, 600);

    fn controller() -> MapLifecycleController<HeadlessBackend> {
        MapLifecycleController::new(HeadlessBackend::new(), ControllerConfig::default())
    }

    fn ready(controller: &mut MapLifecycleController<HeadlessBackend>) -> Arc<MountPoint> {
        let mount = Arc::new(MountPoint::attached(SIZE));
        controller
            .initialize(mount.clone(), MapViewState::default())
            .unwrap();
        mount
    }

    fn map(controller: &MapLifecycleController<HeadlessBackend>) -> &HeadlessMap {
        controller.instance().unwrap()
    }

    fn applied(outcome: ReconcileOutcome) -> ReconcileSummary {
        match outcome {
            ReconcileOutcome::Applied(summary) => summary,
            ReconcileOutcome::Queued => panic!("pass was queued"),
        }
    }

    #[test]
    fn changed_entity_is_redrawn_and_unchanged_is_kept() {
        let mut controller = controller();
        ready(&mut controller);
        let a = LocatedEntity::hub("a", 10.0, 10.0);
        let b = LocatedEntity::hub("b", 20.0, 20.0);
        controller
            .reconcile(&[a.clone(), b.clone()], &[], MapViewState::default())
            .unwrap();

        let moved = LocatedEntity::hub("b", 21.0, 21.0);
        let summary = applied(
            controller
                .reconcile(&[a, moved], &[], MapViewState::default())
                .unwrap(),
        );
        assert_eq!(summary.kept, 1);
        assert_eq!(summary.removed, 1);
        assert_eq!(summary.added, 1);
        let positions: Vec<_> = map(&controller).markers().map(|m| m.position).collect();
        assert!(positions.contains(&GeoPoint::new(21.0, 21.0)));
        assert!(!positions.contains(&GeoPoint::new(20.0, 20.0)));
    }

    #[test]
    fn role_change_restyles_marker() {
        let mut controller = controller();
        ready(&mut controller);
        let mut entity = LocatedEntity::new("s", "Shipment", GeoPoint::new(1.0, 1.0), EntityRole::Origin);
        controller
            .reconcile(&[entity.clone()], &[], MapViewState::default())
            .unwrap();
        entity.role = EntityRole::Current;
        controller
            .reconcile(&[entity], &[], MapViewState::default())
            .unwrap();

        let markers: Vec<_> = map(&controller).markers().collect();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].role, EntityRole::Current);
        assert_eq!(
            markers[0].style,
            ControllerConfig::default()
                .marker_theme
                .style_for(EntityRole::Current)
        );
    }

    #[test]
    fn duplicate_ids_keep_first() {
        let mut controller = controller();
        ready(&mut controller);
        let summary = applied(
            controller
                .reconcile(
                    &[
                        LocatedEntity::hub("x", 1.0, 1.0),
                        LocatedEntity::hub("x", 2.0, 2.0),
                    ],
                    &[],
                    MapViewState::default(),
                )
                .unwrap(),
        );
        assert_eq!(summary.duplicate_ids, 1);
        assert_eq!(summary.markers, 1);
        assert_eq!(summary.camera, CameraDecision::SinglePoint);
        assert_eq!(
            map(&controller).markers().next().unwrap().position,
            GeoPoint::new(1.0, 1.0)
        );
    }

    #[test]
    fn coincident_points_center_on_them() {
        let mut controller = controller();
        ready(&mut controller);
        let zoom_before = controller.view().unwrap().zoom;
        let summary = applied(
            controller
                .reconcile(
                    &[
                        LocatedEntity::hub("a", 5.0, 5.0),
                        LocatedEntity::hub("b", 5.0, 5.0),
                    ],
                    &[],
                    MapViewState::default(),
                )
                .unwrap(),
        );
        assert_eq!(summary.camera, CameraDecision::SinglePoint);
        assert_eq!(
            controller.view(),
            Some(MapViewState::new(GeoPoint::new(5.0, 5.0), zoom_before))
        );
    }

    #[test]
    fn inverted_zoom_config_falls_back_instead_of_panicking() {
        let mut controller = MapLifecycleController::new(
            HeadlessBackend::new(),
            ControllerConfig {
                min_zoom: 10,
                max_zoom: 3,
                ..ControllerConfig::default()
            },
        );
        ready(&mut controller);
        let fallback = MapViewState::new(GeoPoint::new(35.0, 139.0), 6);
        let summary = applied(
            controller
                .reconcile(
                    &[
                        LocatedEntity::hub("a", 1.0, 1.0),
                        LocatedEntity::hub("b", 2.0, 2.0),
                    ],
                    &[],
                    fallback,
                )
                .unwrap(),
        );
        assert_eq!(summary.camera, CameraDecision::Fallback);
        assert_eq!(controller.view(), Some(fallback));
    }

    #[test]
    fn cramped_container_falls_back() {
        let mut controller = MapLifecycleController::new(
            HeadlessBackend::new(),
            ControllerConfig {
                fit_padding: 500.0,
                ..ControllerConfig::default()
            },
        );
        ready(&mut controller);
        let fallback = MapViewState::new(GeoPoint::new(-33.0, 151.0), 4);
        let summary = applied(
            controller
                .reconcile(
                    &[
                        LocatedEntity::hub("a", 1.0, 1.0),
                        LocatedEntity::hub("b", 2.0, 2.0),
                    ],
                    &[],
                    fallback,
                )
                .unwrap(),
        );
        assert_eq!(summary.camera, CameraDecision::Fallback);
        assert_eq!(controller.view(), Some(fallback));
        assert_eq!(summary.markers, 2);
    }

    #[test]
    fn routes_need_two_valid_points() {
        let mut controller = controller();
        ready(&mut controller);
        let routes = [
            RouteSegment::new([GeoPoint::new(1.0, 1.0), GeoPoint::new(2.0, 2.0)]),
            RouteSegment::new([GeoPoint::new(3.0, 3.0), GeoPoint::new(f64::NAN, 3.0)]),
        ];
        let summary = applied(
            controller
                .reconcile(&[], &routes, MapViewState::default())
                .unwrap(),
        );
        assert_eq!(summary.routes, 1);
        assert_eq!(summary.skipped_routes, 1);
        assert_eq!(summary.rejected_points, 1);
        assert_eq!(summary.camera, CameraDecision::FitBounds);
        assert_eq!(map(&controller).routes().count(), 1);
    }

    #[test]
    fn initialize_on_other_container_is_usage_error() {
        let mut controller = controller();
        ready(&mut controller);
        let other = Arc::new(MountPoint::attached(SIZE));
        let err = controller
            .initialize(other.clone(), MapViewState::default())
            .unwrap_err();
        assert!(matches!(err, MapError::UsageOrder(_)));
        assert_eq!(other.bound_instance(), None);
        assert_eq!(controller.backend().created_instances(), 1);
    }

    #[test]
    fn container_bound_by_another_controller_is_refused() {
        let mut first = controller();
        let mount = ready(&mut first);
        let mut second = controller();
        let err = second
            .initialize(mount.clone(), MapViewState::default())
            .unwrap_err();
        assert!(matches!(err, MapError::UsageOrder(_)));
        assert_eq!(second.state(), ControllerState::Unbound);
    }

    #[test]
    fn teardown_of_foreign_container_is_ignored() {
        let mut controller = controller();
        ready(&mut controller);
        let other = MountPoint::attached(SIZE);
        controller.teardown(&other);
        assert_eq!(controller.state(), ControllerState::Ready);
    }

    #[test]
    fn invalid_initial_center_is_replaced() {
        let mut controller = controller();
        let mount = Arc::new(MountPoint::attached(SIZE));
        controller
            .initialize(mount, MapViewState::new(GeoPoint::new(f64::NAN, 0.0), 3))
            .unwrap();
        assert_eq!(controller.view(), Some(MapViewState::default()));
    }

    #[test]
    fn dropping_controller_releases_container() {
        let backend = HeadlessBackend::new();
        let mut controller =
            MapLifecycleController::new(backend.clone(), ControllerConfig::default());
        let mount = ready(&mut controller);
        assert!(mount.bound_instance().is_some());
        drop(controller);
        assert_eq!(mount.bound_instance(), None);
        assert_eq!(backend.live_instances(), 0);
    }

    struct BrokenBackend;

    impl MapBackend for BrokenBackend {
        type Instance = HeadlessMap;

        fn create_instance(
            &mut self,
            _id: InstanceId,
            _container: &dyn ContainerHost,
            _view: &MapViewState,
        ) -> Result<HeadlessMap, MapError> {
            Err(MapError::Backend("no rendering context".into()))
        }
    }

    #[test]
    fn backend_failure_is_reported_and_leaves_container_free() {
        let mut controller = MapLifecycleController::new(BrokenBackend, ControllerConfig::default());
        let mount = Arc::new(MountPoint::attached(SIZE));
        let err = controller
            .initialize(mount.clone(), MapViewState::default())
            .unwrap_err();
        assert_eq!(err, MapError::Backend("no rendering context".into()));
        assert_eq!(controller.state(), ControllerState::Unbound);
        assert_eq!(mount.bound_instance(), None);
    }
}

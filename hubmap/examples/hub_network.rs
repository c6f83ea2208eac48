//! Draws a small hub network with a shipment in transit and loads the visible background tiles.
//!
//! Run with: cargo run --example hub_network [config.json]
//! Set RUST_LOG=debug to see what the controller does.

use std::sync::Arc;

use anyhow::Context;
use hubmap::{
    ContainerSize, ControllerConfig, EntityRole, GeoPoint, HeadlessBackend, LocatedEntity,
    MapLifecycleController, MapViewState, MountPoint, ReconcileOutcome, RouteSegment,
    WebTileLoader,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config file {path}"))?;
            ControllerConfig::from_json(&json)?
        }
        None => ControllerConfig::default(),
    };

    let loader = WebTileLoader::new(reqwest::Client::new(), config.tile_source.clone());
    let backend = HeadlessBackend::with_loader(loader);
    let mut controller = MapLifecycleController::new(backend, config);

    // The page has not been laid out yet.
    let mount = Arc::new(MountPoint::new());
    let outcome = controller.initialize(mount.clone(), MapViewState::default())?;
    log::info!("Initialize: {outcome:?}");

    let hubs = [
        LocatedEntity::hub("rotterdam", 51.92, 4.48),
        LocatedEntity::hub("hamburg", 53.55, 9.99),
        LocatedEntity::hub("warsaw", 52.23, 21.01),
        LocatedEntity::new(
            "shipment-17",
            "Shipment 17",
            GeoPoint::new(52.9, 13.1),
            EntityRole::Current,
        ),
        // Broken upstream record, skipped by the controller.
        LocatedEntity::hub("unknown", f64::NAN, 0.0),
    ];
    let route = RouteSegment::new([
        GeoPoint::new(51.92, 4.48),
        GeoPoint::new(53.55, 9.99),
        GeoPoint::new(52.9, 13.1),
    ]);

    let outcome = controller.reconcile(&hubs, &[route], MapViewState::default())?;
    assert_eq!(outcome, ReconcileOutcome::Queued);

    mount.attach(ContainerSize::new(1024, 768));
    controller.poll_pending()?;

    let map = controller
        .instance()
        .context("map was not created after the container became ready")?;
    let view = map.view();
    log::info!(
        "Map shows {} overlays around {:.2}, {:.2} at zoom {}",
        map.overlay_count(),
        view.center.lat,
        view.center.lng,
        view.zoom
    );

    let report = map.load_visible_tiles().await;
    log::info!(
        "Tiles: {} loaded, {} failed",
        report.loaded.len(),
        report.failed.len()
    );
    for (index, err) in &report.failed {
        log::warn!("Tile {index}: {err}");
    }

    controller.teardown(mount.as_ref());
    Ok(())
}

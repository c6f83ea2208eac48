//! Camera state and bounds fitting in Web Mercator.

use std::f64::consts::PI;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::container::ContainerSize;
use crate::geo::{GeoBounds, GeoPoint};

/// Size of a map tile in pixels. Zoom level `z` spans `TILE_SIZE * 2^z` pixels around the globe.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude at which Web Mercator maps to a square world.
pub const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// Camera state of a map: center and integer zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapViewState {
    /// Geographic point in the middle of the container.
    pub center: GeoPoint,
    /// Zoom level, 0 shows the whole world in one tile.
    pub zoom: u8,
}

impl MapViewState {
    /// Creates a new view state.
    pub const fn new(center: GeoPoint, zoom: u8) -> Self {
        Self { center, zoom }
    }

    /// Returns the same view centered on another point.
    pub fn with_center(self, center: GeoPoint) -> Self {
        Self { center, ..self }
    }

    /// Size of the whole world in pixels at the view's zoom level.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * f64::from(1u32 << self.zoom.min(31))
    }

    /// Position of the point in container pixels, with the origin at the top-left corner.
    pub fn to_screen(&self, point: GeoPoint, size: ContainerSize) -> (f64, f64) {
        let world = self.world_size();
        let center = MercatorPoint::project(self.center);
        let p = MercatorPoint::project(point);
        (
            (p.x - center.x) * world + f64::from(size.width) / 2.0,
            (p.y - center.y) * world + f64::from(size.height) / 2.0,
        )
    }
}

impl Default for MapViewState {
    fn default() -> Self {
        Self::new(GeoPoint::new(20.0, 0.0), 2)
    }
}

/// Point projected to Web Mercator, normalized to the unit square.
///
/// `x` grows eastwards from the antimeridian, `y` grows southwards from the north edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MercatorPoint {
    /// Horizontal coordinate in `0..=1`.
    pub x: f64,
    /// Vertical coordinate in `0..=1`.
    pub y: f64,
}

impl MercatorPoint {
    /// Projects a geographic point. Latitudes beyond the Mercator limit are clamped.
    pub fn project(point: GeoPoint) -> Self {
        let lat = point.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
        Self {
            x: (point.lng + 180.0) / 360.0,
            y: (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0,
        }
    }

    /// Inverse of [`MercatorPoint::project`].
    pub fn unproject(self) -> GeoPoint {
        let lat = (PI * (1.0 - 2.0 * self.y)).sinh().atan().to_degrees();
        GeoPoint::new(lat, self.x * 360.0 - 180.0)
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Reason why the camera could not be fitted to a bounding region.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoundsError {
    /// All points coincide, so there is no area to fit.
    #[error("bounds have zero area")]
    Degenerate,

    /// Projection produced a value that is not a finite number.
    #[error("bounds projection is not finite")]
    NonFinite,

    /// The container minus padding leaves no room for the bounds.
    #[error("container {width}x{height} leaves no room with {padding}px padding")]
    NoRoom {
        /// Container width in pixels.
        width: u32,
        /// Container height in pixels.
        height: u32,
        /// Padding on each side in pixels.
        padding: f64,
    },

    /// The lowest allowed zoom is above the highest.
    #[error("zoom range {min}..={max} is empty")]
    EmptyZoomRange {
        /// Lowest allowed zoom.
        min: u8,
        /// Highest allowed zoom.
        max: u8,
    },
}

/// Computes the view showing the whole bounding region inside a container.
///
/// The chosen zoom is the largest integer level in `zoom_range` at which the projected bounds
/// fit into the container shrunk by `padding` on each side. The center is the middle of the
/// bounds in projected space.
pub fn fit_bounds(
    bounds: &GeoBounds,
    size: ContainerSize,
    padding: f64,
    zoom_range: RangeInclusive<u8>,
) -> Result<MapViewState, BoundsError> {
    if bounds.is_degenerate() {
        return Err(BoundsError::Degenerate);
    }

    let (min_zoom, max_zoom) = (*zoom_range.start(), *zoom_range.end());
    if min_zoom > max_zoom {
        return Err(BoundsError::EmptyZoomRange {
            min: min_zoom,
            max: max_zoom,
        });
    }

    let sw = MercatorPoint::project(bounds.south_west());
    let ne = MercatorPoint::project(bounds.north_east());
    if !sw.is_finite() || !ne.is_finite() {
        return Err(BoundsError::NonFinite);
    }

    let available_width = f64::from(size.width) - 2.0 * padding;
    let available_height = f64::from(size.height) - 2.0 * padding;
    if !(available_width > 0.0 && available_height > 0.0) {
        return Err(BoundsError::NoRoom {
            width: size.width,
            height: size.height,
            padding,
        });
    }

    let dx = ne.x - sw.x;
    let dy = sw.y - ne.y;
    let zoom = axis_zoom(available_width, dx).min(axis_zoom(available_height, dy));
    if !zoom.is_finite() {
        return Err(BoundsError::NonFinite);
    }

    let zoom = zoom
        .floor()
        .clamp(f64::from(min_zoom), f64::from(max_zoom)) as u8;
    let center = MercatorPoint {
        x: (sw.x + ne.x) / 2.0,
        y: (sw.y + ne.y) / 2.0,
    }
    .unproject();

    Ok(MapViewState::new(center, zoom))
}

fn axis_zoom(available: f64, extent: f64) -> f64 {
    if extent <= 0.0 {
        return f64::INFINITY;
    }

    (available / (TILE_SIZE * extent)).log2()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    const SIZE: ContainerSize = ContainerSize::new(800, 600);

    #[test]
    fn projection_round_trips() {
        let point = GeoPoint::new(51.51, 0.13);
        let back = MercatorPoint::project(point).unproject();
        assert_abs_diff_eq!(back.lat, point.lat, epsilon = 1e-9);
        assert_abs_diff_eq!(back.lng, point.lng, epsilon = 1e-9);
    }

    #[test]
    fn projection_clamps_poles() {
        let p = MercatorPoint::project(GeoPoint::new(90.0, 0.0));
        assert!(p.is_finite());
        assert_abs_diff_eq!(p.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn fitted_view_contains_points_with_padding() {
        let points = [GeoPoint::new(37.09, -95.71), GeoPoint::new(51.51, 0.13)];
        let bounds = GeoBounds::from_points(points).unwrap();
        let padding = 50.0;
        let view = fit_bounds(&bounds, SIZE, padding, 0..=18).unwrap();

        for point in points {
            let (x, y) = view.to_screen(point, SIZE);
            assert!(x >= padding - 1e-6 && x <= 800.0 - padding + 1e-6, "x = {x}");
            assert!(y >= padding - 1e-6 && y <= 600.0 - padding + 1e-6, "y = {y}");
        }

        // One more zoom level would no longer fit.
        let closer = MapViewState::new(view.center, view.zoom + 1);
        let (x0, _) = closer.to_screen(points[0], SIZE);
        let (x1, _) = closer.to_screen(points[1], SIZE);
        assert!(x1 - x0 > 800.0 - 2.0 * padding);
    }

    #[test]
    fn zoom_is_clamped_to_range() {
        let bounds =
            GeoBounds::from_points([GeoPoint::new(10.0, 10.0), GeoPoint::new(10.0, 10.000001)])
                .unwrap();
        let view = fit_bounds(&bounds, SIZE, 50.0, 0..=18).unwrap();
        assert_eq!(view.zoom, 18);

        let bounds =
            GeoBounds::from_points([GeoPoint::new(-80.0, -179.0), GeoPoint::new(80.0, 179.0)])
                .unwrap();
        let view = fit_bounds(&bounds, SIZE, 50.0, 2..=18).unwrap();
        assert_eq!(view.zoom, 2);
    }

    #[test]
    fn degenerate_and_cramped_bounds_fail() {
        let p = GeoPoint::new(10.0, 10.0);
        let bounds = GeoBounds::from_points([p, p]).unwrap();
        assert_eq!(
            fit_bounds(&bounds, SIZE, 50.0, 0..=18),
            Err(BoundsError::Degenerate)
        );

        let bounds = GeoBounds::from_points([p, GeoPoint::new(20.0, 20.0)]).unwrap();
        assert_eq!(
            fit_bounds(&bounds, ContainerSize::new(80, 600), 50.0, 0..=18),
            Err(BoundsError::NoRoom {
                width: 80,
                height: 600,
                padding: 50.0
            })
        );
    }

    #[test]
    fn inverted_zoom_range_fails() {
        let bounds =
            GeoBounds::from_points([GeoPoint::new(1.0, 1.0), GeoPoint::new(2.0, 2.0)]).unwrap();
        #[allow(clippy::reversed_empty_ranges)]
        let result = fit_bounds(&bounds, SIZE, 50.0, 10..=3);
        assert_eq!(result, Err(BoundsError::EmptyZoomRange { min: 10, max: 3 }));
    }

    #[test]
    fn screen_position_of_center_is_container_middle() {
        let view = MapViewState::new(GeoPoint::new(10.0, 20.0), 5);
        let (x, y) = view.to_screen(view.center, SIZE);
        assert_abs_diff_eq!(x, 400.0, epsilon = 1e-9);
        assert_abs_diff_eq!(y, 300.0, epsilon = 1e-9);
    }
}

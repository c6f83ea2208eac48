//! Geographic primitives: points and bounding regions.

use serde::{Deserialize, Serialize};

use crate::error::MapError;

/// Latitude range accepted by [`GeoPoint::is_valid`].
pub const LAT_RANGE: std::ops::RangeInclusive<f64> = -90.0..=90.0;
/// Longitude range accepted by [`GeoPoint::is_valid`].
pub const LNG_RANGE: std::ops::RangeInclusive<f64> = -180.0..=180.0;

/// Geographic position in degrees.
///
/// The type does not enforce validity on construction, since the values usually come from
/// upstream data that may be malformed. Use [`GeoPoint::is_valid`] or [`GeoPoint::validate`]
/// before passing the point to a renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    #[serde(alias = "latitude")]
    pub lat: f64,
    /// Longitude in degrees.
    #[serde(alias = "lon", alias = "longitude")]
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a new point. The values are not checked.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns true if both coordinates are finite and within their ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && LAT_RANGE.contains(&self.lat)
            && LNG_RANGE.contains(&self.lng)
    }

    /// Returns the point itself if it is valid.
    pub fn validate(self) -> Result<Self, MapError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(MapError::InvalidGeoPoint {
                lat: self.lat,
                lng: self.lng,
            })
        }
    }
}

/// Smallest lat/lng rectangle containing a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

impl GeoBounds {
    /// Creates bounds containing a single point.
    pub fn from_point(point: GeoPoint) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    /// Creates bounds covering all given points. Returns `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        let mut iter = points.into_iter();
        let mut bounds = Self::from_point(iter.next()?);
        for point in iter {
            bounds.extend(point);
        }

        Some(bounds)
    }

    /// Grows the bounds to include the point.
    pub fn extend(&mut self, point: GeoPoint) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    /// South-west corner.
    pub fn south_west(&self) -> GeoPoint {
        GeoPoint::new(self.south, self.west)
    }

    /// North-east corner.
    pub fn north_east(&self) -> GeoPoint {
        GeoPoint::new(self.north, self.east)
    }

    /// Returns true if the bounds collapse to a single location.
    pub fn is_degenerate(&self) -> bool {
        self.north - self.south <= f64::EPSILON && self.east - self.west <= f64::EPSILON
    }

    /// Returns true if the point lies inside or on the edge of the bounds.
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.south..=self.north).contains(&point.lat)
            && (self.west..=self.east).contains(&point.lng)
    }
}

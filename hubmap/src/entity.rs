//! Input data supplied to the controller: located entities and routes.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// What a located entity represents on the map. Each role gets its own marker style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityRole {
    /// Place the shipment was picked up.
    #[serde(alias = "ORIGIN")]
    Origin,
    /// Last known position of the shipment.
    #[serde(alias = "CURRENT")]
    Current,
    /// Place the shipment is delivered to.
    #[serde(alias = "DESTINATION")]
    Destination,
    /// Logistics hub of the network.
    #[serde(alias = "HUB")]
    Hub,
}

/// A point of interest drawn as a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedEntity {
    /// Identifier, unique within one reconcile pass.
    pub id: String,
    /// Text shown with the marker.
    #[serde(default)]
    pub label: String,
    /// Location of the entity.
    pub position: GeoPoint,
    /// Role of the entity.
    pub role: EntityRole,
}

impl LocatedEntity {
    /// Creates a new entity.
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        position: GeoPoint,
        role: EntityRole,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            position,
            role,
        }
    }

    /// Shorthand for a hub entity labelled with its id.
    pub fn hub(id: impl Into<String>, lat: f64, lng: f64) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            position: GeoPoint::new(lat, lng),
            role: EntityRole::Hub,
        }
    }
}

/// Path drawn as a line connecting its points in order.
///
/// The points do not have to coincide with entity positions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteSegment {
    /// Points of the path in drawing order.
    pub points: Vec<GeoPoint>,
}

impl RouteSegment {
    /// Minimum number of valid points for a route to be drawn.
    pub const MIN_POINTS: usize = 2;

    /// Creates a route through the given points.
    pub fn new(points: impl IntoIterator<Item = GeoPoint>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    /// Returns the valid points of the route, or `None` if fewer than [`Self::MIN_POINTS`] remain.
    pub fn valid_points(&self) -> Option<Vec<GeoPoint>> {
        let points: Vec<_> = self.points.iter().copied().filter(GeoPoint::is_valid).collect();
        (points.len() >= Self::MIN_POINTS).then_some(points)
    }
}

//! Error types of the crate.

use thiserror::Error;

use crate::container::ContainerId;
use crate::view::BoundsError;

/// Error returned by map lifecycle operations.
///
/// Only [`MapError::UsageOrder`], [`MapError::Backend`] and [`MapError::Config`] are ever returned
/// by the controller. The remaining variants describe conditions the controller recovers from
/// locally; they exist so that the recovery can be logged with a precise cause.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MapError {
    /// Coordinate is out of range or not a finite number.
    #[error("invalid geographic point: lat {lat}, lng {lng}")]
    InvalidGeoPoint {
        /// Latitude as supplied.
        lat: f64,
        /// Longitude as supplied.
        lng: f64,
    },

    /// Mount point is not attached to a renderable surface yet.
    #[error("container {0} is not ready for rendering")]
    ContainerNotReady(ContainerId),

    /// An operation was invoked in a state that does not allow it.
    #[error("usage order error: {0}")]
    UsageOrder(String),

    /// Camera could not be fitted to the given points.
    #[error(transparent)]
    BoundsComputation(#[from] BoundsError),

    /// The widget library failed to perform an operation.
    #[error("map backend error: {0}")]
    Backend(String),

    /// Configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),
}

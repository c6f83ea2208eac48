//! Controller configuration.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::style::{MarkerTheme, RouteStyle};
use crate::tiles::TileSource;

/// Settings of a [`MapLifecycleController`](crate::MapLifecycleController).
///
/// Every field has a default, so a JSON document only needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Margin in pixels kept free on each side when fitting the camera to bounds.
    pub fit_padding: f64,
    /// Lowest zoom level the camera fit may choose.
    pub min_zoom: u8,
    /// Highest zoom level the camera fit may choose.
    pub max_zoom: u8,
    /// Background imagery.
    pub tile_source: TileSource,
    /// Marker appearance per entity role.
    pub marker_theme: MarkerTheme,
    /// Route line appearance.
    pub route_style: RouteStyle,
}

impl ControllerConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| MapError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that the values are consistent.
    pub fn validate(&self) -> Result<(), MapError> {
        if self.min_zoom > self.max_zoom {
            return Err(MapError::Config(format!(
                "min_zoom {} is greater than max_zoom {}",
                self.min_zoom, self.max_zoom
            )));
        }

        if !self.fit_padding.is_finite() || self.fit_padding < 0.0 {
            return Err(MapError::Config(format!(
                "fit_padding must be a non-negative number, got {}",
                self.fit_padding
            )));
        }

        Ok(())
    }

    /// Zoom levels the camera fit may choose from.
    pub fn zoom_range(&self) -> RangeInclusive<u8> {
        self.min_zoom..=self.max_zoom
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            fit_padding: 50.0,
            min_zoom: 0,
            max_zoom: 18,
            tile_source: TileSource::osm(),
            marker_theme: MarkerTheme::default(),
            route_style: RouteStyle::default(),
        }
    }
}

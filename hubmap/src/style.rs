//! Marker and route appearance.

use serde::{Deserialize, Serialize};

use crate::entity::EntityRole;

/// RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    /// White.
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);

    /// Creates a color from its components.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#rrggbb` or `#rrggbbaa`.
    pub fn try_from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }

        let component = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            6 => Some(Self::rgba(component(0)?, component(2)?, component(4)?, 255)),
            8 => Some(Self::rgba(
                component(0)?,
                component(2)?,
                component(4)?,
                component(6)?,
            )),
            _ => None,
        }
    }

    /// Formats the color as `#rrggbbaa`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_hex(&value).ok_or_else(|| format!("invalid color '{value}'"))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

/// Appearance of a marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerStyle {
    /// Fill color of the marker disk.
    pub fill: Color,
    /// Outline color.
    pub stroke: Color,
    /// Radius in pixels.
    pub radius: f32,
    /// Draw an animated halo around the marker.
    #[serde(default)]
    pub pulse: bool,
}

impl MarkerStyle {
    const fn solid(fill: Color, radius: f32) -> Self {
        Self {
            fill,
            stroke: Color::WHITE,
            radius,
            pulse: false,
        }
    }
}

/// Marker styles per entity role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerTheme {
    /// Style of origin markers.
    pub origin: MarkerStyle,
    /// Style of the current position marker.
    pub current: MarkerStyle,
    /// Style of destination markers.
    pub destination: MarkerStyle,
    /// Style of hub markers.
    pub hub: MarkerStyle,
}

impl MarkerTheme {
    /// Returns the style used for entities with the given role.
    pub fn style_for(&self, role: EntityRole) -> MarkerStyle {
        match role {
            EntityRole::Origin => self.origin,
            EntityRole::Current => self.current,
            EntityRole::Destination => self.destination,
            EntityRole::Hub => self.hub,
        }
    }
}

impl Default for MarkerTheme {
    fn default() -> Self {
        Self {
            origin: MarkerStyle::solid(Color::rgba(0x16, 0xa3, 0x4a, 255), 8.0),
            current: MarkerStyle {
                pulse: true,
                ..MarkerStyle::solid(Color::rgba(0x25, 0x63, 0xeb, 255), 10.0)
            },
            destination: MarkerStyle::solid(Color::rgba(0xdc, 0x26, 0x26, 255), 8.0),
            hub: MarkerStyle::solid(Color::rgba(0xf9, 0x73, 0x16, 255), 7.0),
        }
    }
}

/// Appearance of a route line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteStyle {
    /// Line color.
    pub color: Color,
    /// Line width in pixels.
    pub width: f32,
    /// Draw the line dashed.
    #[serde(default)]
    pub dashed: bool,
}

impl Default for RouteStyle {
    fn default() -> Self {
        Self {
            color: Color::rgba(0x25, 0x63, 0xeb, 0xcc),
            width: 3.0,
            dashed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_have_distinct_styles() {
        let theme = MarkerTheme::default();
        let roles = [
            EntityRole::Origin,
            EntityRole::Current,
            EntityRole::Destination,
            EntityRole::Hub,
        ];
        for (i, a) in roles.iter().enumerate() {
            for b in &roles[i + 1..] {
                assert_ne!(theme.style_for(*a), theme.style_for(*b), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn hex_colors() {
        assert_eq!(
            Color::try_from_hex("#ff8000"),
            Some(Color::rgba(255, 128, 0, 255))
        );
        assert_eq!(
            Color::try_from_hex("#ff800080"),
            Some(Color::rgba(255, 128, 0, 128))
        );
        assert_eq!(Color::try_from_hex("ff8000"), None);
        assert_eq!(Color::try_from_hex("#ff80"), None);
        assert_eq!(Color::rgba(1, 2, 3, 4).to_hex(), "#01020304");
    }

    #[test]
    fn theme_fields_can_be_overridden_partially() {
        let theme: MarkerTheme = serde_json::from_str(
            r##"{"hub": {"fill": "#000000", "stroke": "#ffffff", "radius": 4.0}}"##,
        )
        .unwrap();
        assert_eq!(theme.hub.fill, Color::rgba(0, 0, 0, 255));
        assert_eq!(theme.origin, MarkerTheme::default().origin);
    }
}

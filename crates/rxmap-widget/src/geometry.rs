#![forbid(unsafe_code)]

//! Geographic values: coordinates, camera positions, location fixes.
//!
//! `Display` for [`Coordinate`] prints `(latitude, longitude)` with the
//! shortest round-trip representation of each component, which is what the
//! demo transcript shows.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Valid zoom range, inclusive.
pub const MIN_ZOOM: f32 = 2.0;
pub const MAX_ZOOM: f32 = 21.0;
/// Valid viewing angle range in degrees, inclusive.
pub const MAX_VIEWING_ANGLE: f64 = 90.0;

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Reject non-finite or out-of-range components.
    pub fn validate(&self) -> Result<(), String> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} outside [-90, 90]", self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("longitude {} outside [-180, 180]", self.longitude));
        }
        Ok(())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

// ---------------------------------------------------------------------------
// CameraPosition
// ---------------------------------------------------------------------------

/// Where the map looks from.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraPosition {
    pub target: Coordinate,
    pub zoom: f32,
    /// Degrees clockwise from north.
    #[cfg_attr(feature = "serde", serde(default))]
    pub bearing: f64,
    /// Tilt in degrees, 0 looks straight down.
    #[cfg_attr(feature = "serde", serde(default))]
    pub viewing_angle: f64,
}

impl CameraPosition {
    #[must_use]
    pub const fn new(target: Coordinate, zoom: f32, bearing: f64, viewing_angle: f64) -> Self {
        Self {
            target,
            zoom,
            bearing,
            viewing_angle,
        }
    }

    /// Top-down, north-up camera at `zoom`.
    #[must_use]
    pub const fn at(target: Coordinate, zoom: f32) -> Self {
        Self::new(target, zoom, 0.0, 0.0)
    }

    #[must_use]
    pub const fn with_zoom(self, zoom: f32) -> Self {
        Self { zoom, ..self }
    }

    #[must_use]
    pub const fn with_target(self, target: Coordinate) -> Self {
        Self { target, ..self }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.target.validate()?;
        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.zoom) {
            return Err(format!("zoom {} outside [{MIN_ZOOM}, {MAX_ZOOM}]", self.zoom));
        }
        if !self.bearing.is_finite() {
            return Err(format!("bearing {} is not finite", self.bearing));
        }
        if !(0.0..=MAX_VIEWING_ANGLE).contains(&self.viewing_angle) {
            return Err(format!(
                "viewing angle {} outside [0, {MAX_VIEWING_ANGLE}]",
                self.viewing_angle
            ));
        }
        Ok(())
    }
}

impl Default for CameraPosition {
    fn default() -> Self {
        Self::at(Coordinate::default(), MIN_ZOOM)
    }
}

impl fmt::Display for CameraPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "target: {}, zoom: {}, bearing: {}, viewing angle: {}",
            self.target, self.zoom, self.bearing, self.viewing_angle
        )
    }
}

// ---------------------------------------------------------------------------
// Location
// ---------------------------------------------------------------------------

/// A device location fix.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Location {
    pub coordinate: Coordinate,
    /// Horizontal accuracy radius in meters.
    #[cfg_attr(feature = "serde", serde(default))]
    pub accuracy: f64,
}

impl Location {
    #[must_use]
    pub const fn new(coordinate: Coordinate, accuracy: f64) -> Self {
        Self {
            coordinate,
            accuracy,
        }
    }
}

impl From<Coordinate> for Location {
    fn from(coordinate: Coordinate) -> Self {
        Self::new(coordinate, 0.0)
    }
}

#![forbid(unsafe_code)]

//! Scripted gesture replay.
//!
//! A script is a JSON document `{ "steps": [ ... ] }` whose steps are
//! tagged by `gesture`:
//!
//! ```json
//! { "steps": [
//!     { "gesture": "tap_my_location_button" },
//!     { "gesture": "tap_marker", "marker": 0 },
//!     { "gesture": "pan", "target": { "latitude": 33.4, "longitude": 126.4 } }
//! ] }
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rxmap_widget::{Coordinate, GestureError, Location, MarkerId, OverlayId, Poi};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::screen::{CENTER, MapScreen, PLACE0};

/// One simulated user interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "snake_case")]
pub enum Gesture {
    TapAt { coordinate: Coordinate },
    LongPressAt { coordinate: Coordinate },
    TapMarker { marker: MarkerId },
    TapInfoWindow,
    LongPressInfoWindow,
    CloseInfoWindow,
    TapOverlay { overlay: OverlayId },
    TapPoi { poi: Poi },
    TapMyLocationButton,
    /// Tap action button `button` (0 or 1).
    TapButton { button: usize },
    Pan { target: Coordinate },
    Pinch { zoom: f32 },
    DragMarker { marker: MarkerId, path: Vec<Coordinate> },
    RenderFrame,
    /// A location fix from the device; `null` clears it.
    UpdateLocation { location: Option<Location> },
}

impl Gesture {
    /// Perform the gesture on `screen`.
    pub fn apply(&self, screen: &MapScreen) -> Result<(), GestureError> {
        let map = screen.map();
        match self {
            Self::TapAt { coordinate } => map.tap_at(*coordinate),
            Self::LongPressAt { coordinate } => map.long_press_at(*coordinate),
            Self::TapMarker { marker } => map.tap_marker(*marker),
            Self::TapInfoWindow => map.tap_info_window(),
            Self::LongPressInfoWindow => map.long_press_info_window(),
            Self::CloseInfoWindow => map.close_info_window(),
            Self::TapOverlay { overlay } => map.tap_overlay(*overlay),
            Self::TapPoi { poi } => map.tap_poi(poi.clone()),
            Self::TapMyLocationButton => map.tap_my_location_button(),
            Self::TapButton { button } => match screen.buttons().get(*button) {
                Some(b) if b.tap() => Ok(()),
                _ => Err(GestureError::Unavailable("action button")),
            },
            Self::Pan { target } => map.pan(*target),
            Self::Pinch { zoom } => map.pinch(*zoom),
            Self::DragMarker { marker, path } => map.drag_marker(*marker, path),
            Self::RenderFrame => {
                map.render_frame();
                Ok(())
            }
            Self::UpdateLocation { location } => map.update_location(*location),
        }
    }

    /// Snake-case tag, as written in scripts.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TapAt { .. } => "tap_at",
            Self::LongPressAt { .. } => "long_press_at",
            Self::TapMarker { .. } => "tap_marker",
            Self::TapInfoWindow => "tap_info_window",
            Self::LongPressInfoWindow => "long_press_info_window",
            Self::CloseInfoWindow => "close_info_window",
            Self::TapOverlay { .. } => "tap_overlay",
            Self::TapPoi { .. } => "tap_poi",
            Self::TapMyLocationButton => "tap_my_location_button",
            Self::TapButton { .. } => "tap_button",
            Self::Pan { .. } => "pan",
            Self::Pinch { .. } => "pinch",
            Self::DragMarker { .. } => "drag_marker",
            Self::RenderFrame => "render_frame",
            Self::UpdateLocation { .. } => "update_location",
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ScriptError {
    Io { path: PathBuf, source: io::Error },
    Parse(serde_json::Error),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "cannot read script {}: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid script: {err}"),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ScriptError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

// ---------------------------------------------------------------------------
// Script
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub steps: Vec<Gesture>,
}

/// Outcome of [`Script::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    pub applied: usize,
    pub rejected: usize,
}

impl Script {
    pub fn parse(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let script = Self::parse(&json)?;
        debug!(path = %path.display(), steps = script.steps.len(), "script loaded");
        Ok(script)
    }

    /// Walk through every interaction the screen supports: the permission
    /// gate, marker selection by tap and by button, info windows, dragging,
    /// overlays, camera gestures, then a tap on empty map.
    #[must_use]
    pub fn demo() -> Self {
        let nearby = Coordinate::new(33.38, 126.36);
        let steps = vec![
            Gesture::RenderFrame,
            Gesture::TapMyLocationButton,
            Gesture::UpdateLocation {
                location: Some(Location::new(nearby, 5.0)),
            },
            Gesture::TapMyLocationButton,
            Gesture::TapMarker { marker: MarkerId(0) },
            Gesture::TapInfoWindow,
            Gesture::TapButton { button: 1 },
            Gesture::LongPressInfoWindow,
            Gesture::DragMarker {
                marker: MarkerId(1),
                path: vec![
                    Coordinate::new(33.405, 126.385),
                    Coordinate::new(33.4, 126.38),
                ],
            },
            Gesture::TapOverlay { overlay: OverlayId(2) },
            Gesture::TapPoi {
                poi: Poi {
                    place_id: "ChIJ-demo-0001".into(),
                    name: "Hallasan".into(),
                    coordinate: Coordinate::new(33.3616666, 126.5291666),
                },
            },
            Gesture::Pan { target: PLACE0 },
            Gesture::LongPressAt { coordinate: CENTER },
            Gesture::TapButton { button: 0 },
            Gesture::Pinch { zoom: 14.0 },
            Gesture::CloseInfoWindow,
            Gesture::TapAt { coordinate: nearby },
        ];
        Self { steps }
    }

    /// Apply every step in order. Rejected gestures are logged and skipped.
    pub fn run(&self, screen: &MapScreen) -> RunSummary {
        let mut summary = RunSummary::default();
        for (step, gesture) in self.steps.iter().enumerate() {
            match gesture.apply(screen) {
                Ok(()) => summary.applied += 1,
                Err(err) => {
                    warn!(step, gesture = gesture.name(), error = %err, "gesture rejected");
                    summary.rejected += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_are_tagged_by_gesture() {
        let script = Script::parse(
            r#"{ "steps": [
                { "gesture": "tap_marker", "marker": 1 },
                { "gesture": "tap_button", "button": 0 },
                { "gesture": "pinch", "zoom": 9.5 },
                { "gesture": "update_location", "location": null },
                { "gesture": "render_frame" }
            ] }"#,
        )
        .unwrap();
        assert_eq!(
            script.steps,
            vec![
                Gesture::TapMarker { marker: MarkerId(1) },
                Gesture::TapButton { button: 0 },
                Gesture::Pinch { zoom: 9.5 },
                Gesture::UpdateLocation { location: None },
                Gesture::RenderFrame,
            ]
        );
    }

    #[test]
    fn unknown_gesture_is_rejected() {
        let err = Script::parse(r#"{ "steps": [ { "gesture": "shake" } ] }"#).unwrap_err();
        assert!(matches!(err, ScriptError::Parse(_)));
        assert!(err.to_string().contains("shake"));
    }

    #[test]
    fn missing_field_is_rejected() {
        assert!(Script::parse(r#"{ "steps": [ { "gesture": "tap_marker" } ] }"#).is_err());
    }

    #[test]
    fn names_match_tags() {
        for gesture in Script::demo().steps {
            let json = serde_json::to_value(&gesture).unwrap();
            assert_eq!(json["gesture"], gesture.name());
        }
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Script::load("/nonexistent/rxmap/script.json").unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/rxmap/script.json"));
    }
}

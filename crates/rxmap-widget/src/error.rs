#![forbid(unsafe_code)]

use std::fmt;

use rxmap_reactive::BindError;

use crate::overlay::{MarkerId, OverlayId};

/// A simulated gesture could not be performed.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureError {
    UnknownMarker(MarkerId),
    UnknownOverlay(OverlayId),
    NotDraggable(MarkerId),
    NotTappable(OverlayId),
    /// No info window is open.
    NoInfoWindow,
    /// The control is hidden or the gesture is disabled.
    Unavailable(&'static str),
    /// The gesture tried to write an invalid value.
    Rejected(BindError),
}

impl fmt::Display for GestureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMarker(id) => write!(f, "no marker {id}"),
            Self::UnknownOverlay(id) => write!(f, "no overlay {id}"),
            Self::NotDraggable(id) => write!(f, "marker {id} is not draggable"),
            Self::NotTappable(id) => write!(f, "overlay {id} is not tappable"),
            Self::NoInfoWindow => f.write_str("no info window is open"),
            Self::Unavailable(what) => write!(f, "{what} is not available"),
            Self::Rejected(err) => write!(f, "gesture rejected: {err}"),
        }
    }
}

impl std::error::Error for GestureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BindError> for GestureError {
    fn from(err: BindError) -> Self {
        Self::Rejected(err)
    }
}

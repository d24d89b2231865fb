#![forbid(unsafe_code)]

//! Headless map widget for rxmap.
//!
//! [`MapView`] models the state of an interactive map (camera, markers,
//! circles, selection, info window, device location) and exposes it the
//! reactive way: every delegate callback is a named [`Stream`] source, every
//! display attribute is a validated [`Property`] or a bindable setter.
//! Nothing is rendered; gesture methods simulate the touch toolkit.
//!
//! [`Stream`]: rxmap_reactive::Stream
//! [`Property`]: rxmap_reactive::Property

mod delegate;
mod error;
mod events;
pub mod geometry;
pub mod location;
mod map_view;
pub mod overlay;
pub mod selection;
pub mod ui;

pub use error::GestureError;
pub use geometry::{CameraPosition, Coordinate, Location};
pub use location::{AuthorizationPolicy, AuthorizationStatus, LocationManager};
pub use map_view::MapView;
pub use overlay::{
    Circle, CircleOptions, Color, InfoContent, InfoWindow, Label, Marker, MarkerIcon, MarkerId,
    MarkerOptions, OverlayId, Poi, WillMove,
};
pub use selection::{Restyle, style_diff};
pub use ui::Button;

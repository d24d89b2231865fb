#![forbid(unsafe_code)]

//! Things drawn on the map: markers, circles, info windows, POIs.
//!
//! [`Marker`] and [`Circle`] are shared handles: cloning one yields another
//! view of the same overlay, and their bindable attributes are
//! [`Property`] values that validate every write.

use std::fmt;
use std::rc::Rc;

use rxmap_reactive::Property;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geometry::Coordinate;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Identity of a marker on one map. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct MarkerId(pub u32);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity of a non-marker overlay (circles).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct OverlayId(pub u32);

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Color
// ---------------------------------------------------------------------------

/// Straight-alpha RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const RED: Self = Self::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Self = Self::rgb(0.0, 1.0, 0.0);
    pub const BROWN: Self = Self::rgb(0.6, 0.4, 0.2);
    pub const YELLOW: Self = Self::rgb(1.0, 1.0, 0.0);

    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[must_use]
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [("r", self.r), ("g", self.g), ("b", self.b), ("a", self.a)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("color component {name}={value} outside [0, 1]"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

// ---------------------------------------------------------------------------
// Marker
// ---------------------------------------------------------------------------

/// Named marker image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "snake_case"))]
pub enum MarkerIcon {
    #[default]
    Normal,
    Selected,
}

impl MarkerIcon {
    /// Asset name of the icon.
    #[must_use]
    pub const fn asset(self) -> &'static str {
        match self {
            Self::Normal => "marker_normal",
            Self::Selected => "marker_selected",
        }
    }
}

impl fmt::Display for MarkerIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.asset())
    }
}

/// Construction parameters for [`MapView::add_marker`](crate::MapView::add_marker).
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerOptions {
    pub title: String,
    pub position: Coordinate,
    pub draggable: bool,
    pub icon: MarkerIcon,
    pub rotation: f64,
}

impl MarkerOptions {
    #[must_use]
    pub fn new(title: impl Into<String>, position: Coordinate) -> Self {
        Self {
            title: title.into(),
            position,
            draggable: false,
            icon: MarkerIcon::Normal,
            rotation: 0.0,
        }
    }

    #[must_use]
    pub fn draggable(mut self, draggable: bool) -> Self {
        self.draggable = draggable;
        self
    }

    #[must_use]
    pub fn icon(mut self, icon: MarkerIcon) -> Self {
        self.icon = icon;
        self
    }
}

/// A marker placed on a map.
#[derive(Clone)]
pub struct Marker {
    id: MarkerId,
    title: Rc<str>,
    draggable: bool,
    position: Property<Coordinate>,
    icon: Property<MarkerIcon>,
    rotation: Property<f64>,
}

impl Marker {
    pub(crate) fn new(id: MarkerId, options: MarkerOptions) -> Self {
        Self {
            id,
            title: Rc::from(options.title),
            draggable: options.draggable,
            position: Property::new(format!("marker {id} position"), options.position)
                .with_validator(Coordinate::validate),
            icon: Property::new(format!("marker {id} icon"), options.icon),
            rotation: Property::new(format!("marker {id} rotation"), options.rotation)
                .with_validator(|degrees: &f64| {
                    if degrees.is_finite() {
                        Ok(())
                    } else {
                        Err(format!("rotation {degrees} is not finite"))
                    }
                }),
        }
    }

    #[must_use]
    pub fn id(&self) -> MarkerId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn is_draggable(&self) -> bool {
        self.draggable
    }

    pub fn position(&self) -> &Property<Coordinate> {
        &self.position
    }

    pub fn icon(&self) -> &Property<MarkerIcon> {
        &self.icon
    }

    /// Rotation in degrees, clockwise.
    pub fn rotation(&self) -> &Property<f64> {
        &self.rotation
    }
}

impl fmt::Debug for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Marker")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("position", &self.position.get())
            .field("icon", &self.icon.get())
            .finish_non_exhaustive()
    }
}

/// `title (latitude, longitude)`
impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.title, self.position.get())
    }
}

// ---------------------------------------------------------------------------
// Circle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CircleOptions {
    pub title: String,
    pub position: Coordinate,
    /// Meters.
    pub radius: f64,
    pub tappable: bool,
    pub fill_color: Color,
    pub stroke_color: Color,
    pub stroke_width: f32,
}

impl CircleOptions {
    #[must_use]
    pub fn new(title: impl Into<String>, position: Coordinate, radius: f64) -> Self {
        Self {
            title: title.into(),
            position,
            radius,
            tappable: false,
            fill_color: Color::GREEN.with_alpha(0.3),
            stroke_color: Color::GREEN.with_alpha(0.8),
            stroke_width: 1.0,
        }
    }
}

#[derive(Clone)]
pub struct Circle {
    id: OverlayId,
    title: Rc<str>,
    position: Coordinate,
    radius: f64,
    tappable: bool,
    fill_color: Property<Color>,
    stroke_color: Color,
    stroke_width: f32,
}

impl Circle {
    pub(crate) fn new(id: OverlayId, options: CircleOptions) -> Self {
        Self {
            id,
            title: Rc::from(options.title),
            position: options.position,
            radius: options.radius,
            tappable: options.tappable,
            fill_color: Property::new(format!("circle {id} fill color"), options.fill_color)
                .with_validator(Color::validate),
            stroke_color: options.stroke_color,
            stroke_width: options.stroke_width,
        }
    }

    #[must_use]
    pub fn id(&self) -> OverlayId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn position(&self) -> Coordinate {
        self.position
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    #[must_use]
    pub fn is_tappable(&self) -> bool {
        self.tappable
    }

    pub fn fill_color(&self) -> &Property<Color> {
        &self.fill_color
    }

    #[must_use]
    pub fn stroke_color(&self) -> Color {
        self.stroke_color
    }

    #[must_use]
    pub fn stroke_width(&self) -> f32 {
        self.stroke_width
    }
}

impl fmt::Debug for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Circle")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("radius", &self.radius)
            .field("fill_color", &self.fill_color.get())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Info window, POI, camera-move reason
// ---------------------------------------------------------------------------

/// A fixed-size text label used as custom info-window content.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub width: f64,
    pub height: f64,
    pub text_color: Color,
    pub background: Color,
    /// Bold font size in points.
    pub font_size: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InfoContent {
    /// Default window showing the marker title.
    Title(String),
    Custom(Label),
}

/// The info window currently shown above a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoWindow {
    pub marker: MarkerId,
    pub content: InfoContent,
}

/// A tapped point of interest.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Poi {
    pub place_id: String,
    pub name: String,
    pub coordinate: Coordinate,
}

/// `[place_id] name (latitude, longitude)`
impl fmt::Display for Poi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.place_id, self.name, self.coordinate)
    }
}

/// Payload of `will_move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WillMove {
    pub by_gesture: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_with_hash() {
        assert_eq!(MarkerId(1).to_string(), "#1");
        assert_eq!(OverlayId(2).to_string(), "#2");
    }

    #[test]
    fn icon_assets() {
        assert_eq!(MarkerIcon::Normal.asset(), "marker_normal");
        assert_eq!(MarkerIcon::Selected.to_string(), "marker_selected");
    }

    #[test]
    fn marker_display_is_title_and_position() {
        let marker = Marker::new(
            MarkerId(0),
            MarkerOptions::new("Hello, RxSwift", Coordinate::new(33.3659424, 126.3476852)),
        );
        assert_eq!(marker.to_string(), "Hello, RxSwift (33.3659424, 126.3476852)");
    }

    #[test]
    fn marker_rotation_rejects_nan() {
        let marker = Marker::new(MarkerId(0), MarkerOptions::new("m", Coordinate::default()));
        assert!(marker.rotation().set(180.0).is_ok());
        let err = marker.rotation().set(f64::NAN).unwrap_err();
        assert_eq!(err.target(), "marker #0 rotation");
        assert_eq!(marker.rotation().get(), 180.0);
    }

    #[test]
    fn marker_clone_shares_properties() {
        let marker = Marker::new(MarkerId(3), MarkerOptions::new("m", Coordinate::default()));
        let view = marker.clone();
        marker.icon().set(MarkerIcon::Selected).unwrap();
        assert_eq!(view.icon().get(), MarkerIcon::Selected);
    }

    #[test]
    fn circle_fill_validated() {
        let circle = Circle::new(
            OverlayId(2),
            CircleOptions::new("Circle", Coordinate::default(), 2000.0),
        );
        assert!(circle.fill_color().set(Color::RED).is_ok());
        assert!(circle.fill_color().set(Color::RED.with_alpha(1.5)).is_err());
        assert_eq!(circle.fill_color().get(), Color::RED);
    }

    #[test]
    fn poi_display() {
        let poi = Poi {
            place_id: "ChIJ".into(),
            name: "Hallasan".into(),
            coordinate: Coordinate::new(33.36, 126.53),
        };
        assert_eq!(poi.to_string(), "[ChIJ] Hallasan (33.36, 126.53)");
    }
}

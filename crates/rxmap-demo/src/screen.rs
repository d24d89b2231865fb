#![forbid(unsafe_code)]

//! The demo map screen.
//!
//! Lifecycle mirrors a view controller: [`MapScreen::setup`] wires the map's
//! event sources and delegate hooks, [`MapScreen::appear`] places the camera
//! and overlays and binds the two buttons, [`MapScreen::teardown`] releases
//! everything through the screen's [`Scope`].
//!
//! Every handler writes to the screen's [`Transcript`].

use std::cell::Cell;
use std::fmt;

use rxmap_reactive::{BindError, Scope, Stream, StreamError};
use rxmap_widget::{
    AuthorizationPolicy, Button, CameraPosition, Circle, CircleOptions, Color, Coordinate,
    InfoContent, Label, LocationManager, MapView, Marker, MarkerIcon, MarkerOptions, style_diff,
};
use tracing::{debug, info};

use crate::transcript::Transcript;

/// Initial camera target.
pub const CENTER: Coordinate = Coordinate::new(33.3659424, 126.3476852);
/// Position of the second marker, and the `camera` action's target.
pub const PLACE0: Coordinate = Coordinate::new(33.4108625, 126.391319);

const INFO_LABEL_WIDTH: f64 = 180.0;
const INFO_LABEL_HEIGHT: f64 = 60.0;
const INFO_LABEL_FONT_SIZE: f32 = 16.0;

// ---------------------------------------------------------------------------
// Button actions
// ---------------------------------------------------------------------------

/// What the two action buttons are bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonActions {
    /// Button *i* selects marker *i*.
    #[default]
    Select,
    /// Rotate the first marker to 180° / back to 0°.
    Rotate,
    /// Fill the circle red / green.
    Fill,
    /// Traffic layer on / off.
    Traffic,
    /// Animate to zoom 14 / animate to the second place.
    Camera,
    /// Zoom gestures on / off.
    ZoomGestures,
}

impl ButtonActions {
    pub const ALL: [Self; 6] = [
        Self::Select,
        Self::Rotate,
        Self::Fill,
        Self::Traffic,
        Self::Camera,
        Self::ZoomGestures,
    ];

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(value))
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Rotate => "rotate",
            Self::Fill => "fill",
            Self::Traffic => "traffic",
            Self::Camera => "camera",
            Self::ZoomGestures => "zoom-gestures",
        }
    }
}

impl fmt::Display for ButtonActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Screen
// ---------------------------------------------------------------------------

pub struct MapScreen {
    map: MapView,
    buttons: [Button; 2],
    location: LocationManager,
    actions: ButtonActions,
    transcript: Transcript,
    scope: Scope,
    appeared: Cell<bool>,
}

impl MapScreen {
    #[must_use]
    pub fn new(actions: ButtonActions, policy: AuthorizationPolicy) -> Self {
        Self {
            map: MapView::new(),
            buttons: [Button::new("action0"), Button::new("action1")],
            location: LocationManager::new(policy),
            actions,
            transcript: Transcript::new(),
            scope: Scope::new("map screen"),
            appeared: Cell::new(false),
        }
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn buttons(&self) -> &[Button; 2] {
        &self.buttons
    }

    pub fn location_manager(&self) -> &LocationManager {
        &self.location
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    #[must_use]
    pub fn actions(&self) -> ButtonActions {
        self.actions
    }

    /// Binding and stream errors reported since the last call.
    pub fn take_errors(&self) -> Vec<StreamError> {
        self.scope.take_errors()
    }

    /// Wire event logging, delegate hooks, the location permission gate and
    /// selection restyling.
    pub fn setup(&self) -> Result<(), BindError> {
        self.map.my_location_button().set(true)?;
        self.gate_location_on_first_tap();
        self.install_delegates();
        self.log_map_events();
        self.log_my_location();
        self.log_selection();
        self.restyle_selection();
        debug!(subscriptions = self.scope.len(), "map screen set up");
        Ok(())
    }

    /// Position the camera, place the overlays and bind the buttons. Runs
    /// once; later calls are no-ops.
    pub fn appear(&self) -> Result<(), BindError> {
        if self.appeared.replace(true) {
            return Ok(());
        }
        self.map.set_camera(CameraPosition::new(CENTER, 12.0, 30.0, 45.0))?;

        let first = self.map.add_marker(
            MarkerOptions::new("Hello, RxSwift", CENTER)
                .draggable(true)
                .icon(MarkerIcon::Normal),
        )?;
        let second = self.map.add_marker(
            MarkerOptions::new("Hello, GoogleMaps", PLACE0)
                .draggable(true)
                .icon(MarkerIcon::Normal),
        )?;

        let mut circle = CircleOptions::new("Circle", CENTER, 2000.0);
        circle.tappable = true;
        circle.stroke_width = 4.0;
        let circle = self.map.add_circle(circle)?;

        self.bind_buttons(&first, &second, &circle);
        info!(actions = %self.actions, "map screen appeared");
        Ok(())
    }

    /// Release everything the screen wired up. Returns the number of
    /// subscriptions that were still live.
    pub fn teardown(&self) -> usize {
        let released = self.scope.dispose();
        info!(released, "map screen torn down");
        released
    }

    // -- setup -------------------------------------------------------------

    fn gate_location_on_first_tap(&self) {
        let start = self.map.did_tap_my_location_button().take(1).publish();
        let manager = self.location.clone();
        self.scope.subscribe(&start.stream(), move |()| {
            manager.request_when_in_use_authorization();
        });
        self.scope.bind(
            &start.stream().map(|()| true),
            self.map.my_location_enabled().setter(),
        );
        start.connect().add_to(&self.scope);
    }

    fn install_delegates(&self) {
        let transcript = self.transcript.clone();
        self.map
            .handle_tap_marker(move |marker| {
                transcript.record(format!("Handle tap marker: {marker}"));
                false
            })
            .add_to(&self.scope);

        self.map
            .handle_marker_info_window(|marker| {
                Some(InfoContent::Custom(Label {
                    text: marker.title().to_string(),
                    width: INFO_LABEL_WIDTH,
                    height: INFO_LABEL_HEIGHT,
                    text_color: Color::BROWN,
                    background: Color::YELLOW,
                    font_size: INFO_LABEL_FONT_SIZE,
                }))
            })
            .add_to(&self.scope);

        let transcript = self.transcript.clone();
        self.map
            .handle_tap_my_location_button(move || {
                transcript.record("Handle my location button");
                false
            })
            .add_to(&self.scope);
    }

    fn log_map_events(&self) {
        let map = &self.map;
        self.log_each(map.will_move(), |m| format!("Will move: by gesture {}", m.by_gesture));
        self.log_each(map.did_change_position(), |c| format!("Did change position: {c}"));
        self.log_each(map.idle_at_position(), |c| format!("Idle at coordinate: {c}"));
        self.log_each(map.did_tap_at(), |c| format!("Did tap at coordinate: {c}"));
        self.log_each(map.did_long_press_at(), |c| {
            format!("Did long press at coordinate: {c}")
        });
        self.log_each(map.did_tap_marker(), |id| format!("Did tap marker: {id}"));
        self.log_each(map.did_tap_info_window(), |id| {
            format!("Did tap info window of marker: {id}")
        });
        self.log_each(map.did_long_press_info_window(), |id| {
            format!("Did long press info window of marker: {id}")
        });
        self.log_each(map.did_tap_overlay(), |id| format!("Did tap overlay: {id}"));
        self.log_each(map.did_tap_poi(), |poi| format!("Did tap POI: {poi}"));
        self.log_each(map.did_tap_my_location_button(), |()| {
            "Did tap my location button".to_string()
        });
        self.log_each(map.did_close_info_window(), |id| {
            format!("Did close info window of marker: {id}")
        });
        self.log_each(map.did_begin_dragging_marker(), |id| {
            format!("Did begin dragging marker: {id}")
        });
        self.log_each(map.did_end_dragging_marker(), |id| {
            format!("Did end dragging marker: {id}")
        });
        self.log_each(map.did_drag_marker(), |id| format!("Did drag marker: {id}"));
        self.log_each(map.did_start_tile_rendering(), |()| {
            "Did start tile rendering".to_string()
        });
        self.log_each(map.did_finish_tile_rendering(), |()| {
            "Did finish tile rendering".to_string()
        });
        self.log_each(map.snapshot_ready(), |()| "Snapshot ready".to_string());
    }

    /// Drive `stream` for the screen's lifetime, recording `format(value)`.
    fn log_each<T: Clone + 'static>(
        &self,
        stream: Stream<T>,
        format: impl Fn(T) -> String + 'static,
    ) {
        let transcript = self.transcript.clone();
        stream
            .as_driver()
            .drive(move |value| transcript.record(format(value)))
            .add_to(&self.scope);
    }

    fn log_my_location(&self) {
        let transcript = self.transcript.clone();
        self.scope.subscribe(&self.map.my_location(), move |fix| match fix {
            Some(fix) => transcript.record(format!("My location: {}", fix.coordinate)),
            None => transcript.record("My location: nil"),
        });
    }

    fn log_selection(&self) {
        let map = self.map.clone();
        self.log_each(self.map.selected_marker(), move |selected| {
            match selected.and_then(|id| map.marker(id)) {
                Some(marker) => format!("Selected marker: {marker}"),
                None => "Selected marker: nil".to_string(),
            }
        });
    }

    fn restyle_selection(&self) {
        let map = self.map.clone();
        self.scope
            .bind(&self.map.selected_marker().pairwise(), move |(prev, cur)| {
                style_diff(prev, cur)
                    .into_iter()
                    .try_for_each(|restyle| map.restyle(restyle))
            });
    }

    // -- appear ------------------------------------------------------------

    fn bind_buttons(&self, first: &Marker, second: &Marker, circle: &Circle) {
        let [b0, b1] = &self.buttons;
        let (taps0, taps1) = (b0.taps(), b1.taps());
        let scope = &self.scope;
        match self.actions {
            ButtonActions::Select => {
                let (id0, id1) = (first.id(), second.id());
                scope.bind(&taps0.map(move |()| Some(id0)), self.map.selected_marker_setter());
                scope.bind(&taps1.map(move |()| Some(id1)), self.map.selected_marker_setter());
            }
            ButtonActions::Rotate => {
                scope.bind(&taps0.map(|()| 180.0), first.rotation().setter());
                scope.bind(&taps1.map(|()| 0.0), first.rotation().setter());
            }
            ButtonActions::Fill => {
                scope.bind(&taps0.map(|()| Color::RED), circle.fill_color().setter());
                scope.bind(&taps1.map(|()| Color::GREEN), circle.fill_color().setter());
            }
            ButtonActions::Traffic => {
                scope.bind(&taps0.map(|()| true), self.map.traffic_enabled().setter());
                scope.bind(&taps1.map(|()| false), self.map.traffic_enabled().setter());
            }
            ButtonActions::Camera => {
                scope.bind(&taps0.map(|()| 14.0), self.map.zoom_to_animate());
                scope.bind(
                    &taps1.map(|()| CameraPosition::new(PLACE0, 8.0, 10.0, 30.0)),
                    self.map.camera_to_animate(),
                );
            }
            ButtonActions::ZoomGestures => {
                scope.bind(&taps0.map(|()| true), self.map.zoom_gestures_enabled().setter());
                scope.bind(&taps1.map(|()| false), self.map.zoom_gestures_enabled().setter());
            }
        }
    }
}

impl fmt::Debug for MapScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapScreen")
            .field("actions", &self.actions)
            .field("appeared", &self.appeared.get())
            .field("scope", &self.scope)
            .field("transcript_lines", &self.transcript.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxmap_widget::{InfoWindow, MarkerId};

    fn ready(actions: ButtonActions) -> MapScreen {
        let screen = MapScreen::new(actions, AuthorizationPolicy::Grant);
        screen.setup().unwrap();
        screen.appear().unwrap();
        screen
    }

    #[test]
    fn setup_logs_initial_state() {
        let screen = MapScreen::new(ButtonActions::Select, AuthorizationPolicy::Grant);
        screen.setup().unwrap();
        assert_eq!(
            screen.transcript().lines(),
            vec!["My location: nil", "Selected marker: nil"]
        );
    }

    #[test]
    fn appear_logs_camera_move() {
        let screen = ready(ButtonActions::Select);
        let lines = screen.transcript().lines();
        assert!(lines.contains(&"Will move: by gesture false".to_string()));
        assert!(lines.contains(
            &"Idle at coordinate: target: (33.3659424, 126.3476852), zoom: 12, bearing: 30, viewing angle: 45"
                .to_string()
        ));
        assert_eq!(screen.map().markers().len(), 2);
        assert_eq!(screen.map().circles().len(), 1);
    }

    #[test]
    fn appear_is_idempotent() {
        let screen = ready(ButtonActions::Select);
        screen.appear().unwrap();
        assert_eq!(screen.map().markers().len(), 2);
    }

    #[test]
    fn tap_marker_logs_hook_then_selection() {
        let screen = ready(ButtonActions::Select);
        screen.transcript().take();

        screen.map().tap_marker(MarkerId(0)).unwrap();
        assert_eq!(
            screen.transcript().lines(),
            vec![
                "Did tap marker: #0",
                "Handle tap marker: Hello, RxSwift (33.3659424, 126.3476852)",
                "Selected marker: Hello, RxSwift (33.3659424, 126.3476852)",
            ]
        );
        assert!(matches!(
            screen.map().info_window(),
            Some(InfoWindow { marker: MarkerId(0), content: InfoContent::Custom(label) })
                if label.text == "Hello, RxSwift" && label.background == Color::YELLOW
        ));
    }

    #[test]
    fn rotate_buttons_turn_first_marker() {
        let screen = ready(ButtonActions::Rotate);
        let marker = screen.map().marker(MarkerId(0)).unwrap();
        screen.buttons()[0].tap();
        assert_eq!(marker.rotation().get(), 180.0);
        screen.buttons()[1].tap();
        assert_eq!(marker.rotation().get(), 0.0);
    }

    #[test]
    fn fill_buttons_recolor_circle() {
        let screen = ready(ButtonActions::Fill);
        let circle = screen.map().circles().remove(0);
        assert!(circle.is_tappable());
        screen.buttons()[0].tap();
        assert_eq!(circle.fill_color().get(), Color::RED);
        screen.buttons()[1].tap();
        assert_eq!(circle.fill_color().get(), Color::GREEN);
    }

    #[test]
    fn camera_buttons_animate() {
        let screen = ready(ButtonActions::Camera);
        screen.buttons()[0].tap();
        assert_eq!(screen.map().current_camera().zoom, 14.0);
        screen.buttons()[1].tap();
        assert_eq!(
            screen.map().current_camera(),
            CameraPosition::new(PLACE0, 8.0, 10.0, 30.0)
        );
        assert!(screen.take_errors().is_empty());
    }

    #[test]
    fn zoom_gesture_buttons_gate_pinch() {
        let screen = ready(ButtonActions::ZoomGestures);
        screen.buttons()[1].tap();
        assert!(screen.map().pinch(15.0).is_err());
        screen.buttons()[0].tap();
        assert!(screen.map().pinch(15.0).is_ok());
    }

    #[test]
    fn traffic_buttons_toggle() {
        let screen = ready(ButtonActions::Traffic);
        screen.buttons()[0].tap();
        assert!(screen.map().traffic_enabled().get());
        screen.buttons()[1].tap();
        assert!(!screen.map().traffic_enabled().get());
    }

    #[test]
    fn button_actions_parse() {
        for mode in ButtonActions::ALL {
            assert_eq!(ButtonActions::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(ButtonActions::parse("Zoom-Gestures"), Some(ButtonActions::ZoomGestures));
        assert_eq!(ButtonActions::parse("zoom"), None);
    }
}
